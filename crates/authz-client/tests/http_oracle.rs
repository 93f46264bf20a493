use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use rebac_authz_client::{
    AuthorizationClient, ClientCredentials, HttpOracle, OracleError, OracleTransport, WriteRequest,
};
use rebac_authz_types::{Party, PartyKind, Relation, TupleKey};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<(String, Value)>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    token_requests: Arc<Mutex<usize>>,
}

impl Recorded {
    fn push(&self, endpoint: &str, headers: &HeaderMap, body: Value) {
        self.bodies.lock().unwrap().push((endpoint.to_string(), body));
        if let Some(value) = headers.get("authorization") {
            self.auth_headers
                .lock()
                .unwrap()
                .push(value.to_str().unwrap().to_string());
        }
    }

    fn last(&self, endpoint: &str) -> Value {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == endpoint)
            .map(|(_, body)| body.clone())
            .expect("request recorded")
    }
}

async fn check(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let allowed = body["tuple_key"]["user"] == "user:alice";
    recorded.push("check", &headers, body);
    Json(json!({ "allowed": allowed }))
}

async fn list_objects(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorded.push("list-objects", &headers, body);
    Json(json!({ "objects": ["project:p1", "project:p9"] }))
}

async fn list_users(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let relation = body["relation"].as_str().unwrap_or_default().to_string();
    recorded.push("list-users", &headers, body);
    let users = match relation.as_str() {
        "member" => json!([
            { "object": { "type": "user", "id": "u1" } },
            { "object": { "type": "user", "id": "u2" } },
            { "wildcard": { "type": "user" } }
        ]),
        "owner" => json!([{ "object": { "type": "user", "id": "u1" } }]),
        _ => json!([]),
    };
    Json(json!({ "users": users }))
}

async fn write(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let rejected = body["writes"]["tuple_keys"][0]["relation"] == "forbidden";
    recorded.push("write", &headers, body);
    if rejected {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": "validation_error", "message": "unknown relation" })),
        )
    } else {
        (StatusCode::OK, Json(json!({})))
    }
}

async fn token(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(body["grant_type"], "client_credentials");
    *recorded.token_requests.lock().unwrap() += 1;
    Json(json!({ "access_token": "test-token", "expires_in": 3600 }))
}

async fn spawn_oracle() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/stores/:store/check", post(check))
        .route("/stores/:store/list-objects", post(list_objects))
        .route("/stores/:store/list-users", post(list_users))
        .route("/stores/:store/write", post(write))
        .route("/oauth/token", post(token))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake oracle");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake oracle");
    });
    (format!("http://{addr}"), recorded)
}

fn oracle(base: &str) -> HttpOracle {
    HttpOracle::new(base, "store-1", Duration::from_secs(2))
        .expect("http oracle")
        .with_authorization_model(Some("model-1".into()))
}

#[tokio::test]
async fn check_sends_tuple_key_and_model() {
    let (base, recorded) = spawn_oracle().await;
    let client = AuthorizationClient::new(Arc::new(oracle(&base)));
    let project = Party::project("p1").unwrap();

    assert!(
        client
            .check(&Party::user("alice").unwrap(), Relation::Member, &project)
            .await
    );
    assert!(
        !client
            .check(&Party::user("mallory").unwrap(), Relation::Member, &project)
            .await
    );

    let body = recorded.last("check");
    assert_eq!(body["tuple_key"]["user"], "user:mallory");
    assert_eq!(body["tuple_key"]["relation"], "member");
    assert_eq!(body["tuple_key"]["object"], "project:p1");
    assert_eq!(body["authorization_model_id"], "model-1");
}

#[tokio::test]
async fn list_queries_use_wire_shapes() {
    let (base, recorded) = spawn_oracle().await;
    let client = AuthorizationClient::new(Arc::new(oracle(&base)));
    let alice = Party::user("alice").unwrap();

    let ids = client
        .list_object_ids(&alice, PartyKind::Project, Relation::Member)
        .await
        .unwrap();
    assert_eq!(ids, vec!["p1".to_string(), "p9".to_string()]);
    let body = recorded.last("list-objects");
    assert_eq!(body["type"], "project");
    assert_eq!(body["user"], "user:alice");

    let members = client
        .list_users_by_relations(
            &Party::project("p1").unwrap(),
            &[Relation::Member, Relation::Owner, Relation::Admin],
        )
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
    assert!(members["u1"].contains(&Relation::Owner));
    let body = recorded.last("list-users");
    assert_eq!(body["object"], json!({ "type": "project", "id": "p1" }));
    assert_eq!(body["user_filters"], json!([{ "type": "user" }]));
}

#[tokio::test]
async fn writes_and_wildcard_deletes_are_posted() {
    let (base, recorded) = spawn_oracle().await;
    let client = AuthorizationClient::new(Arc::new(oracle(&base)));
    let project = Party::project("p1").unwrap();

    client
        .write_relationship(&Party::user("alice").unwrap(), &project, Relation::Owner)
        .await
        .unwrap();
    let body = recorded.last("write");
    assert_eq!(body["writes"]["tuple_keys"][0]["user"], "user:alice");
    assert_eq!(body["writes"]["on_duplicate"], "ignore");

    client.remove_all_for_object(&project).await.unwrap();
    let body = recorded.last("write");
    assert_eq!(
        body["deletes"]["tuple_keys"][0],
        json!({ "user": "*", "relation": "*", "object": "project:p1" })
    );
    assert_eq!(body["deletes"]["on_missing"], "ignore");
    assert!(body.get("writes").is_none());
}

#[tokio::test]
async fn oracle_rejection_carries_status_and_message() {
    let (base, _recorded) = spawn_oracle().await;
    let transport = oracle(&base);
    let tuple = TupleKey {
        user: "user:alice".into(),
        relation: "forbidden".into(),
        object: "project:p1".into(),
    };

    let err = transport
        .write(WriteRequest::write(tuple))
        .await
        .unwrap_err();
    match err {
        OracleError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "validation_error: unknown relation");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_oracle_is_unavailable_and_denies() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let transport = HttpOracle::new(&base, "store-1", Duration::from_secs(1)).unwrap();
    let tuple = TupleKey {
        user: "user:alice".into(),
        relation: "member".into(),
        object: "project:p1".into(),
    };
    assert!(transport.check(&tuple).await.unwrap_err().is_unavailable());

    let client = AuthorizationClient::new(Arc::new(transport));
    assert!(
        !client
            .check(
                &Party::user("alice").unwrap(),
                Relation::Member,
                &Party::project("p1").unwrap()
            )
            .await
    );
}

#[tokio::test]
async fn client_credentials_token_is_fetched_once_and_attached() {
    let (base, recorded) = spawn_oracle().await;
    let transport = oracle(&base).with_credentials(ClientCredentials {
        client_id: "client".into(),
        client_secret: "secret".into(),
        api_token_issuer: base.clone(),
        api_audience: "https://api.fga.example/".into(),
    });
    let client = AuthorizationClient::new(Arc::new(transport));
    let alice = Party::user("alice").unwrap();
    let project = Party::project("p1").unwrap();

    assert!(client.check(&alice, Relation::Member, &project).await);
    assert!(client.check(&alice, Relation::Admin, &project).await);

    assert_eq!(*recorded.token_requests.lock().unwrap(), 1);
    let headers = recorded.auth_headers.lock().unwrap().clone();
    assert_eq!(headers, vec!["Bearer test-token".to_string(); 2]);
}
