use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rebac_authz_client::{
    AuthorizationClient, AuthzError, InMemoryOracle, ListedUser, OracleError, OracleTransport,
    WriteRequest,
};
use rebac_authz_types::{Party, PartyKind, PartyObject, Relation, TupleKey};

/// Transport with canned answers and injectable failures.
#[derive(Default)]
struct ScriptedOracle {
    users_by_relation: HashMap<String, Vec<&'static str>>,
    objects: Vec<&'static str>,
    failing_relation: Option<&'static str>,
    failure: Option<OracleError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    fn failing(error: OracleError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    fn fail_if_set(&self) -> Result<(), OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OracleTransport for ScriptedOracle {
    async fn check(&self, _tuple: &TupleKey) -> Result<bool, OracleError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.fail_if_set()?;
        Ok(true)
    }

    async fn list_objects(
        &self,
        _user: &str,
        _relation: &str,
        _object_type: &str,
    ) -> Result<Vec<String>, OracleError> {
        self.fail_if_set()?;
        Ok(self.objects.iter().map(|object| object.to_string()).collect())
    }

    async fn list_users(
        &self,
        _object: &PartyObject,
        relation: &str,
        _user_type: &str,
    ) -> Result<Vec<ListedUser>, OracleError> {
        self.fail_if_set()?;
        if self.failing_relation == Some(relation) {
            return Err(OracleError::Unavailable("connection reset".into()));
        }
        let users = self
            .users_by_relation
            .get(relation)
            .cloned()
            .unwrap_or_default();
        Ok(users
            .into_iter()
            .map(|id| ListedUser {
                object: Some(PartyObject {
                    kind: "user".into(),
                    id: id.into(),
                }),
            })
            .collect())
    }

    async fn write(&self, _request: WriteRequest) -> Result<(), OracleError> {
        self.fail_if_set()
    }
}

fn alice() -> Party {
    Party::user("alice").unwrap()
}

fn project(id: &str) -> Party {
    Party::project(id).unwrap()
}

#[tokio::test]
async fn check_fails_closed_on_oracle_errors() {
    for error in [
        OracleError::Unavailable("refused".into()),
        OracleError::Rejected {
            status: 500,
            message: "boom".into(),
        },
        OracleError::InvalidResponse("garbage".into()),
    ] {
        let client = AuthorizationClient::new(Arc::new(ScriptedOracle::failing(error)));
        assert!(!client.check(&alice(), Relation::Member, &project("p1")).await);
    }
}

#[tokio::test]
async fn check_times_out_to_deny() {
    let oracle = ScriptedOracle {
        delay: Some(Duration::from_millis(500)),
        ..ScriptedOracle::default()
    };
    let client = AuthorizationClient::new(Arc::new(oracle))
        .with_check_timeout(Duration::from_millis(20));
    assert!(!client.check(&alice(), Relation::Member, &project("p1")).await);
}

#[tokio::test]
async fn wildcard_permission_is_never_checked() {
    let oracle = Arc::new(ScriptedOracle::default());
    let client = AuthorizationClient::new(oracle.clone());
    assert!(!client.check(&alice(), Relation::Any, &project("p1")).await);
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn list_users_merges_relations_per_user() {
    let oracle = ScriptedOracle {
        users_by_relation: HashMap::from([
            ("member".to_string(), vec!["u1", "u2"]),
            ("owner".to_string(), vec!["u1"]),
            ("admin".to_string(), vec![]),
        ]),
        ..ScriptedOracle::default()
    };
    let client = AuthorizationClient::new(Arc::new(oracle));

    let merged = client
        .list_users_by_relations(
            &project("p1"),
            &[Relation::Member, Relation::Owner, Relation::Admin],
        )
        .await
        .unwrap();

    assert_eq!(merged.len(), 2);
    assert_eq!(
        merged["u1"],
        BTreeSet::from([Relation::Member, Relation::Owner])
    );
    assert_eq!(merged["u2"], BTreeSet::from([Relation::Member]));

    let reordered = client
        .list_users_by_relations(
            &project("p1"),
            &[Relation::Admin, Relation::Owner, Relation::Member],
        )
        .await
        .unwrap();
    assert_eq!(merged, reordered);
}

#[tokio::test]
async fn list_users_fails_when_any_relation_fails() {
    let oracle = ScriptedOracle {
        users_by_relation: HashMap::from([("member".to_string(), vec!["u1"])]),
        failing_relation: Some("admin"),
        ..ScriptedOracle::default()
    };
    let client = AuthorizationClient::new(Arc::new(oracle));

    let result = client
        .list_users_by_relations(&project("p1"), &[Relation::Member, Relation::Admin])
        .await;
    assert!(matches!(
        result,
        Err(AuthzError::Query {
            operation: "list_users",
            ..
        })
    ));
}

#[tokio::test]
async fn list_object_ids_strips_kind_prefix() {
    let oracle = ScriptedOracle {
        objects: vec!["project:p1", "project:p2"],
        ..ScriptedOracle::default()
    };
    let client = AuthorizationClient::new(Arc::new(oracle));
    let ids = client
        .list_object_ids(&alice(), PartyKind::Project, Relation::Member)
        .await
        .unwrap();
    assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);
}

#[tokio::test]
async fn write_failure_surfaces_as_sync_error() {
    let client = AuthorizationClient::new(Arc::new(ScriptedOracle::failing(
        OracleError::Timeout(Duration::from_secs(10)),
    )));
    let err = client
        .write_relationship(&alice(), &project("p1"), Relation::Owner)
        .await
        .unwrap_err();

    assert!(err.is_sync_failure());
    match err {
        AuthzError::Sync {
            operation, source, ..
        } => {
            assert_eq!(operation, "write");
            assert!(source.is_unavailable());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn invalid_relations_are_rejected_before_the_oracle() {
    let oracle = Arc::new(ScriptedOracle::default());
    let client = AuthorizationClient::new(oracle.clone());

    let wildcard = client
        .write_relationship(&alice(), &project("p1"), Relation::Any)
        .await;
    let on_user = client
        .delete_relationship(&alice(), &Party::user("bob").unwrap(), Relation::Member)
        .await;

    assert!(matches!(wildcard, Err(AuthzError::InvalidTuple(_))));
    assert!(matches!(on_user, Err(AuthzError::InvalidTuple(_))));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn writes_and_deletes_are_idempotent() {
    let oracle = Arc::new(InMemoryOracle::new());
    let client = AuthorizationClient::new(oracle.clone());

    client
        .write_relationship(&alice(), &project("p1"), Relation::Member)
        .await
        .unwrap();
    client
        .write_relationship(&alice(), &project("p1"), Relation::Member)
        .await
        .unwrap();
    assert_eq!(oracle.len(), 1);

    client
        .delete_relationship(&alice(), &project("p2"), Relation::Admin)
        .await
        .unwrap();
    assert_eq!(oracle.len(), 1);
}

#[tokio::test]
async fn relationship_lifecycle_against_memory_oracle() {
    let client = AuthorizationClient::new(Arc::new(InMemoryOracle::new()));
    let owner = alice();
    let other = Party::user("quinn").unwrap();
    let resource = project("p1");

    client
        .write_relationship(&owner, &resource, Relation::Owner)
        .await
        .unwrap();
    assert!(client.check(&owner, Relation::Owner, &resource).await);
    assert!(!client.check(&other, Relation::Admin, &resource).await);

    client
        .write_relationship(&other, &resource, Relation::Admin)
        .await
        .unwrap();
    assert!(client.check(&other, Relation::Admin, &resource).await);

    client.remove_all_for_object(&resource).await.unwrap();
    assert!(!client.check(&owner, Relation::Owner, &resource).await);
    assert!(!client.check(&other, Relation::Admin, &resource).await);
}

#[tokio::test]
async fn remove_all_for_user_leaves_other_users_intact() {
    let client = AuthorizationClient::new(Arc::new(InMemoryOracle::new()));
    let bob = Party::user("bob").unwrap();

    for id in ["p1", "p2"] {
        client
            .write_relationship(&alice(), &project(id), Relation::Member)
            .await
            .unwrap();
    }
    client
        .write_relationship(&bob, &project("p1"), Relation::Member)
        .await
        .unwrap();

    client.remove_all_for_user(&alice()).await.unwrap();

    assert!(
        client
            .list_object_ids(&alice(), PartyKind::Project, Relation::Member)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(client.check(&bob, Relation::Member, &project("p1")).await);
}
