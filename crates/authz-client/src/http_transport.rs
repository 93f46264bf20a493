use std::time::Duration;

use async_trait::async_trait;
use rebac_authz_types::{PartyObject, TupleKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::credentials::{ClientCredentials, TokenSource};
use crate::transport::{ListedUser, OracleTransport, WriteRequest};
use crate::OracleError;

/// OpenFGA-compatible HTTP transport.
pub struct HttpOracle {
    http: reqwest::Client,
    store_url: String,
    authorization_model_id: Option<String>,
    request_timeout: Duration,
    tokens: Option<TokenSource>,
}

impl HttpOracle {
    pub fn new(
        api_url: &str,
        store_id: &str,
        request_timeout: Duration,
    ) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| OracleError::Unavailable(format!("http client: {err}")))?;
        Ok(Self {
            http,
            store_url: format!("{}/stores/{}", api_url.trim_end_matches('/'), store_id),
            authorization_model_id: None,
            request_timeout,
            tokens: None,
        })
    }

    pub fn with_authorization_model(mut self, model_id: Option<String>) -> Self {
        self.authorization_model_id = model_id;
        self
    }

    pub fn with_credentials(mut self, credentials: ClientCredentials) -> Self {
        self.tokens = Some(TokenSource::new(self.http.clone(), credentials));
        self
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, OracleError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(format!("{}/{}", self.store_url, endpoint))
            .json(body);
        if let Some(tokens) = &self.tokens {
            request = request.bearer_auth(tokens.bearer().await?);
        }

        let response = request
            .send()
            .await
            .map_err(|err| self.map_send_error(err))?;
        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(OracleError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&raw),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|err| OracleError::InvalidResponse(format!("{endpoint}: {err}")))
    }

    fn map_send_error(&self, err: reqwest::Error) -> OracleError {
        if err.is_timeout() {
            OracleError::Timeout(self.request_timeout)
        } else {
            OracleError::Unavailable(err.to_string())
        }
    }
}

fn rejection_message(raw: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(raw) {
        Ok(ErrorBody {
            code: Some(code),
            message: Some(message),
        }) => format!("{code}: {message}"),
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        _ => raw.to_string(),
    }
}

#[derive(Serialize)]
struct CheckBody<'a> {
    tuple_key: &'a TupleKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization_model_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct CheckResponse {
    #[serde(default)]
    allowed: bool,
}

#[derive(Serialize)]
struct ListObjectsBody<'a> {
    user: &'a str,
    relation: &'a str,
    #[serde(rename = "type")]
    object_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization_model_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct ListObjectsResponse {
    #[serde(default)]
    objects: Vec<String>,
}

#[derive(Serialize)]
struct UserTypeFilter<'a> {
    #[serde(rename = "type")]
    user_type: &'a str,
}

#[derive(Serialize)]
struct ListUsersBody<'a> {
    object: &'a PartyObject,
    relation: &'a str,
    user_filters: [UserTypeFilter<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization_model_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct ListUsersResponse {
    #[serde(default)]
    users: Vec<ListedUser>,
}

#[derive(Serialize)]
struct TupleWrites<'a> {
    tuple_keys: &'a [TupleKey],
    on_duplicate: &'static str,
}

#[derive(Serialize)]
struct TupleDeletes<'a> {
    tuple_keys: &'a [TupleKey],
    on_missing: &'static str,
}

#[derive(Serialize)]
struct WriteBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    writes: Option<TupleWrites<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deletes: Option<TupleDeletes<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization_model_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct Empty {}

#[async_trait]
impl OracleTransport for HttpOracle {
    async fn check(&self, tuple: &TupleKey) -> Result<bool, OracleError> {
        let body = CheckBody {
            tuple_key: tuple,
            authorization_model_id: self.authorization_model_id.as_deref(),
        };
        let response: CheckResponse = self.post("check", &body).await?;
        Ok(response.allowed)
    }

    async fn list_objects(
        &self,
        user: &str,
        relation: &str,
        object_type: &str,
    ) -> Result<Vec<String>, OracleError> {
        let body = ListObjectsBody {
            user,
            relation,
            object_type,
            authorization_model_id: self.authorization_model_id.as_deref(),
        };
        let response: ListObjectsResponse = self.post("list-objects", &body).await?;
        Ok(response.objects)
    }

    async fn list_users(
        &self,
        object: &PartyObject,
        relation: &str,
        user_type: &str,
    ) -> Result<Vec<ListedUser>, OracleError> {
        let body = ListUsersBody {
            object,
            relation,
            user_filters: [UserTypeFilter { user_type }],
            authorization_model_id: self.authorization_model_id.as_deref(),
        };
        let response: ListUsersResponse = self.post("list-users", &body).await?;
        Ok(response.users)
    }

    async fn write(&self, request: WriteRequest) -> Result<(), OracleError> {
        let body = WriteBody {
            writes: (!request.writes.is_empty()).then(|| TupleWrites {
                tuple_keys: &request.writes,
                on_duplicate: "ignore",
            }),
            deletes: (!request.deletes.is_empty()).then(|| TupleDeletes {
                tuple_keys: &request.deletes,
                on_missing: "ignore",
            }),
            authorization_model_id: self.authorization_model_id.as_deref(),
        };
        let _: Empty = self.post("write", &body).await?;
        Ok(())
    }
}
