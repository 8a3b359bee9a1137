use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::Authority;
use crate::config::AuthorityConfig;
use crate::error::WillError;
use crate::will::{Address, Intent, WillSnapshot};

#[derive(Debug, Deserialize)]
struct SuccessBody {
    data: WillSnapshot,
}

/// Client for an execution authority reached over the intent API.
///
/// Timeouts, broken connections and 5xx responses are ambiguous: the intent
/// may or may not have been committed, so they surface as
/// [`WillError::AuthorityUnavailable`] and callers must re-sync. A connection
/// that was never established cannot have delivered anything and is a plain
/// [`WillError::AuthorityRejected`].
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthority {
    pub fn new(config: &AuthorityConfig) -> Result<Self, WillError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| WillError::AuthorityUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn will_url(&self, owner: &Address) -> String {
        format!("{}/api/wills/{}", self.base_url, owner)
    }

    async fn snapshot_from(response: Response) -> Result<WillSnapshot, WillError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<SuccessBody>()
                .await
                .map(|body| body.data)
                .map_err(|e| WillError::AuthorityUnavailable(format!("malformed response: {e}")));
        }
        Err(Self::error_from(status, response).await)
    }

    async fn error_from(status: StatusCode, response: Response) -> WillError {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string());

        if status.is_server_error() {
            return WillError::AuthorityUnavailable(message);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return WillError::AuthorityRejected(message);
        }
        typed_error(&body).unwrap_or(WillError::InvalidRequest(message))
    }
}

fn send_error(err: reqwest::Error) -> WillError {
    if err.is_connect() {
        WillError::AuthorityRejected(format!("not delivered: {err}"))
    } else {
        WillError::AuthorityUnavailable(err.to_string())
    }
}

/// Recovers the core error from an `{"error": .., "details": ..}` body.
fn typed_error(body: &Value) -> Option<WillError> {
    let mut tagged = Map::new();
    tagged.insert("error".to_string(), body.get("error")?.clone());
    if let Some(details) = body.get("details").filter(|d| !d.is_null()) {
        tagged.insert("details".to_string(), details.clone());
    }
    serde_json::from_value(Value::Object(tagged)).ok()
}

#[async_trait]
impl Authority for HttpAuthority {
    async fn submit(&self, owner: &Address, intent: Intent) -> Result<WillSnapshot, WillError> {
        debug!(%owner, operation = %intent.operation(), "submitting intent");
        let response = self
            .client
            .post(format!("{}/intents", self.will_url(owner)))
            .json(&intent)
            .send()
            .await
            .map_err(send_error)?;
        Self::snapshot_from(response).await
    }

    async fn fetch(&self, owner: &Address) -> Result<Option<WillSnapshot>, WillError> {
        let response = self
            .client
            .get(self.will_url(owner))
            .send()
            .await
            .map_err(send_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::snapshot_from(response).await.map(Some)
    }
}
