use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::error::WillError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Will(#[from] WillError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Will(WillError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            ApiError::Will(err) if err.is_allocation_error() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Will(err) if err.is_authority_error() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Will(_) => StatusCode::CONFLICT,
        }
    }

    fn body(&self) -> Value {
        let mut body = match self {
            ApiError::Will(err) => serde_json::to_value(err).unwrap_or_else(|_| json!({ "error": err.code() })),
            ApiError::NotFound(_) => json!({ "error": "not_found" }),
            ApiError::BadRequest(_) => json!({ "error": "bad_request" }),
        };
        if let Value::Object(map) = &mut body {
            map.insert("status".to_string(), json!("error"));
            map.insert("message".to_string(), json!(self.to_string()));
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
