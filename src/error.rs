//! Error Types
//!
//! `TransportError` is what the HTTP layer reports; `ApiError` is what the
//! session and collection operations hand back to the UI.

use std::time::Duration;

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Failures observed by the transport for a single request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 401 from any endpoint. The forced logout has already run.
    #[error("unauthorized")]
    Unauthorized { body: String },
    #[error("server responded with status {status}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("could not encode request body: {0}")]
    Encode(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Unauthorized { .. } => Some(401),
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-supplied `detail` message from the error body
    pub fn detail(&self) -> Option<String> {
        match self {
            TransportError::Unauthorized { body } | TransportError::Status { body, .. } => server_detail(body),
            _ => None,
        }
    }
}

/// Extract `detail` from a JSON error body. Non-string details (validation
/// arrays and the like) are rendered as compact JSON.
pub fn server_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Operation-level failures surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Rejected locally; nothing was sent
    #[error("{0}")]
    Validation(ValidationErrors),
    /// Auth endpoint rejected the request
    #[error("{0}")]
    Authentication(String),
    /// Session was invalidated by a 401; handled globally
    #[error("session expired, please log in again")]
    AuthorizationLost,
    /// Another mutation on the same entity is still in flight
    #[error("another change to item {id} is still being saved")]
    Busy { id: String },
    /// Network or server failure with a generic message for display
    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: TransportError,
    },
}

impl ApiError {
    /// Map a transport failure of a data endpoint.
    pub fn from_transport(source: TransportError, message: &str) -> Self {
        match source {
            TransportError::Unauthorized { .. } => ApiError::AuthorizationLost,
            source => {
                tracing::warn!(error = %source, detail = ?source.detail(), "{}", message);
                ApiError::Request { message: message.to_string(), source }
            }
        }
    }

    /// Map a transport failure of an auth endpoint: any server answer becomes
    /// an authentication failure carrying `detail` (or the fallback).
    pub fn rejected(source: TransportError, fallback: &str) -> Self {
        match source.status() {
            Some(_) => ApiError::Authentication(source.detail().unwrap_or_else(|| fallback.to_string())),
            None => ApiError::from_transport(source, fallback),
        }
    }

    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Transport detail preserved for logging
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            ApiError::Request { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

/// Common result type for client operations
pub type ApiResult<T> = Result<T, ApiError>;
