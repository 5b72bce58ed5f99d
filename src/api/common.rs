use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::comm::GatewayError;
use crate::common::model::{NodeIdentifier, Reading};
use crate::policy::{SyncError, SyncPolicy};

pub const SUCCESS: &str = "Success";
pub const FAILED: &str = "Failed";

const READ_FAILED_MESSAGE: &str = "Node not found in database or OPC UA server";
const WRITE_FAILED_MESSAGE: &str = "Error writing to OPC UA server";

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn success(message: &str) -> Self {
        StatusResponse {
            status: SUCCESS.to_string(),
            message: message.to_string(),
            error: None,
        }
    }

    pub fn failure(message: &str, error: &str) -> Self {
        StatusResponse {
            status: FAILED.to_string(),
            message: message.to_string(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadResponse {
    pub status: String,
    pub value: f64,
    pub timestamp: String,
    pub message: String,
    pub error: Option<String>,
}

impl ReadResponse {
    pub fn from_reading(reading: &Reading, message: &str) -> Self {
        ReadResponse {
            status: SUCCESS.to_string(),
            value: reading.value,
            timestamp: reading.timestamp.to_rfc3339(),
            message: message.to_string(),
            error: None,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeValue {
    pub node_id: NodeIdentifier,
    pub value: f64,
    pub timestamp: String,
}

impl From<Reading> for NodeValue {
    fn from(reading: Reading) -> Self {
        NodeValue {
            node_id: reading.node_id,
            value: reading.value,
            timestamp: reading.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadAllResponse {
    pub nodes: Vec<NodeValue>,
    pub status: String,
    pub message: String,
    pub error: Option<String>,
}

/// Every way a request can fail, rendered as `{status, message, error}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}: {error}")]
    NodeUnavailable {
        message: &'static str,
        error: GatewayError,
    },
    #[error("error writing to OPC UA server: {0}")]
    WriteRejected(GatewayError),
    #[error("node {0} not found in database")]
    NotFound(NodeIdentifier),
    #[error("could not validate API credentials")]
    Unauthorized,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(anyhow::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Swaps the message shown when the field device couldn't be read.
    pub fn with_read_message(self, message: &'static str) -> Self {
        match self {
            ApiError::NodeUnavailable { error, .. } => ApiError::NodeUnavailable { message, error },
            other => other,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NodeUnavailable { .. } | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::WriteRejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> StatusResponse {
        match self {
            ApiError::NodeUnavailable { message, error } => {
                StatusResponse::failure(message, error.code())
            }
            ApiError::WriteRejected(error) => {
                StatusResponse::failure(WRITE_FAILED_MESSAGE, error.code())
            }
            ApiError::NotFound(_) => {
                StatusResponse::failure("Node not found in database", "DeleteError")
            }
            ApiError::Unauthorized => {
                StatusResponse::failure("Could not validate API credentials", "Unauthorized")
            }
            ApiError::Validation(message) => StatusResponse::failure(message, "ValidationError"),
            ApiError::Store(_) => StatusResponse::failure("Access to db failed", "DatabaseError"),
            ApiError::Internal(_) => StatusResponse::failure("Internal server error", "InternalError"),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::NodeUnavailable(error) => ApiError::NodeUnavailable {
                message: READ_FAILED_MESSAGE,
                error,
            },
            SyncError::WriteRejected(error) => ApiError::WriteRejected(error),
            SyncError::NotFound(node_id) => ApiError::NotFound(node_id),
            SyncError::Store(err) => ApiError::Store(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(_) | ApiError::Internal(_) => error!("Request failed: {}", self),
            _ => tracing::debug!("Request failed: {}", self),
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Runs a policy operation on the blocking pool: the OPC UA client and
/// SQLite both block the calling thread.
pub async fn run_blocking<T, F>(policy: &SyncPolicy, operation: F) -> Result<T, ApiError>
where
    F: FnOnce(&SyncPolicy) -> Result<T, SyncError> + Send + 'static,
    T: Send + 'static,
{
    let policy = policy.clone();

    let result = tokio::task::spawn_blocking(move || operation(&policy))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_errors_keep_gateway_codes() {
        let err = ApiError::from(SyncError::NodeUnavailable(GatewayError::Read));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            err.body(),
            StatusResponse::failure(READ_FAILED_MESSAGE, "OPCReadError")
        );

        let err = ApiError::from(SyncError::WriteRejected(GatewayError::Write));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().error.as_deref(), Some("OPCWriteError"));
    }

    #[test]
    fn read_message_can_be_replaced() {
        let err = ApiError::from(SyncError::NodeUnavailable(GatewayError::Read))
            .with_read_message("Error reading from OPC UA server");

        assert_eq!(err.body().message, "Error reading from OPC UA server");

        let untouched = ApiError::Unauthorized.with_read_message("ignored");
        assert_eq!(untouched.body().message, "Could not validate API credentials");
    }
}
