use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced to the caller of the adapter.
///
/// Every variant is terminal for its request and is serialized into a JSON
/// error body; none of them bring the process down. The body is sent with
/// `200 OK`, so clients tell failures apart by its `status` field.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdapterError {
    /// The request body is not valid JSON.
    #[error("{0}")]
    Json(String),

    /// Missing or unknown field, unresolved reference, unknown kind.
    #[error("{0}")]
    Invalid(String),

    /// The load flow did not converge.
    #[error("{0}")]
    Convergence(String),

    /// The solver rejected the model or failed unexpectedly.
    #[error("{0}")]
    Solver(String),
}

impl AdapterError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AdapterError::Invalid(msg.into())
    }

    /// Error for a key that must be present in a JSON object.
    pub fn missing_key(key: &str) -> Self {
        AdapterError::Invalid(format!("Could not get key \"{key}\" from dictionary."))
    }

    /// Machine readable tag of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Json(_) => "JSON_ERROR",
            AdapterError::Invalid(_) => "INVALID_ERROR",
            AdapterError::Convergence(_) => "CONV_ERROR",
            AdapterError::Solver(_) => "SOLVER_ERROR",
        }
    }

    /// JSON error body sent back to the caller.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "ERROR",
            "error": self.kind(),
            "message": self.to_string(),
        })
    }
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        match &self {
            AdapterError::Solver(_) => tracing::error!(error = %self, "solver error"),
            AdapterError::Convergence(_) => tracing::warn!(error = %self, "load flow failed"),
            _ => tracing::debug!(error = %self, kind = self.kind(), "rejected request"),
        }
        (StatusCode::OK, Json(self.to_json())).into_response()
    }
}
