use axum::Json;
use axum::body::Bytes;
use tokio::task::JoinError;
use tracing::debug;

use crate::error::AdapterError;
use crate::io::request::{Reply, handle_request};

pub const WELCOME: &str = "Welcome to Electric Blocks Panda Power. Please visit <a href=\"https://github.com/Electric-Blocks\">https://github.com/Electric-Blocks</a> for more info.";

/// `GET /` → 200 + welcome text
pub async fn welcome() -> &'static str {
    WELCOME
}

/// `GET|POST /api` → 200 + reply, or the error body of the failure.
///
/// Building and solving the model is CPU bound and runs on the blocking pool.
pub async fn api(body: Bytes) -> Result<Json<Reply>, AdapterError> {
    debug!(bytes = body.len(), "api request");
    let reply = tokio::task::spawn_blocking(move || handle_request(&body))
        .await
        .map_err(unknown_failure)??;
    Ok(Json(reply))
}

/// Maps a panicked or cancelled solve to a solver error.
fn unknown_failure(err: JoinError) -> AdapterError {
    let message = match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic without message".to_owned()),
        Err(err) => err.to_string(),
    };
    AdapterError::Solver(format!("Unknown exception has occured: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panics_become_solver_errors() {
        let err = tokio::task::spawn_blocking(|| -> Result<Reply, AdapterError> { panic!("boom") })
            .await
            .unwrap_err();
        assert_eq!(
            unknown_failure(err),
            AdapterError::Solver("Unknown exception has occured: boom".into())
        );
    }
}
