// Operation error taxonomy shared by the storage layer and the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors surfaced by engine operations. Every variant is terminal for the
/// request; callers re-invoke after fixing the precondition.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or insufficient input (no approved teams, not enough teams
    /// for a group stage, wrong qualifier count).
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The operation is not valid in the current state (no winner decided,
    /// no bracket to finalize into).
    #[error("{0}")]
    StateConflict(String),

    /// Underlying persistence failure; the enclosing transaction has been
    /// rolled back, so no partial bracket state survives.
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::StateConflict(_) => StatusCode::CONFLICT,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Error::Storage(e) => {
                tracing::error!("Database error: {e}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
