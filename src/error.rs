//! Error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Faults raised while binding a widget to its document.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WidgetError {
    /// A required element is absent from the hosting document.
    #[error("Missing document element: #{id}")]
    MissingElement { id: String },
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Widget not found: {0}")]
    WidgetNotFound(String),

    #[error("Widget mount failed: {0}")]
    Mount(#[from] WidgetError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::WidgetNotFound(_) => StatusCode::NOT_FOUND,
            Self::Mount(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(name: "api.error", error = %self, "Request failed");
        } else {
            tracing::debug!(name: "api.error", error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
