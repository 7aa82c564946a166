use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lyra_core::ConstructionError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,
    #[error("Failed to rebuild core: {0}")]
    Reset(#[from] ConstructionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::EmptyPrompt => StatusCode::BAD_REQUEST,
            ApiError::Reset(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
