use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Failures visible to the submitting client. Store failures never end up here, the batch is
/// already accepted by the time they happen.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid JSON: {0}")]
    MalformedBatch(#[source] serde_json::Error),
    #[error("Invalid entry at index {index}: {reason}")]
    InvalidEntry { index: usize, reason: &'static str },
    #[error("Only POST allowed")]
    MethodNotAllowed,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MalformedBatch(_) | GatewayError::InvalidEntry { .. } => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
