use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use mystic_types::api::ApiEnvelope;

/// 419 marks "session expired" so the frontend can distinguish it from a
/// plain 401 and trigger an automatic logout. Non-standard, deliberate.
pub const SESSION_EXPIRED: u16 = 419;

/// Typed application error: a status code plus a wire-safe message.
/// Serializes as the standard envelope with `data: null`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    pub fn internal() -> Self {
        Self::new(500, "Internal server error")
    }
}

/// Unanticipated errors become a generic 500. The detail stays in the
/// server log, never on the wire.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("internal error: {err:#}");
        Self::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ApiEnvelope::<()>::empty(self.status, self.message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonstandard_419_survives_conversion() {
        let res = ApiError::new(SESSION_EXPIRED, "session expired").into_response();
        assert_eq!(res.status().as_u16(), 419);
    }

    #[test]
    fn anyhow_errors_become_opaque_500s() {
        let err: ApiError = anyhow::anyhow!("db exploded: secret detail").into();
        assert_eq!(err.status, 500);
        assert_eq!(err.message, "Internal server error");
    }
}
