use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid transition: cannot {action} while {current}")]
    InvalidTransition { action: &'static str, current: String },

    #[error("request already accepted by another driver")]
    AlreadyAccepted,

    #[error("booking already has a live transport request")]
    DuplicateActiveRequest,

    #[error("stale state: expected {expected}, found {current}")]
    StaleState { expected: String, current: String },

    #[error("unknown vehicle type: {0}")]
    InvalidVehicleType(String),

    #[error("at least one arrival photo is required to complete the trip")]
    MissingPhoto,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::InvalidTransition { .. }
            | AppError::AlreadyAccepted
            | AppError::DuplicateActiveRequest
            | AppError::StaleState { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvalidVehicleType(_) | AppError::MissingPhoto => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            // Storage faults are not business-rule failures; keep the body generic.
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "something went wrong, try again".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
