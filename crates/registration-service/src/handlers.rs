//! API request handlers for the Registration Service

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use enrollment_common::{Error, RegisterResponse};
use std::sync::Arc;
use tracing::error;

use crate::{intake, service::RegistrationService};

/// Message returned for every dependency failure
pub const GENERIC_FAILURE: &str = "Registration could not be completed, please try again later";

/// Shared application state
pub struct AppState {
    pub service: RegistrationService,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: RegistrationService, max_upload_bytes: usize) -> Self {
        Self {
            service,
            max_upload_bytes,
        }
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(RegisterResponse::rejected(self.message))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_input_error() {
            let status = match err {
                Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            };
            return ApiError {
                status,
                message: err.to_string(),
            };
        }

        error!("Registration error: {}", err);
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: GENERIC_FAILURE.to_string(),
        }
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "registration-service"
    }))
}

/// Accept a registration and return its ticket number
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<RegisterResponse>, ApiError> {
    let submission = intake::read_submission(request, state.max_upload_bytes).await?;

    let registration = state.service.register(submission).await?;

    Ok(Json(RegisterResponse::accepted(registration)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_keep_their_message() {
        let api_error = ApiError::from(Error::MissingRequiredFields);
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.message, "Full Name and Email are required");

        let too_large = ApiError::from(Error::PayloadTooLarge(1024));
        assert_eq!(too_large.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_dependency_errors_are_generic() {
        let api_error = ApiError::from(Error::Redis("READONLY You can't write against a replica".to_string()));

        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.message, GENERIC_FAILURE);
        assert!(!api_error.message.contains("READONLY"));
    }
}
