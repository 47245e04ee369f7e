use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reviser_tutor::{ErrorClass, TutorError};
use serde_json::json;
use tracing::{error, warn};

const MIB: usize = 1024 * 1024;

pub fn payload_too_large_message(limit: usize) -> String {
    if limit >= MIB && limit % MIB == 0 {
        format!("File size exceeds {}MB limit", limit / MIB)
    } else if limit >= 1024 && limit % 1024 == 0 {
        format!("File size exceeds {}KB limit", limit / 1024)
    } else {
        format!("File size exceeds {limit} bytes limit")
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, payload_too_large_message(limit))
    }

    pub fn from_tutor(err: TutorError, action: &str) -> Self {
        match err.status_hint() {
            ErrorClass::Client => Self::bad_request(err.to_string()),
            ErrorClass::NotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            ErrorClass::Server => {
                error!(error = %err, action, "request failed");
                let message = match err {
                    TutorError::Response(_) => {
                        format!("{action}: the AI response could not be parsed")
                    }
                    other => format!("{action}: {other}"),
                };
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }

    pub fn from_multipart(err: MultipartError) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(status, "Request body too large");
        }
        warn!(error = %err.body_text(), "malformed multipart upload");
        Self::bad_request("No file part in request")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
        warn!(error = %rejection.body_text(), "rejected request body");
        Self::bad_request("Invalid JSON data")
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        warn!(error = %rejection.body_text(), "request is not multipart");
        Self::bad_request("No file part in request")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use reviser_llm::GenerationError;

    use super::*;

    #[test]
    fn maps_tutor_errors_to_statuses() {
        let err = ApiError::from_tutor(TutorError::InvalidPdfId, "Failed to generate quiz");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid PDF ID format.");

        let err = ApiError::from_tutor(TutorError::PdfNotFound, "Failed to generate quiz");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from_tutor(
            TutorError::Generation(GenerationError::NotConfigured),
            "Failed to score quiz",
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.starts_with("Failed to score quiz: "));
    }

    #[test]
    fn payload_limit_message_uses_the_largest_whole_unit() {
        assert_eq!(
            payload_too_large_message(16 * 1024 * 1024),
            "File size exceeds 16MB limit"
        );
        assert_eq!(
            payload_too_large_message(512 * 1024),
            "File size exceeds 512KB limit"
        );
        assert_eq!(payload_too_large_message(256), "File size exceeds 256 bytes limit");
        assert_eq!(
            ApiError::payload_too_large(2 * 1024 * 1024).message,
            "File size exceeds 2MB limit"
        );
    }
}
