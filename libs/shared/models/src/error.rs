use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    /// Not-found reported under the `error` key.
    #[error("Not Found: {0}")]
    NotFound(String),

    /// Not-found reported under the `message` key. Edit, find and delete
    /// have always answered this way and clients key off it.
    #[error("No match: {0}")]
    NoMatch(String),

    #[error("{message}: {source}")]
    Database {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{message}: {source}")]
    Storage {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn database(message: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Self {
        let message = message.into();
        move |source| AppError::Database { message, source }
    }

    pub fn storage(message: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let message = message.into();
        move |source| AppError::Storage { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) | AppError::NoMatch(_) => StatusCode::NOT_FOUND,
            AppError::Database { .. } | AppError::Storage { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Oversize bodies keep their 413; every other multipart failure is the client's input.
impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::BadRequest(msg) | AppError::ValidationError(msg) | AppError::PayloadTooLarge(msg) => {
                tracing::debug!("Rejected request: {}: {}", status, msg);
                json!({ "error": msg })
            }
            AppError::NotFound(msg) => {
                tracing::debug!("Not found: {}", msg);
                json!({ "error": msg })
            }
            AppError::NoMatch(msg) => {
                tracing::debug!("No match: {}", msg);
                json!({ "message": msg })
            }
            AppError::Database { message, source } => {
                tracing::error!("Error: {}: {}: {:?}", status, message, source);
                json!({ "error": message })
            }
            AppError::Storage { message, source } => {
                tracing::error!("Error: {}: {}: {:?}", status, message, source);
                json!({ "error": message })
            }
            AppError::Internal(msg) => {
                tracing::error!("Error: {}: {}", status, msg);
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body_of(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_use_error_key() {
        let (status, body) = body_of(AppError::ValidationError("All fields are required".into())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "All fields are required" }));
    }

    #[tokio::test]
    async fn no_match_uses_message_key() {
        let (status, body) = body_of(AppError::NoMatch("Patient not found".into())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "Patient not found" }));
    }

    #[tokio::test]
    async fn payload_too_large_keeps_its_status() {
        let (status, body) = body_of(AppError::PayloadTooLarge("length limit exceeded".into())).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({ "error": "length limit exceeded" }));
    }

    #[tokio::test]
    async fn database_errors_hide_driver_detail() {
        let error = AppError::database("Database error")(sqlx::Error::PoolTimedOut);
        let (status, body) = body_of(error).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Database error" }));
    }

    #[tokio::test]
    async fn internal_errors_return_generic_message() {
        let (status, body) = body_of(AppError::Internal("pool handle missing".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
