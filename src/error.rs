use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::SystemTime;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Too Many Requests. Please try again in {retry_after_secs} seconds.")]
    ThrottleRejected { retry_after_secs: u64 },
    #[error("{0} not found")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("Failed to compute text statistics: {0}")]
    Computation(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ThrottleRejected { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Computation(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::ThrottleRejected { .. } => "too_many_requests",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Validation(_) => "bad_request",
            AppError::Upstream(_) => "service_unavailable",
            AppError::Computation(_) => "computation_failed",
            AppError::Configuration(_) => "configuration_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization failed: {}", err))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub error: String,
    pub message: String,
    /// RFC 3339 time of a throttle rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorResponse {
    pub fn from_app_error(err: &AppError) -> Self {
        let timestamp = matches!(err, AppError::ThrottleRejected { .. })
            .then(|| humantime::format_rfc3339_millis(SystemTime::now()).to_string());
        Self {
            status_code: err.status_code().as_u16(),
            error: err.kind().to_string(),
            message: err.to_string(),
            timestamp,
            path: None,
        }
    }
}

impl AppError {
    /// Response that also names the request path it rejects.
    pub fn into_response_for(self, path: &str) -> Response {
        let mut body = ErrorResponse::from_app_error(&self);
        body.path = Some(path.to_string());
        self.respond(body)
    }

    fn respond(self, body: ErrorResponse) -> Response {
        let mut response = (self.status_code(), Json(body)).into_response();

        if let AppError::ThrottleRejected { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_app_error(&self);
        self.respond(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_rejection_maps_to_429_with_retry_after() {
        let response = AppError::ThrottleRejected { retry_after_secs: 7 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "7");
    }

    #[test]
    fn test_error_response_body() {
        let body = ErrorResponse::from_app_error(&AppError::NotFound("Analysis record".into()));
        assert_eq!(body.status_code, 404);
        assert_eq!(body.error, "not_found");
        assert_eq!(body.message, "Analysis record not found");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 404);
        assert!(json.get("timestamp").is_none());
        assert!(json.get("path").is_none());
    }

    #[test]
    fn test_throttle_body_carries_timestamp_and_path() {
        let body = ErrorResponse::from_app_error(&AppError::ThrottleRejected {
            retry_after_secs: 3,
        });
        let timestamp = body.timestamp.unwrap();
        assert!(humantime::parse_rfc3339(&timestamp).is_ok(), "{}", timestamp);

        let response = AppError::ThrottleRejected { retry_after_secs: 3 }
            .into_response_for("/api/analyze/words");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "3");
    }

    #[test]
    fn test_rejection_message_mentions_seconds() {
        let err = AppError::ThrottleRejected { retry_after_secs: 10 };
        assert_eq!(
            err.to_string(),
            "Too Many Requests. Please try again in 10 seconds."
        );
    }
}
