use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `{statusCode, message, data}` envelope returned by every API route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: &str, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn with_status(status: StatusCode, message: &str, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.to_string(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Value of a single metric: a count, or the longest words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(usize),
    Words(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub count: MetricValue,
}

impl MetricResponse {
    pub fn count(kind: &'static str, count: usize) -> Self {
        Self {
            kind,
            count: MetricValue::Count(count),
        }
    }

    pub fn words(kind: &'static str, words: Vec<String>) -> Self {
        Self {
            kind,
            count: MetricValue::Words(words),
        }
    }
}
