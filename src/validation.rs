use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

/// Body of every analysis request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTextRequest {
    #[validate(
        required(message = "content is required"),
        length(min = 1, message = "content should not be empty")
    )]
    pub content: Option<String>,
}

impl CreateTextRequest {
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// JSON body that has passed its `validator` rules.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| AppError::Validation(errors.to_string()))?;

        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_accepts_content() {
        let request = json_request(r#"{"content":"hi"}"#);
        let ValidatedJson(body) = ValidatedJson::<CreateTextRequest>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(body.content(), "hi");
    }

    #[tokio::test]
    async fn test_rejects_missing_null_and_empty_content() {
        for body in [r#"{}"#, r#"{"content":null}"#, r#"{"content":""}"#] {
            let result =
                ValidatedJson::<CreateTextRequest>::from_request(json_request(body), &()).await;
            assert!(matches!(result, Err(AppError::Validation(_))), "accepted {}", body);
        }
    }

    #[tokio::test]
    async fn test_rejects_malformed_json() {
        let result =
            ValidatedJson::<CreateTextRequest>::from_request(json_request("{not json"), &()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
