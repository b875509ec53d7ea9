use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::analyzer::TextAnalyzerService;
use crate::auth::{AuthenticatedUser, IdentityResolver};
use crate::error::AppError;
use crate::health::HealthChecker;
use crate::metrics::Metrics;
use crate::repository::TextAnalysisRecord;
use crate::response::{ApiResponse, MetricResponse};
use crate::text_stats::TextStats;
use crate::throttler::Throttler;
use crate::validation::{CreateTextRequest, ValidatedJson};

/// Shared application state
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub analyzer: TextAnalyzerService,
    pub throttler: Throttler,
    pub identity: Arc<dyn IdentityResolver>,
    pub health: HealthChecker,
    pub metrics: Arc<Metrics>,
}

type ApiResult<T> = Result<ApiResponse<T>, AppError>;

pub async fn word_count(
    State(state): State<SharedState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<CreateTextRequest>,
) -> ApiResult<MetricResponse> {
    let count = state.analyzer.word_count(&user_id, body.content()).await?;
    Ok(ApiResponse::ok(
        "The words in the text have been successfully analyzed.",
        MetricResponse::count("words", count),
    ))
}

pub async fn character_count(
    State(state): State<SharedState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<CreateTextRequest>,
) -> ApiResult<MetricResponse> {
    let count = state.analyzer.character_count(&user_id, body.content()).await?;
    Ok(ApiResponse::ok(
        "The characters in the text have been successfully analyzed.",
        MetricResponse::count("characters", count),
    ))
}

pub async fn sentence_count(
    State(state): State<SharedState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<CreateTextRequest>,
) -> ApiResult<MetricResponse> {
    let count = state.analyzer.sentence_count(&user_id, body.content()).await?;
    Ok(ApiResponse::ok(
        "The sentences in the text have been successfully analyzed.",
        MetricResponse::count("sentences", count),
    ))
}

pub async fn paragraph_count(
    State(state): State<SharedState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<CreateTextRequest>,
) -> ApiResult<MetricResponse> {
    let count = state.analyzer.paragraph_count(&user_id, body.content()).await?;
    Ok(ApiResponse::ok(
        "The paragraphs in the text have been successfully analyzed.",
        MetricResponse::count("paragraphs", count),
    ))
}

pub async fn longest_words(
    State(state): State<SharedState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<CreateTextRequest>,
) -> ApiResult<MetricResponse> {
    let words = state.analyzer.longest_words(&user_id, body.content()).await?;
    Ok(ApiResponse::ok(
        "The longest words in the text have been successfully analyzed.",
        MetricResponse::words("longestWord", words),
    ))
}

/// Full statistics; every call is recorded in the user's history.
pub async fn analyze_text(
    State(state): State<SharedState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<CreateTextRequest>,
) -> ApiResult<TextStats> {
    let stats = state.analyzer.analyze_text(&user_id, body.content()).await?;
    Ok(ApiResponse::ok("The text has been successfully analyzed.", stats))
}

pub async fn list_analyses(
    State(state): State<SharedState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<TextAnalysisRecord>> {
    let records = state.analyzer.records_for_user(&user_id).await?;
    Ok(ApiResponse::ok("The analyze has been successfully retrieved.", records))
}

pub async fn get_analysis(
    State(state): State<SharedState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<TextAnalysisRecord> {
    let record = state.analyzer.record(&user_id, id).await?;
    Ok(ApiResponse::ok("The analyze has been successfully retrieved.", record))
}

pub async fn delete_analysis(
    State(state): State<SharedState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.analyzer.delete_record(&user_id, id).await?;
    Ok(ApiResponse::ok("The analyze has been successfully deleted.", ()))
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.health.check_health().await)
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<SharedState>) -> impl IntoResponse {
    let status = state.health.check_health().await;
    let redis = status.dependencies.redis.status;

    if redis == "unavailable" {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "redis": redis
            })),
        )
    } else {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "redis": redis
            })),
        )
    }
}

pub async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}
