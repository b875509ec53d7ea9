use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use crate::auth::{bearer_token, AuthenticatedUser};
use crate::error::AppError;
use crate::handlers::SharedState;
use crate::key_generator::RequestContext;
use crate::rate_limiter::Decision;

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = RequestContext::from_request(&request).client_ip;

    info!(
        target: "text_analyzer::middleware",
        method = %method,
        uri = %uri,
        client_ip = %client_ip,
        "Incoming request"
    );

    let response = next.run(request).await;

    let status = response.status();
    info!(
        target: "text_analyzer::middleware",
        method = %method,
        uri = %uri,
        status = %status,
        "Request completed"
    );

    response
}

/// Reject requests whose client key is over its limit or in the penalty box.
pub async fn throttle_requests(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::from_request(&request);

    match state.throttler.admit(&ctx) {
        Decision::Allow => next.run(request).await,
        Decision::Reject { retry_after_secs } => {
            tracing::warn!(
                target: "text_analyzer::middleware",
                client_ip = %ctx.client_ip,
                method = %ctx.method,
                route = %ctx.route,
                retry_after_secs,
                "Throttling request"
            );
            AppError::ThrottleRejected { retry_after_secs }.into_response_for(request.uri().path())
        }
    }
}

/// Resolve the bearer token to a user and expose it as [`AuthenticatedUser`].
pub async fn require_auth(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .map(str::to_owned)
        .ok_or(AppError::Unauthorized)?;
    let user_id = state
        .identity
        .resolve(&token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(next.run(request).await)
}
