use crate::analyzer::TextAnalyzerService;
use crate::auth::StaticTokenResolver;
use crate::cache::{InMemoryStatsCache, RedisStatsCache, StatsCache};
use crate::config::Config;
use crate::error::AppError;
use crate::handlers::{
    analyze_text, character_count, delete_analysis, get_analysis, health_check, list_analyses,
    longest_words, metrics, paragraph_count, readiness_check, sentence_count, word_count,
    AppState, SharedState,
};
use crate::health::HealthChecker;
use crate::metrics::Metrics;
use crate::middleware::{logging_middleware, require_auth, throttle_requests};
use crate::redis::RedisClient;
use crate::repository::{AnalysisRepository, InMemoryAnalysisRepository, RedisAnalysisRepository};
use crate::throttler::Throttler;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Wire storage, cache, identity and throttling from `config`.
pub async fn build_state(config: &Config) -> Result<SharedState, AppError> {
    config.validate()?;

    let metrics = Arc::new(Metrics::new());

    let redis = match config.redis_url() {
        Some(url) => Some(RedisClient::connect(url).await?),
        None => {
            tracing::info!("REDIS_URL not set, running with in-memory cache and storage");
            None
        }
    };

    let (repository, cache): (Arc<dyn AnalysisRepository>, Arc<dyn StatsCache>) = match &redis {
        Some(client) => (
            Arc::new(RedisAnalysisRepository::new(client.clone())),
            Arc::new(RedisStatsCache::new(client.clone())),
        ),
        None => (
            Arc::new(InMemoryAnalysisRepository::new()),
            Arc::new(InMemoryStatsCache::new()),
        ),
    };

    let identity = match config.api_tokens.as_deref() {
        Some(pairs) => StaticTokenResolver::parse(pairs)?,
        None => StaticTokenResolver::default(),
    };
    if identity.is_empty() {
        tracing::warn!(
            "No API tokens configured, every /api request will be rejected as unauthorized"
        );
    }

    let throttler = Throttler::new(
        config.throttle_settings(),
        Arc::new(config.key_strategy()?),
        Arc::clone(&metrics),
    );
    let health = HealthChecker::new(redis, Arc::clone(throttler.limiter()));

    Ok(Arc::new(AppState {
        analyzer: TextAnalyzerService::new(
            repository,
            cache,
            config.cache_ttl(),
            Arc::clone(&metrics),
        ),
        throttler,
        identity: Arc::new(identity),
        health,
        metrics,
    }))
}

pub fn build_router(state: SharedState, enable_tracing: bool) -> Router {
    let api = Router::new()
        .route("/analyze/words", post(word_count))
        .route("/analyze/characters", post(character_count))
        .route("/analyze/sentences", post(sentence_count))
        .route("/analyze/paragraphs", post(paragraph_count))
        .route("/analyze/longestWord", post(longest_words))
        .route("/analyze/text", post(analyze_text))
        .route("/analyze/all", get(list_analyses))
        .route("/analyze/:id", get(get_analysis).delete(delete_analysis))
        // Layers run bottom-up: throttling happens before authentication.
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route_layer(middleware::from_fn_with_state(state.clone(), throttle_requests));

    let app = Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(logging_middleware)),
        );

    if enable_tracing {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}

/// Router over in-process state built from `config`.
pub async fn create_app(config: Config) -> Result<Router, AppError> {
    let state = build_state(&config).await?;
    Ok(build_router(state, config.enable_tracing))
}

pub struct Server {
    config: Config,
    state: SharedState,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let state = build_state(&config).await?;
        Ok(Self { config, state })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        let sweeper = self.state.throttler.spawn_sweeper(self.config.sweep_interval());
        let app = build_router(Arc::clone(&self.state), self.config.enable_tracing);

        tracing::info!("Text analyzer listening on {}", self.config.bind_addr);
        tracing::info!("Health check available at /health");
        tracing::info!("Readiness check available at /ready");

        // Run server with graceful shutdown
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        sweeper.shutdown();
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
