pub mod analyzer;
pub mod auth;
pub mod cache;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod handlers;
pub mod health;
pub mod key_generator;
pub mod metrics;
pub mod middleware;
pub mod rate_limit_config;
pub mod rate_limiter;
pub mod redis;
pub mod repository;
pub mod response;
pub mod server;
pub mod text_stats;
pub mod text_utils;
pub mod throttler;
pub mod validation;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use response::ApiResponse;
pub use server::create_app;
