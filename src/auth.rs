//! Bearer-token identity.
//!
//! Token issuance lives outside this service; requests carry a bearer token
//! and an [`IdentityResolver`] maps it to an opaque user id.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// The caller's user id, placed in request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// User id for `token`, or `None` when the token is not recognised.
    async fn resolve(&self, token: &str) -> AppResult<Option<String>>;
}

/// Fixed token table, configured as `token=userId` pairs.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, String>,
}

impl StaticTokenResolver {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// Parse `"tok-a=alice,tok-b=bob"`.
    pub fn parse(pairs: &str) -> AppResult<Self> {
        let mut tokens = HashMap::new();
        let entries = pairs.split(',').map(str::trim).filter(|pair| !pair.is_empty());
        for pair in entries {
            let (token, user) = pair
                .split_once('=')
                .map(|(token, user)| (token.trim(), user.trim()))
                .filter(|(token, user)| !token.is_empty() && !user.is_empty())
                .ok_or_else(|| {
                    AppError::Configuration(format!(
                        "Invalid API token entry '{}', expected token=userId",
                        pair
                    ))
                })?;
            tokens.insert(token.to_string(), user.to_string());
        }
        Ok(Self::new(tokens))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> AppResult<Option<String>> {
        Ok(self.tokens.get(token).cloned())
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
