use std::sync::Arc;
use std::time::Duration;

use crate::key_generator::{KeyExtractor, RequestContext};
use crate::metrics::Metrics;
use crate::rate_limit_config::ThrottleSettings;
use crate::rate_limiter::{Decision, RateLimiter, SweepHandle};

/// Admission control for incoming requests.
///
/// Combines a key extractor with the fixed-window limiter. A failure inside
/// the limiter lets the request through and is logged; it never turns into a
/// rejection.
pub struct Throttler {
    limiter: Arc<RateLimiter>,
    keys: Arc<dyn KeyExtractor>,
    metrics: Arc<Metrics>,
}

impl Throttler {
    pub fn new(
        settings: ThrottleSettings,
        keys: Arc<dyn KeyExtractor>,
        metrics: Arc<Metrics>,
    ) -> Self {
        tracing::info!(
            limit = settings.limit,
            window_ms = settings.window.as_millis() as u64,
            penalty_ms = settings.penalty.as_millis() as u64,
            "Throttler initialized"
        );
        Self {
            limiter: Arc::new(RateLimiter::new(settings)),
            keys,
            metrics,
        }
    }

    /// Decide whether the request described by `ctx` may proceed.
    pub fn admit(&self, ctx: &RequestContext) -> Decision {
        let key = self.keys.extract(ctx);
        self.admit_key(&key)
    }

    pub fn admit_key(&self, key: &str) -> Decision {
        tracing::debug!(tracker = %key, "Rate limit check");

        match self.limiter.check_and_record(key) {
            Ok(decision) => {
                self.metrics.record_request(decision.is_allowed());
                if let Decision::Reject { retry_after_secs } = decision {
                    tracing::warn!(tracker = %key, retry_after_secs, "Rate limit exceeded");
                }
                decision
            }
            Err(err) => {
                tracing::error!(
                    tracker = %key,
                    error = %err,
                    "Throttle bookkeeping failed, allowing request"
                );
                self.metrics.record_fail_open();
                Decision::Allow
            }
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn settings(&self) -> &ThrottleSettings {
        self.limiter.settings()
    }

    pub fn spawn_sweeper(&self, every: Duration) -> SweepHandle {
        self.limiter.spawn_sweeper(every)
    }
}
