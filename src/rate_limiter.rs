//! Fixed-window request counter with a penalty box.
//!
//! Records live in a sharded concurrent map: a check-and-record holds the
//! shard lock of its key for the whole read-modify-write, and the sweep
//! re-evaluates expiry under the same lock before deleting anything.
//! State is process-local; several instances behind a balancer each keep
//! their own counters.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::rate_limit_config::ThrottleSettings;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("penalty deadline overflows the clock for key {0}")]
    DeadlineOverflow(String),
}

/// Per-key bookkeeping. A key without a record is fresh; a record with a
/// future `blocked_until` is blocked; any other record is counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleRecord {
    pub hits: u32,
    pub window_start: Instant,
    pub blocked_until: Option<Instant>,
}

impl ThrottleRecord {
    fn fresh(now: Instant) -> Self {
        Self {
            hits: 1,
            window_start: now,
            blocked_until: None,
        }
    }

    fn window_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    fn block_expired(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| until <= now)
    }

    /// A record that the next hit replaces with a fresh one.
    fn is_reset_due(&self, now: Instant, window: Duration) -> bool {
        self.block_expired(now) || self.window_expired(now, window)
    }

    /// A record the background sweep may drop.
    fn is_sweepable(&self, now: Instant, window: Duration) -> bool {
        self.window_expired(now, window) && self.blocked_until.map_or(true, |until| until <= now)
    }

    pub fn is_blocked(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject { retry_after_secs: u64 },
}

impl Decision {
    fn reject_for(wait: Duration) -> Self {
        Decision::Reject {
            retry_after_secs: ceil_secs(wait),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

fn ceil_secs(wait: Duration) -> u64 {
    wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
}

pub struct RateLimiter {
    settings: ThrottleSettings,
    records: DashMap<String, ThrottleRecord>,
}

impl RateLimiter {
    pub fn new(settings: ThrottleSettings) -> Self {
        Self {
            settings,
            records: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &ThrottleSettings {
        &self.settings
    }

    /// Count a hit for `key` against the current clock.
    pub fn check_and_record(&self, key: &str) -> Result<Decision, GuardError> {
        // Read the clock under the shard lock so concurrent hits on one key
        // never observe a window that starts after their own timestamp.
        self.check_and_record_with(key, Instant::now)
    }

    /// Count a hit for `key` as if it arrived at `now`.
    pub fn check_and_record_at(&self, key: &str, now: Instant) -> Result<Decision, GuardError> {
        self.check_and_record_with(key, || now)
    }

    fn check_and_record_with(
        &self,
        key: &str,
        clock: impl FnOnce() -> Instant,
    ) -> Result<Decision, GuardError> {
        match self.records.entry(key.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(ThrottleRecord::fresh(clock()));
                Ok(Decision::Allow)
            }
            Entry::Occupied(mut slot) => self.advance(key, slot.get_mut(), clock()),
        }
    }

    fn advance(
        &self,
        key: &str,
        record: &mut ThrottleRecord,
        now: Instant,
    ) -> Result<Decision, GuardError> {
        // Hits are not counted while the key sits in the penalty box.
        if let Some(until) = record.blocked_until {
            if now < until {
                return Ok(Decision::reject_for(until - now));
            }
        }

        if record.is_reset_due(now, self.settings.window) {
            *record = ThrottleRecord::fresh(now);
            return Ok(Decision::Allow);
        }

        record.hits = record.hits.saturating_add(1);
        if record.hits > self.settings.limit {
            let until = now
                .checked_add(self.settings.penalty)
                .ok_or_else(|| GuardError::DeadlineOverflow(key.to_owned()))?;
            record.blocked_until = Some(until);
            return Ok(Decision::reject_for(self.settings.penalty));
        }

        Ok(Decision::Allow)
    }

    /// Snapshot of the record for `key`, if any.
    pub fn record(&self, key: &str) -> Option<ThrottleRecord> {
        self.records.get(key).map(|entry| entry.value().clone())
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.records.len()
    }

    /// Drop every record whose window and block have both run out.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let window = self.settings.window;
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_sweepable(now, window));
        before.saturating_sub(self.records.len())
    }

    /// Run [`RateLimiter::sweep`] every `every` until the handle is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> SweepHandle {
        let limiter = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = limiter.tracked_keys(),
                        "Swept expired throttle records"
                    );
                }
            }
        });
        tracing::info!(interval_secs = every.as_secs(), "Throttle sweeper started");
        SweepHandle { handle }
    }
}

/// Owns the background sweep task; aborting happens on drop.
pub struct SweepHandle {
    handle: JoinHandle<()>,
}

impl SweepHandle {
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.handle.abort();
        tracing::debug!("Throttle sweeper stopped");
    }
}
