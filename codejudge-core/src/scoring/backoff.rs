//! Backoff policy for quota-exhausted scoring backends
//!
//! A quota failure is never retried on the same backend. The cascade pauses for
//! the interval of the current batch mode and then moves to the next backend.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::ScoringConfig;
use crate::error::JudgeError;

/// Lower-cased fragments that identify rate or quota exhaustion in error text
const QUOTA_SIGNALS: &[&str] = &[
    "429",
    "resource_exhausted",
    "quota",
    "rate limit",
    "too many requests",
];

/// Whether the request being scored has one case or several
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Single,
    Multi,
}

impl BatchMode {
    pub fn for_case_count(count: usize) -> Self {
        if count > 1 {
            BatchMode::Multi
        } else {
            BatchMode::Single
        }
    }
}

/// Pause intervals after a quota failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub single_case: Duration,
    pub multi_case: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            single_case: Duration::from_secs(30),
            multi_case: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            single_case: config.single_case_backoff,
            multi_case: config.multi_case_backoff,
        }
    }

    /// Pause to take before the next backend
    pub fn interval(&self, mode: BatchMode) -> Duration {
        match mode {
            BatchMode::Single => self.single_case,
            BatchMode::Multi => self.multi_case,
        }
    }
}

/// Whether an attempt failed because the backend ran out of quota.
///
/// Typed [`JudgeError::RateLimited`] errors always count; other errors are
/// matched on their text, case-insensitively.
pub fn is_quota_exhausted(error: &JudgeError) -> bool {
    if matches!(error, JudgeError::RateLimited(_)) {
        return true;
    }
    let text = error.to_string().to_lowercase();
    QUOTA_SIGNALS.iter().any(|signal| text.contains(signal))
}

/// Suspends the current task; injected so tests never wait on a clock
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and remembers every requested pause
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses requested so far, in order
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .map(|pauses| pauses.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
    }
}
