//! Scoring cascade
//!
//! Turns one translation into one [`CaseEvaluation`] by asking scoring
//! backends in priority order. Quota exhaustion triggers a pause before the
//! next backend; any other failure moves on at once. When every backend has
//! failed the cascade returns a degraded, zero-scored evaluation instead of an
//! error.

mod backoff;
mod cascade;
mod evaluation;
mod prompt;

pub use backoff::{
    BackoffPolicy, BatchMode, RecordingSleeper, Sleeper, TokioSleeper, is_quota_exhausted,
};
pub use cascade::{BackendDescriptor, ScoringBackend, ScoringCascade};
pub use evaluation::{CaseEvaluation, DEFAULT_SCORE, NO_WINNER};
pub use prompt::JudgingPrompt;
