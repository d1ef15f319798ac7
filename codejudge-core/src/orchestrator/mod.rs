//! Evaluation orchestration
//!
//! [`Orchestrator`] validates an [`EvalRequest`], walks its cases strictly in
//! order (participant call, reconciliation, extraction, scoring), aggregates
//! the results and reports progress through a [`ProgressSink`].

mod engine;
mod progress;
mod request;

pub use engine::{Orchestrator, RESULT_ARTIFACT};
pub use progress::{
    ChannelProgressSink, ProgressEvent, ProgressReceiver, ProgressSink, TaskLifecycle,
    TracingProgressSink, progress_channel,
};
pub use request::{EvalRequest, EvaluationCase, ValidatedRequest};
