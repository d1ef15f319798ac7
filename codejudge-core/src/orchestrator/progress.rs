//! Progress reporting for evaluation requests
//!
//! The orchestrator reports lifecycle transitions and the final artifact
//! through a [`ProgressSink`]. Two sinks ship with the crate:
//!
//! - [`ChannelProgressSink`] forwards [`ProgressEvent`]s over a tokio mpsc channel
//! - [`TracingProgressSink`] writes them to the log
//!
//! # Example
//!
//! ```rust,ignore
//! use codejudge_core::orchestrator::{ProgressEvent, progress_channel};
//!
//! let (sink, mut rx) = progress_channel(32);
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{}", event.describe());
//!     }
//! });
//! let result = orchestrator.run(&request, &sink).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::aggregate::AggregateResult;

/// Lifecycle of one evaluation request as seen by its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskLifecycle {
    Working,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskLifecycle::Working => "working",
            TaskLifecycle::Completed => "completed",
            TaskLifecycle::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Notification emitted while a request is processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Lifecycle transition with a human-readable message
    Update {
        state: TaskLifecycle,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Terminal artifact carrying the aggregate result
    Artifact {
        name: String,
        result: AggregateResult,
        timestamp: DateTime<Utc>,
    },
}

impl ProgressEvent {
    /// Lifecycle state, if this is an update
    pub fn state(&self) -> Option<TaskLifecycle> {
        match self {
            ProgressEvent::Update { state, .. } => Some(*state),
            ProgressEvent::Artifact { .. } => None,
        }
    }

    /// One-line description for logs and terminals
    pub fn describe(&self) -> String {
        match self {
            ProgressEvent::Update { state, message, .. } => format!("[{}] {}", state, message),
            ProgressEvent::Artifact { name, result, .. } => {
                format!("[artifact] {}: winner {}", name, result.winner)
            }
        }
    }
}

/// Receives progress from the orchestrator.
///
/// Delivery is best effort; a sink must not fail the evaluation.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update(&self, state: TaskLifecycle, message: &str);

    async fn artifact(&self, name: &str, result: &AggregateResult);
}

/// Receiver half of a progress channel
pub type ProgressReceiver = mpsc::Receiver<ProgressEvent>;

/// Sink that forwards events into a tokio mpsc channel
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    sender: mpsc::Sender<ProgressEvent>,
}

/// Creates a progress channel with the specified buffer capacity.
pub fn progress_channel(buffer_size: usize) -> (ChannelProgressSink, ProgressReceiver) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ChannelProgressSink { sender }, receiver)
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn update(&self, state: TaskLifecycle, message: &str) {
        let _ = self
            .sender
            .send(ProgressEvent::Update {
                state,
                message: message.to_string(),
                timestamp: Utc::now(),
            })
            .await;
    }

    async fn artifact(&self, name: &str, result: &AggregateResult) {
        let _ = self
            .sender
            .send(ProgressEvent::Artifact {
                name: name.to_string(),
                result: result.clone(),
                timestamp: Utc::now(),
            })
            .await;
    }
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressSink;

#[async_trait]
impl ProgressSink for TracingProgressSink {
    async fn update(&self, state: TaskLifecycle, message: &str) {
        match state {
            TaskLifecycle::Failed => error!(state = %state, "{}", message),
            _ => info!(state = %state, "{}", message),
        }
    }

    async fn artifact(&self, name: &str, result: &AggregateResult) {
        info!(
            artifact = name,
            winner = %result.winner,
            execution_correctness = result.execution_correctness,
            style_score = result.style_score,
            conciseness = result.conciseness,
            relevance = result.relevance,
            "evaluation artifact"
        );
    }
}
