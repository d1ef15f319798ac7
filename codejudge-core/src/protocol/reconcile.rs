//! Reduction of a participant event stream to one terminal outcome

use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::types::{Message, Task, TaskEvent, TaskState};
use crate::error::{JudgeError, Result};

/// The single outcome of one participant call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledOutcome {
    /// Text of the terminal message
    pub text: String,
    /// Whether the terminal state was a success
    pub succeeded: bool,
    /// Conversation context reported by the participant
    pub context_id: Option<String>,
}

impl ReconciledOutcome {
    /// Outcome when the stream closed without any terminal event
    pub fn no_terminal() -> Self {
        Self {
            text: String::new(),
            succeeded: false,
            context_id: None,
        }
    }

    /// Whether downstream stages have usable text to work with
    pub fn has_payload(&self) -> bool {
        self.succeeded && !self.text.trim().is_empty()
    }
}

fn non_empty(context_id: &str) -> Option<String> {
    (!context_id.is_empty()).then(|| context_id.to_string())
}

fn task_outcome(
    task: &Task,
    state: TaskState,
    message: Option<&Message>,
) -> Option<ReconciledOutcome> {
    if !state.is_terminal() {
        return None;
    }

    let mut text = message.map(Message::text).unwrap_or_default();
    if text.is_empty() {
        text = task.artifact_text();
    }

    Some(ReconciledOutcome {
        text,
        succeeded: state == TaskState::Completed,
        context_id: non_empty(&task.context_id)
            .or_else(|| message.and_then(|m| m.context_id.clone())),
    })
}

/// Inspect one event and return an outcome if it is terminal.
pub fn terminal_outcome(event: &TaskEvent) -> Option<ReconciledOutcome> {
    match event {
        TaskEvent::Message(message) => Some(ReconciledOutcome {
            text: message.text(),
            succeeded: true,
            context_id: message.context_id.clone(),
        }),
        TaskEvent::TaskWithStatus(task, update) => {
            task_outcome(task, update.status.state, update.status.message.as_ref())
        }
        TaskEvent::TaskAlone(task) => {
            task_outcome(task, task.status.state, task.status.message.as_ref())
        }
    }
}

/// How long a stream may stay open after its terminal event before the
/// remaining events are abandoned
pub const TRAILING_DRAIN: Duration = Duration::from_secs(5);

/// Accumulates the outcome while a stream is drained
#[derive(Debug, Default)]
struct Drain {
    recorded: Option<ReconciledOutcome>,
    seen: usize,
}

impl Drain {
    /// Fold one item; returns false once draining must stop
    fn feed(&mut self, item: Result<TaskEvent>) -> bool {
        self.seen += 1;
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, events = self.seen, "participant stream failed");
                return false;
            }
        };

        if self.recorded.is_some() {
            debug!(events = self.seen, "discarding event after terminal outcome");
            return true;
        }

        if let Some(outcome) = terminal_outcome(&event) {
            debug!(
                succeeded = outcome.succeeded,
                chars = outcome.text.len(),
                "terminal event recorded"
            );
            self.recorded = Some(outcome);
        }
        true
    }

    fn finish(self) -> ReconciledOutcome {
        self.recorded.unwrap_or_else(|| {
            debug!(events = self.seen, "stream closed without terminal event");
            ReconciledOutcome::no_terminal()
        })
    }
}

/// Drain an event stream and report the first terminal signal.
///
/// Later events, terminal or not, are consumed and discarded. A transport
/// error stops draining but never replaces an already recorded outcome.
pub async fn reconcile<S>(events: S) -> ReconciledOutcome
where
    S: Stream<Item = Result<TaskEvent>>,
{
    let mut events = std::pin::pin!(events);
    let mut drain = Drain::default();

    while let Some(item) = events.next().await {
        if !drain.feed(item) {
            break;
        }
    }
    drain.finish()
}

/// Like [`reconcile`], but stops waiting at `deadline`.
///
/// Once a terminal event is recorded the stream gets at most
/// [`TRAILING_DRAIN`] more to close. A stream still open at the deadline
/// yields the recorded outcome if there is one.
///
/// # Errors
///
/// Returns [`JudgeError::Timeout`] when the deadline passes before any
/// terminal event arrived.
pub async fn reconcile_until<S>(events: S, deadline: Instant) -> Result<ReconciledOutcome>
where
    S: Stream<Item = Result<TaskEvent>>,
{
    let started = Instant::now();
    let mut events = std::pin::pin!(events);
    let mut drain = Drain::default();
    let mut until = deadline;

    loop {
        match tokio::time::timeout_at(until, events.next()).await {
            Ok(Some(item)) => {
                let had_terminal = drain.recorded.is_some();
                if !drain.feed(item) {
                    break;
                }
                if !had_terminal && drain.recorded.is_some() {
                    until = deadline.min(Instant::now() + TRAILING_DRAIN);
                }
            }
            Ok(None) => break,
            Err(_) => {
                return match drain.recorded {
                    Some(outcome) => {
                        debug!(events = drain.seen, "stream left open after terminal event");
                        Ok(outcome)
                    }
                    None => Err(JudgeError::Timeout(deadline.saturating_duration_since(started))),
                };
            }
        }
    }
    Ok(drain.finish())
}
