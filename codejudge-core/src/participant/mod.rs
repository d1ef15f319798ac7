//! Participant communication
//!
//! [`ParticipantClient`] is the seam between the orchestrator and the agent
//! being evaluated. [`A2aClient`] speaks the A2A JSON-RPC protocol over HTTP;
//! tests substitute scripted clients.

mod a2a;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::Result;
use crate::protocol::{ReconciledOutcome, TaskEvent};

pub use a2a::{A2aClient, SseDecoder, TaskTracker};

/// Lazily produced task events from one participant call
pub type TaskEventStream = Pin<Box<dyn Stream<Item = Result<TaskEvent>> + Send>>;

/// Sends one message to a participant and exposes its replies as task events
#[async_trait]
pub trait ParticipantClient: Send + Sync {
    /// Send `payload` as a user text message.
    ///
    /// `context_id` continues an existing conversation; `None` starts a new one.
    async fn send(
        &self,
        endpoint: &str,
        payload: &str,
        context_id: Option<String>,
    ) -> Result<TaskEventStream>;
}

/// Conversation state for one evaluation request.
///
/// Created fresh per request so concurrent requests never share a context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationContext {
    context_id: Option<String>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context id to send with the next message
    pub fn current(&self) -> Option<String> {
        self.context_id.clone()
    }

    /// Adopt the context id the participant reported, replacing any earlier one
    pub fn observe(&mut self, outcome: &ReconciledOutcome) {
        if let Some(id) = outcome.context_id.as_ref().filter(|id| !id.is_empty()) {
            self.context_id = Some(id.clone());
        }
    }
}
