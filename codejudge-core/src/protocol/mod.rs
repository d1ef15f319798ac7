//! Participant task protocol
//!
//! The participant speaks the A2A task protocol. Depending on transport mode it
//! emits bare messages, task snapshots, or task snapshots paired with status
//! updates, possibly duplicated or out of order. [`reconcile`] reduces any such
//! stream to a single [`ReconciledOutcome`]: the first terminal signal wins.
//! [`reconcile_until`] does the same against a deadline.

mod reconcile;
mod types;

pub use reconcile::{
    ReconciledOutcome, TRAILING_DRAIN, reconcile, reconcile_until, terminal_outcome,
};
pub use types::{
    Artifact, Message, Part, Role, StreamResponse, Task, TaskArtifactUpdateEvent, TaskEvent,
    TaskState, TaskStatus, TaskStatusUpdateEvent, merge_parts,
};
