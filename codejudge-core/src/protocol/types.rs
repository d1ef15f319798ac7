//! A2A wire objects exchanged with the participant

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One content part of a message or artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Data { data: Value },
    File { file: Value },
}

impl Part {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Textual rendering of the part, if it carries any text
    pub fn as_text(&self) -> Option<String> {
        match self {
            Part::Text { text } => Some(text.clone()),
            Part::Data { data } => Some(data.to_string()),
            Part::File { .. } => None,
        }
    }
}

/// Join the textual content of parts with newlines.
///
/// Data parts are rendered as compact JSON; file parts contribute nothing.
pub fn merge_parts(parts: &[Part]) -> String {
    parts
        .iter()
        .filter_map(Part::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn message_kind() -> String {
    "message".to_string()
}

/// A single conversational message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default = "message_kind")]
    pub kind: String,
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Message {
    /// Create an outbound user message with one text part and a fresh id
    pub fn user_text(text: impl Into<String>, context_id: Option<String>) -> Self {
        Self {
            kind: message_kind(),
            role: Role::User,
            parts: vec![Part::text(text)],
            message_id: uuid::Uuid::new_v4().simple().to_string(),
            context_id,
            task_id: None,
        }
    }

    /// Create an agent message with one text part (mostly useful in tests)
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            ..Self::user_text(text, None)
        }
    }

    /// Newline-joined text of all parts
    pub fn text(&self) -> String {
        merge_parts(&self.parts)
    }
}

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    AuthRequired,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    /// Only completed and failed end the relevance of a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Current status of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: None,
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }
}

/// Output produced by a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A unit of work tracked by the participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Task {
    pub fn new(id: impl Into<String>, context_id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            context_id: context_id.into(),
            status,
            artifacts: Vec::new(),
        }
    }

    /// Newline-joined text of all artifact parts
    pub fn artifact_text(&self) -> String {
        self.artifacts
            .iter()
            .map(|a| merge_parts(&a.parts))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Status change notification for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    #[serde(default)]
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

impl TaskStatusUpdateEvent {
    pub fn new(task: &Task, status: TaskStatus) -> Self {
        Self {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            is_final: status.state.is_terminal(),
            status,
        }
    }
}

/// Artifact change notification for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    pub task_id: String,
    #[serde(default)]
    pub context_id: String,
    pub artifact: Artifact,
    #[serde(default)]
    pub append: bool,
}

/// Any object the participant may send as a call result
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind")]
pub enum StreamResponse {
    #[serde(rename = "message")]
    Message(Message),
    #[serde(rename = "task")]
    Task(Task),
    #[serde(rename = "status-update")]
    StatusUpdate(TaskStatusUpdateEvent),
    #[serde(rename = "artifact-update")]
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

/// Event shapes produced by the participant's task protocol
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// A bare message with no wrapping task
    Message(Message),
    /// Task snapshot plus the status update that produced it
    TaskWithStatus(Task, TaskStatusUpdateEvent),
    /// Task snapshot whose own status is authoritative
    TaskAlone(Task),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_parts_renders_data() {
        let parts = vec![
            Part::text("first"),
            Part::Data {
                data: json!({"k": 1}),
            },
            Part::File {
                file: json!({"uri": "file:///x"}),
            },
            Part::text("last"),
        ];
        assert_eq!(merge_parts(&parts), "first\n{\"k\":1}\nlast");
    }

    #[test]
    fn test_outbound_message_shape() {
        let msg = Message::user_text("hello", Some("ctx-1".to_string()));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["kind"], "message");
        assert_eq!(value["role"], "user");
        assert_eq!(value["parts"][0]["kind"], "text");
        assert_eq!(value["contextId"], "ctx-1");
        assert_eq!(msg.message_id.len(), 32);
    }

    #[test]
    fn test_task_state_terminal() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert!(!TaskState::Canceled.is_terminal());
    }

    #[test]
    fn test_decode_stream_responses() {
        let update: StreamResponse = serde_json::from_value(json!({
            "kind": "status-update",
            "taskId": "t1",
            "contextId": "c1",
            "status": {
                "state": "input-required"
            },
            "final": false
        }))
        .unwrap();
        match update {
            StreamResponse::StatusUpdate(ev) => {
                assert_eq!(ev.status.state, TaskState::InputRequired);
                assert!(!ev.is_final);
            }
            other => panic!("unexpected {:?}", other),
        }

        let task: StreamResponse = serde_json::from_value(json!({
            "kind": "task",
            "id": "t1",
            "contextId": "c1",
            "status": {"state": "something-new"},
            "artifacts": [{"artifactId": "a", "parts": [{"kind": "text", "text": "out"}]}]
        }))
        .unwrap();
        match task {
            StreamResponse::Task(task) => {
                assert_eq!(task.status.state, TaskState::Unknown);
                assert_eq!(task.artifact_text(), "out");
            }
            other => panic!("unexpected {:?}", other),
        }

        let message: StreamResponse = serde_json::from_value(json!({
            "kind": "message",
            "role": "agent",
            "messageId": "m1",
            "parts": [{"kind": "text", "text": "done"}]
        }))
        .unwrap();
        assert!(matches!(message, StreamResponse::Message(m) if m.text() == "done"));
    }
}
