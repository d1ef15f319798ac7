//! A2A JSON-RPC participant client

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::AsyncBufReadExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

use super::{ParticipantClient, TaskEventStream};
use crate::config::ParticipantConfig;
use crate::error::{JudgeError, Result};
use crate::protocol::{
    Artifact, Message, StreamResponse, Task, TaskEvent, TaskState, TaskStatus,
};

/// Talks to a participant agent over A2A JSON-RPC
#[derive(Debug, Clone)]
pub struct A2aClient {
    client: reqwest::Client,
    streaming: bool,
    card_path: String,
}

#[derive(Deserialize)]
struct AgentCard {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl A2aClient {
    pub fn new(config: &ParticipantConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Share an existing HTTP client (connection pool) across participants
    pub fn with_client(client: reqwest::Client, config: &ParticipantConfig) -> Self {
        Self {
            client,
            streaming: config.streaming,
            card_path: config.card_path.clone(),
        }
    }

    async fn fetch_card(&self, card_url: &str) -> reqwest::Result<AgentCard> {
        self.client
            .get(card_url)
            .send()
            .await?
            .error_for_status()?
            .json::<AgentCard>()
            .await
    }

    /// URL to post messages to: the card's `url`, or the endpoint itself
    async fn resolve_url(&self, endpoint: &str) -> String {
        let card_url = format!("{}{}", endpoint.trim_end_matches('/'), self.card_path);

        match self.fetch_card(&card_url).await {
            Ok(AgentCard { url: Some(url) }) if !url.trim().is_empty() => url,
            Ok(_) => {
                debug!(card = %card_url, "agent card has no url, using endpoint");
                endpoint.to_string()
            }
            Err(e) => {
                warn!(card = %card_url, error = %e, "agent card unavailable, using endpoint");
                endpoint.to_string()
            }
        }
    }

    fn method(&self) -> &'static str {
        if self.streaming {
            "message/stream"
        } else {
            "message/send"
        }
    }
}

fn rpc_request(method: &str, message: &Message) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": uuid::Uuid::new_v4().to_string(),
        "method": method,
        "params": { "message": message }
    })
}

/// Why a JSON-RPC frame carried no wire object
#[derive(Debug)]
enum FrameError {
    /// The participant answered with a JSON-RPC `error` member
    Rejected(JudgeError),
    /// The frame is not valid JSON-RPC or carries an unknown object kind
    Undecodable(String),
}

impl From<FrameError> for JudgeError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Rejected(e) => e,
            FrameError::Undecodable(reason) => JudgeError::Communication(reason),
        }
    }
}

/// Decode one JSON-RPC response frame into the object it carries
fn decode_rpc(payload: &str) -> std::result::Result<StreamResponse, FrameError> {
    let response: JsonRpcResponse = serde_json::from_str(payload)
        .map_err(|e| FrameError::Undecodable(format!("malformed JSON-RPC response: {}", e)))?;

    if let Some(error) = response.error {
        return Err(FrameError::Rejected(JudgeError::Communication(format!(
            "participant returned error {}: {}",
            error.code, error.message
        ))));
    }

    let result = response.result.ok_or_else(|| {
        FrameError::Undecodable("JSON-RPC response has neither result nor error".to_string())
    })?;

    serde_json::from_value(result)
        .map_err(|e| FrameError::Undecodable(format!("unrecognized participant result: {}", e)))
}

#[async_trait]
impl ParticipantClient for A2aClient {
    async fn send(
        &self,
        endpoint: &str,
        payload: &str,
        context_id: Option<String>,
    ) -> Result<TaskEventStream> {
        let url = self.resolve_url(endpoint).await;
        let message = Message::user_text(payload, context_id);
        let method = self.method();
        debug!(url = %url, method, message_id = %message.message_id, "sending to participant");

        let mut request = self.client.post(&url).json(&rpc_request(method, &message));
        if self.streaming {
            request = request.header(reqwest::header::ACCEPT, "text/event-stream");
        }

        let response = request.send().await.map_err(|e| {
            JudgeError::Communication(format!("failed to reach participant at {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(JudgeError::Communication(format!(
                "participant returned HTTP {}: {}",
                status, text
            )));
        }

        // Some agents answer a stream request with a single JSON body
        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        if is_sse {
            let bytes = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(std::io::Error::other));
            let reader = tokio_util::io::StreamReader::new(bytes);
            let lines = LinesStream::new(tokio::io::BufReader::new(reader).lines());
            return Ok(Box::pin(decode_sse_lines(Box::pin(lines))));
        }

        let text = response.text().await.map_err(|e| {
            JudgeError::Communication(format!("failed to read participant response: {}", e))
        })?;
        let mut tracker = TaskTracker::new();
        let events: Vec<Result<TaskEvent>> = decode_rpc(&text)
            .map(|r| tracker.apply(r))
            .map_err(JudgeError::from)
            .transpose()
            .into_iter()
            .collect();
        Ok(Box::pin(stream::iter(events)))
    }
}

/// Incremental server-sent-events decoder.
///
/// Only `data:` fields matter here; `event:`, `id:`, `retry:` and comments are
/// skipped. Multi-line data is joined with `\n`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line without its terminator; a blank line completes an event
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            return self.flush();
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        None
    }

    /// Emit any buffered event data (used at end of stream)
    pub fn flush(&mut self) -> Option<String> {
        if self.data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data).join("\n"))
        }
    }
}

/// Maintains the latest task snapshot so status updates can be paired with it
#[derive(Debug, Default)]
pub struct TaskTracker {
    snapshot: Option<Task>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one wire object into the snapshot and return the event it produces.
    ///
    /// Artifact updates only change the snapshot and produce no event.
    pub fn apply(&mut self, response: StreamResponse) -> Option<TaskEvent> {
        match response {
            StreamResponse::Message(message) => Some(TaskEvent::Message(message)),
            StreamResponse::Task(task) => {
                self.snapshot = Some(task.clone());
                Some(TaskEvent::TaskAlone(task))
            }
            StreamResponse::StatusUpdate(update) => {
                let task = self.snapshot_for(&update.task_id, &update.context_id);
                task.status = update.status.clone();
                Some(TaskEvent::TaskWithStatus(task.clone(), update))
            }
            StreamResponse::ArtifactUpdate(update) => {
                let task = self.snapshot_for(&update.task_id, &update.context_id);
                merge_artifact(&mut task.artifacts, update.artifact, update.append);
                None
            }
        }
    }

    fn snapshot_for(&mut self, task_id: &str, context_id: &str) -> &mut Task {
        let fresh = || Task::new(task_id, context_id, TaskStatus::new(TaskState::Submitted));
        if self.snapshot.as_ref().is_none_or(|t| t.id != task_id) {
            self.snapshot = Some(fresh());
        }
        self.snapshot.get_or_insert_with(fresh)
    }
}

fn merge_artifact(artifacts: &mut Vec<Artifact>, artifact: Artifact, append: bool) {
    match artifacts
        .iter_mut()
        .find(|a| a.artifact_id == artifact.artifact_id)
    {
        Some(existing) if append => existing.parts.extend(artifact.parts),
        Some(existing) => *existing = artifact,
        None => artifacts.push(artifact),
    }
}

struct SseState<S> {
    lines: S,
    decoder: SseDecoder,
    tracker: TaskTracker,
    done: bool,
}

/// Turn SSE text lines carrying JSON-RPC frames into task events
fn decode_sse_lines<S>(lines: S) -> impl Stream<Item = Result<TaskEvent>> + Send
where
    S: Stream<Item = std::io::Result<String>> + Send + Unpin,
{
    let state = SseState {
        lines,
        decoder: SseDecoder::new(),
        tracker: TaskTracker::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }

            let data = match state.lines.next().await {
                Some(Ok(line)) => match state.decoder.push_line(&line) {
                    Some(data) => data,
                    None => continue,
                },
                Some(Err(e)) => {
                    state.done = true;
                    let err =
                        JudgeError::Communication(format!("participant stream read error: {}", e));
                    return Some((Err(err), state));
                }
                None => {
                    state.done = true;
                    match state.decoder.flush() {
                        Some(data) => data,
                        None => return None,
                    }
                }
            };

            match decode_rpc(&data) {
                Ok(response) => {
                    if let Some(event) = state.tracker.apply(response) {
                        return Some((Ok(event), state));
                    }
                }
                Err(FrameError::Rejected(e)) => return Some((Err(e), state)),
                Err(FrameError::Undecodable(reason)) => {
                    warn!(reason = %reason, "skipping undecodable participant frame");
                }
            }
        }
    })
}
