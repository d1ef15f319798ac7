//! End-to-end tests for the orchestrator with scripted participants and backends

use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use codejudge_core::error::{JudgeError, Result};
use codejudge_core::extract::NO_CODE_SENTINEL;
use codejudge_core::llm::{LLMProvider, LLMRequest, LLMResponse};
use codejudge_core::orchestrator::{
    EvalRequest, Orchestrator, ProgressEvent, ProgressReceiver, RESULT_ARTIFACT, TaskLifecycle,
    ValidatedRequest, progress_channel,
};
use codejudge_core::participant::{ParticipantClient, TaskEventStream};
use codejudge_core::protocol::{
    Message, Task, TaskEvent, TaskState, TaskStatus, TaskStatusUpdateEvent,
};
use codejudge_core::scoring::{BackoffPolicy, RecordingSleeper, ScoringBackend, ScoringCascade};
use serde_json::json;

enum Reply {
    Events(Vec<TaskEvent>),
    /// Events followed by a stream that never closes
    EventsThenHang(Vec<TaskEvent>),
    Fail(&'static str),
    Hang,
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    endpoint: String,
    payload: String,
    context_id: Option<String>,
}

#[derive(Default)]
struct ScriptedParticipant {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedParticipant {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ParticipantClient for ScriptedParticipant {
    async fn send(
        &self,
        endpoint: &str,
        payload: &str,
        context_id: Option<String>,
    ) -> Result<TaskEventStream> {
        self.calls.lock().unwrap().push(Call {
            endpoint: endpoint.to_string(),
            payload: payload.to_string(),
            context_id,
        });

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Events(events)) => {
                let events: Vec<Result<TaskEvent>> = events.into_iter().map(Ok).collect();
                Ok(Box::pin(stream::iter(events)))
            }
            Some(Reply::EventsThenHang(events)) => {
                let events: Vec<Result<TaskEvent>> = events.into_iter().map(Ok).collect();
                Ok(Box::pin(stream::iter(events).chain(stream::pending())))
            }
            Some(Reply::Fail(reason)) => Err(JudgeError::Communication(reason.to_string())),
            Some(Reply::Hang) => Ok(Box::pin(stream::pending::<Result<TaskEvent>>())),
            None => Ok(Box::pin(stream::empty::<Result<TaskEvent>>())),
        }
    }
}

/// Backend that answers every request the same way and keeps the prompts it saw
struct RecordingBackend {
    reply: std::result::Result<String, &'static str>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingBackend {
    fn answering(reply: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn out_of_quota() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("429 RESOURCE_EXHAUSTED"),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for RecordingBackend {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        let user = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(user);

        match &self.reply {
            Ok(content) => Ok(LLMResponse {
                content: content.clone(),
                usage: None,
            }),
            Err(reason) => Err(JudgeError::Provider(reason.to_string())),
        }
    }
}

fn verdict(winner: &str, score: f64) -> serde_json::Value {
    json!({
        "reasoning": format!("scored {}", score),
        "winner": winner,
        "execution_correctness": score,
        "style_score": score,
        "conciseness": score,
        "relevance": score
    })
}

fn completed(context_id: &str, text: &str) -> Vec<TaskEvent> {
    let task = Task::new("task-1", context_id, TaskStatus::new(TaskState::Working));
    let working = TaskStatusUpdateEvent::new(&task, TaskStatus::new(TaskState::Working));
    let done = TaskStatusUpdateEvent::new(
        &task,
        TaskStatus::new(TaskState::Completed).with_message(Message::agent_text(text)),
    );
    vec![
        TaskEvent::TaskWithStatus(task.clone(), working),
        TaskEvent::TaskWithStatus(task, done),
    ]
}

fn request(participants: serde_json::Value, config: serde_json::Value) -> EvalRequest {
    serde_json::from_value(json!({"participants": participants, "config": config})).unwrap()
}

fn single_request() -> EvalRequest {
    request(
        json!({"translator": "http://translator:9010"}),
        json!({
            "source_language": "python",
            "target_language": "rust",
            "code_to_translate": "print('hi')"
        }),
    )
}

fn batch_request(cases: &[&str]) -> EvalRequest {
    request(
        json!({"translator": "http://translator:9010"}),
        json!({
            "source_language": "python",
            "target_language": "rust",
            "test_cases": cases
        }),
    )
}

fn orchestrator(
    participant: Arc<ScriptedParticipant>,
    backends: Vec<ScoringBackend>,
    sleeper: &Arc<RecordingSleeper>,
) -> Orchestrator {
    let cascade =
        ScoringCascade::new(backends, BackoffPolicy::default()).with_sleeper(sleeper.clone());
    Orchestrator::new(participant, cascade)
}

async fn drain(mut rx: ProgressReceiver) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn messages(events: &[ProgressEvent]) -> Vec<String> {
    events.iter().map(ProgressEvent::describe).collect()
}

#[tokio::test]
async fn test_two_participants_rejected_without_network() {
    let participant = ScriptedParticipant::new(Vec::new());
    let backend = RecordingBackend::answering(verdict("a", 9.0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(
        participant.clone(),
        vec![ScoringBackend::new("judge", true, backend.clone())],
        &sleeper,
    );

    let req = request(
        json!({"a": "http://a", "b": "http://b"}),
        json!({"source_language": "c", "target_language": "go", "code_to_translate": "x"}),
    );
    let (sink, rx) = progress_channel(16);
    let err = orch.run(&req, &sink).await.unwrap_err();
    drop(sink);

    assert!(matches!(err, JudgeError::Validation(_)));
    assert!(participant.calls().is_empty());
    assert!(backend.prompts().is_empty());

    let events = drain(rx).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].state(), Some(TaskLifecycle::Failed));
    assert!(events[0].describe().contains("Validation failed"));
}

#[tokio::test]
async fn test_single_case_happy_path() {
    let participant = ScriptedParticipant::new(vec![Reply::Events(completed(
        "ctx-1",
        "Here it is:\n```rust\nfn main() { println!(\"hi\"); }\n```",
    ))]);
    let backend = RecordingBackend::answering(verdict("translator", 8.0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(
        participant.clone(),
        vec![ScoringBackend::new("judge", true, backend.clone())],
        &sleeper,
    );

    let (sink, rx) = progress_channel(16);
    let result = orch.run(&single_request(), &sink).await.unwrap();
    drop(sink);

    assert_eq!(result.winner, "translator");
    assert_eq!(result.execution_correctness, 8.0);
    assert_eq!(result.reasoning, "[1/1] Winner: translator. scored 8");

    let calls = participant.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].endpoint, "http://translator:9010");
    assert_eq!(calls[0].context_id, None);
    let payload: serde_json::Value = serde_json::from_str(&calls[0].payload).unwrap();
    assert_eq!(payload["code_to_translate"], "print('hi')");

    let prompts = backend.prompts();
    assert!(prompts[0].contains("fn main() { println!(\"hi\"); }"));
    assert!(!prompts[0].contains("Here it is"));

    let events = drain(rx).await;
    assert_eq!(
        messages(&events),
        vec![
            "[working] Processing case 1/1".to_string(),
            "[working] Case 1/1 complete".to_string(),
            format!("[artifact] {}: winner translator", RESULT_ARTIFACT),
            "[completed] Evaluation complete: 1 case(s), winner translator".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_context_continues_across_cases() {
    let participant = ScriptedParticipant::new(vec![
        Reply::Events(completed("ctx-A", "let a = 1;")),
        Reply::Events(vec![TaskEvent::Message(Message::agent_text("let b = 2;"))]),
        Reply::Events(completed("ctx-B", "let c = 3;")),
    ]);
    let backend = RecordingBackend::answering(verdict("translator", 6.0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(
        participant.clone(),
        vec![ScoringBackend::new("judge", false, backend)],
        &sleeper,
    );

    let (sink, _rx) = progress_channel(64);
    orch.run(&batch_request(&["a = 1", "b = 2", "c = 3"]), &sink).await.unwrap();

    let contexts: Vec<_> = participant.calls().into_iter().map(|c| c.context_id).collect();
    assert_eq!(
        contexts,
        vec![None, Some("ctx-A".to_string()), Some("ctx-A".to_string())]
    );
}

#[tokio::test]
async fn test_context_follows_latest_report() {
    let participant = ScriptedParticipant::new(vec![
        Reply::Events(completed("ctx-A", "let a = 1;")),
        Reply::Events(completed("ctx-B", "let b = 2;")),
        Reply::Events(completed("ctx-B", "let c = 3;")),
    ]);
    let backend = RecordingBackend::answering(verdict("translator", 6.0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(
        participant.clone(),
        vec![ScoringBackend::new("judge", true, backend)],
        &sleeper,
    );

    let (sink, _rx) = progress_channel(64);
    orch.run(&batch_request(&["a = 1", "b = 2", "c = 3"]), &sink)
        .await
        .unwrap();

    let contexts: Vec<_> = participant
        .calls()
        .into_iter()
        .map(|c| c.context_id)
        .collect();
    assert_eq!(
        contexts,
        vec![None, Some("ctx-A".to_string()), Some("ctx-B".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_terminal_event_on_open_stream_is_kept() {
    let participant = ScriptedParticipant::new(vec![
        Reply::EventsThenHang(vec![TaskEvent::Message(Message::agent_text("let x = 1;"))]),
        Reply::EventsThenHang(completed("ctx", "let y = 2;")),
    ]);
    let backend = RecordingBackend::answering(verdict("translator", 7.0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(
        participant.clone(),
        vec![ScoringBackend::new("judge", true, backend.clone())],
        &sleeper,
    )
    .with_participant_timeout(Duration::from_secs(300));

    let started = tokio::time::Instant::now();
    let (sink, _rx) = progress_channel(64);
    orch.run(&batch_request(&["x = 1", "y = 2"]), &sink)
        .await
        .unwrap();

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("let x = 1;"));
    assert!(prompts[1].contains("let y = 2;"));
    assert!(prompts.iter().all(|p| !p.contains(NO_CODE_SENTINEL)));
    // each open stream is abandoned shortly after its terminal event
    assert!(started.elapsed() < Duration::from_secs(300));
}

#[tokio::test]
async fn test_participant_failure_scores_sentinel() {
    let participant = ScriptedParticipant::new(vec![Reply::Fail("connection refused")]);
    let backend = RecordingBackend::answering(verdict("N/A", 0.0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(
        participant,
        vec![ScoringBackend::new("judge", true, backend.clone())],
        &sleeper,
    );

    let (sink, _rx) = progress_channel(16);
    let result = orch.run(&single_request(), &sink).await.unwrap();

    assert_eq!(result.winner, "N/A");
    assert!(backend.prompts()[0].contains(NO_CODE_SENTINEL));
}

#[tokio::test]
async fn test_failed_task_scores_sentinel() {
    let task = Task::new("t", "ctx", TaskStatus::new(TaskState::Working));
    let failed = TaskStatusUpdateEvent::new(
        &task,
        TaskStatus::new(TaskState::Failed).with_message(Message::agent_text("model crashed")),
    );
    let participant = ScriptedParticipant::new(vec![Reply::Events(vec![TaskEvent::TaskWithStatus(
        task, failed,
    )])]);
    let backend = RecordingBackend::answering(verdict("N/A", 1.0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(
        participant,
        vec![ScoringBackend::new("judge", true, backend.clone())],
        &sleeper,
    );

    let (sink, _rx) = progress_channel(16);
    orch.run(&single_request(), &sink).await.unwrap();

    let prompt = &backend.prompts()[0];
    assert!(prompt.contains(NO_CODE_SENTINEL));
    assert!(!prompt.contains("model crashed"));
}

#[tokio::test]
async fn test_total_failure_still_completes() {
    let participant = ScriptedParticipant::new(vec![
        Reply::Fail("down"),
        Reply::Fail("down"),
    ]);
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(
        participant,
        vec![
            ScoringBackend::new("primary", true, RecordingBackend::out_of_quota()),
            ScoringBackend::new("fallback", false, RecordingBackend::out_of_quota()),
        ],
        &sleeper,
    );

    let (sink, rx) = progress_channel(64);
    let result = orch.run(&batch_request(&["x", "y"]), &sink).await.unwrap();
    drop(sink);

    assert_eq!(result.winner, "N/A");
    assert_eq!(result.execution_correctness, 0.0);
    assert_eq!(result.relevance, 0.0);
    assert_eq!(result.reasoning.lines().count(), 2);
    assert!(result
        .reasoning
        .lines()
        .all(|line| line.contains("Evaluation failed: fallback")));

    // one pause per case, multi-case interval, none after the last backend
    assert_eq!(
        sleeper.pauses(),
        vec![Duration::from_secs(5), Duration::from_secs(5)]
    );

    let events = drain(rx).await;
    assert_eq!(events.last().and_then(ProgressEvent::state), Some(TaskLifecycle::Completed));
}

#[tokio::test]
async fn test_empty_batch_is_fatal() {
    let participant = ScriptedParticipant::new(Vec::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(participant.clone(), Vec::new(), &sleeper);

    let validated = ValidatedRequest {
        role: "translator".to_string(),
        endpoint: "http://translator".to_string(),
        source_language: "python".to_string(),
        target_language: "rust".to_string(),
        cases: Vec::new(),
    };

    let (sink, rx) = progress_channel(16);
    let err = orch.run_validated(&validated, &sink).await.unwrap_err();
    drop(sink);

    assert!(matches!(err, JudgeError::AggregationEmpty));
    assert!(participant.calls().is_empty());
    let events = drain(rx).await;
    assert_eq!(
        messages(&events),
        vec!["[failed] Aggregation failed: no evaluations occurred".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_participant_timeout_is_recovered() {
    let participant = ScriptedParticipant::new(vec![
        Reply::Hang,
        Reply::Events(completed("ctx", "second")),
    ]);
    let backend = RecordingBackend::answering(verdict("translator", 7.0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = orchestrator(
        participant.clone(),
        vec![ScoringBackend::new("judge", true, backend.clone())],
        &sleeper,
    )
    .with_participant_timeout(Duration::from_secs(300));

    let (sink, _rx) = progress_channel(64);
    let result = orch.run(&batch_request(&["first", "second"]), &sink).await.unwrap();

    assert_eq!(participant.calls().len(), 2);
    let prompts = backend.prompts();
    assert!(prompts[0].contains(NO_CODE_SENTINEL));
    assert!(prompts[1].contains("second"));
    assert_eq!(result.winner, "translator");
}

#[tokio::test]
async fn test_concurrent_requests_do_not_share_context() {
    let participant = ScriptedParticipant::new(Vec::new());
    let backend = RecordingBackend::answering(verdict("translator", 5.0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let orch = Arc::new(orchestrator(
        participant.clone(),
        vec![ScoringBackend::new("judge", true, backend)],
        &sleeper,
    ));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let orch = orch.clone();
            tokio::spawn(async move {
                let (sink, _rx) = progress_channel(64);
                orch.run(&batch_request(&["a", "b"]), &sink).await
            })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.winner, "translator");
    }

    // empty streams report no context, so no call may carry one
    let calls = participant.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.context_id.is_none()));
}
