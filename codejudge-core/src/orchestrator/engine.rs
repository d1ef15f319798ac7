use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::progress::{ProgressSink, TaskLifecycle};
use super::request::{EvalRequest, EvaluationCase, ValidatedRequest};
use crate::aggregate::{AggregateResult, aggregate};
use crate::config::CodeJudgeConfig;
use crate::error::{JudgeError, Result};
use crate::extract::ResponseExtractor;
use crate::participant::{A2aClient, ConversationContext, ParticipantClient};
use crate::protocol::{ReconciledOutcome, reconcile_until};
use crate::scoring::{BatchMode, CaseEvaluation, JudgingPrompt, ScoringCascade};

/// Name of the artifact carrying the aggregate result
pub const RESULT_ARTIFACT: &str = "Evaluation Result";

/// Drives one evaluation request end to end.
///
/// A single orchestrator may serve concurrent requests; every run owns its
/// conversation context and accumulated evaluations.
pub struct Orchestrator {
    participant: Arc<dyn ParticipantClient>,
    cascade: ScoringCascade,
    extractor: ResponseExtractor,
    participant_timeout: Duration,
}

impl Orchestrator {
    pub fn new(participant: Arc<dyn ParticipantClient>, cascade: ScoringCascade) -> Self {
        Self {
            participant,
            cascade,
            extractor: ResponseExtractor::new(),
            participant_timeout: Duration::from_secs(300),
        }
    }

    /// Build an A2A-backed orchestrator from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a scoring backend cannot be created.
    pub fn from_config(config: &CodeJudgeConfig) -> Result<Self> {
        let participant = Arc::new(A2aClient::new(&config.participant));
        let cascade = ScoringCascade::from_config(&config.scoring)?;
        Ok(Self::new(participant, cascade).with_participant_timeout(config.participant.timeout))
    }

    /// Upper bound on one participant call, including draining its events
    pub fn with_participant_timeout(mut self, timeout: Duration) -> Self {
        self.participant_timeout = timeout;
        self
    }

    /// Validate and evaluate a request.
    ///
    /// Per-case failures are absorbed into degraded data. Only validation and
    /// aggregation failures are returned, after a `failed` update was sent.
    pub async fn run(
        &self,
        request: &EvalRequest,
        sink: &dyn ProgressSink,
    ) -> Result<AggregateResult> {
        let validated = match request.validate() {
            Ok(validated) => validated,
            Err(e) => return Err(fail(sink, e).await),
        };
        self.run_validated(&validated, sink).await
    }

    /// Evaluate an already validated request
    pub async fn run_validated(
        &self,
        request: &ValidatedRequest,
        sink: &dyn ProgressSink,
    ) -> Result<AggregateResult> {
        let mode = BatchMode::for_case_count(request.cases.len());
        info!(
            role = %request.role,
            cases = request.cases.len(),
            source = %request.source_language,
            target = %request.target_language,
            "starting evaluation"
        );

        let mut context = ConversationContext::new();
        let mut evaluations = Vec::with_capacity(request.cases.len());
        for case in &request.cases {
            sink.update(TaskLifecycle::Working, &format!("Processing case {}", case.label()))
                .await;
            evaluations.push(self.evaluate_case(request, case, &mut context, mode).await);
            sink.update(TaskLifecycle::Working, &format!("Case {} complete", case.label()))
                .await;
        }

        let result = match aggregate(&evaluations) {
            Ok(result) => result,
            Err(e) => return Err(fail(sink, e).await),
        };

        info!(winner = %result.winner, cases = evaluations.len(), "evaluation complete");
        sink.artifact(RESULT_ARTIFACT, &result).await;
        sink.update(
            TaskLifecycle::Completed,
            &format!(
                "Evaluation complete: {} case(s), winner {}",
                evaluations.len(),
                result.winner
            ),
        )
        .await;

        Ok(result)
    }

    async fn evaluate_case(
        &self,
        request: &ValidatedRequest,
        case: &EvaluationCase,
        context: &mut ConversationContext,
        mode: BatchMode,
    ) -> CaseEvaluation {
        let label = case.label();
        let reply = match self
            .call_participant(&request.endpoint, &case.payload(), context.current())
            .await
        {
            Ok(outcome) => {
                context.observe(&outcome);
                if outcome.has_payload() {
                    outcome.text
                } else {
                    warn!(
                        case = %label,
                        succeeded = outcome.succeeded,
                        "participant returned no usable translation"
                    );
                    String::new()
                }
            }
            Err(e) => {
                warn!(case = %label, error = %e, "participant call failed");
                String::new()
            }
        };

        let translated_code = self.extractor.extract(&reply);
        debug!(case = %label, chars = translated_code.len(), "translation extracted");

        let prompt = JudgingPrompt {
            original_code: &case.original_code,
            translated_code: &translated_code,
            source_language: &case.source_language,
            target_language: &case.target_language,
            participant_role: &request.role,
        };
        let evaluation = self.cascade.score(&prompt, mode).await;
        info!(case = %label, winner = %evaluation.winner, "case scored");
        evaluation
    }

    async fn call_participant(
        &self,
        endpoint: &str,
        payload: &str,
        context_id: Option<String>,
    ) -> Result<ReconciledOutcome> {
        let deadline = Instant::now() + self.participant_timeout;
        let timed_out = || {
            JudgeError::Communication(format!(
                "participant did not finish within {:?}",
                self.participant_timeout
            ))
        };

        let events = tokio::time::timeout_at(
            deadline,
            self.participant.send(endpoint, payload, context_id),
        )
        .await
        .map_err(|_| timed_out())??;

        reconcile_until(events, deadline).await.map_err(|e| match e {
            JudgeError::Timeout(_) => timed_out(),
            other => other,
        })
    }
}

/// Report a fatal failure and hand the error back
async fn fail(sink: &dyn ProgressSink, err: JudgeError) -> JudgeError {
    error!(error = %err, fatal = err.is_fatal(), "evaluation failed");
    sink.update(TaskLifecycle::Failed, &err.to_string()).await;
    err
}
