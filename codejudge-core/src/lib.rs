//! # codejudge - Resilient Judging of Code Translations
//!
//! codejudge evaluates how well a remote agent (the *participant*) translates
//! code between programming languages. For every sample it:
//! - sends the code to the participant over the A2A protocol
//! - reduces the participant's task event stream to one terminal outcome
//! - extracts a usable code string from the reply, whatever its shape
//! - asks a cascade of LLM scoring backends for a structured verdict
//! - aggregates per-case verdicts into one averaged, majority-voted result
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codejudge_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = CodeJudgeConfig::load()?;
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!
//!     let request: EvalRequest = serde_json::from_str(
//!         r#"{
//!             "participants": {"translator": "http://127.0.0.1:9010"},
//!             "config": {
//!                 "source_language": "python",
//!                 "target_language": "rust",
//!                 "code_to_translate": "print('hello')"
//!             }
//!         }"#,
//!     )?;
//!
//!     let result = orchestrator.run(&request, &TracingProgressSink).await?;
//!     println!("winner: {}", result.winner);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Model
//!
//! Only a malformed request or an empty batch fails a run. An unreachable
//! participant yields a sentinel translation, and exhausted scoring backends
//! yield a zero-scored evaluation, so every case contributes exactly one
//! evaluation.
//!
//! ## Feature Flags
//!
//! - `llm-openai`: OpenAI-compatible scoring backends (JSON-schema output)
//! - `llm-ollama`: Ollama scoring backends (schema-constrained `format`)
//! - `llm-anthropic`: Anthropic scoring backends (text only)

pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod orchestrator;
pub mod parsing;
pub mod participant;
pub mod protocol;
pub mod scoring;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::aggregate::{AggregateResult, aggregate};
    pub use crate::config::{
        BackendConfig, CodeJudgeConfig, LLMProvider as LLMProviderType, ParticipantConfig,
        ScoringConfig,
    };
    pub use crate::error::{JudgeError, Result};
    pub use crate::extract::{NO_CODE_SENTINEL, ResponseExtractor};
    pub use crate::llm::{LLMProvider, LLMProviderFactory, LLMRequest, LLMResponse};
    pub use crate::orchestrator::{
        EvalRequest, Orchestrator, ProgressEvent, ProgressSink, TaskLifecycle,
        TracingProgressSink, progress_channel,
    };
    pub use crate::participant::{A2aClient, ParticipantClient, TaskEventStream};
    pub use crate::protocol::{ReconciledOutcome, TaskEvent, reconcile};
    pub use crate::scoring::{
        BackoffPolicy, BatchMode, CaseEvaluation, ScoringBackend, ScoringCascade, Sleeper,
    };
}
