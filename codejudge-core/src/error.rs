//! Error types for codejudge operations

/// Result type for codejudge operations
pub type Result<T> = std::result::Result<T, JudgeError>;

/// Error types for the evaluation engine
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// Malformed evaluation request
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Participant unreachable or returned an unusable payload
    #[error("Communication error: {0}")]
    Communication(String),

    /// Scoring backend call failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Scoring backend reported rate or quota exhaustion
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Output could not be parsed into the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// No case produced an evaluation
    #[error("Aggregation failed: no evaluations occurred")]
    AggregationEmpty,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// External call exceeded its time budget
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl JudgeError {
    /// Whether this error is fatal for a whole evaluation request.
    ///
    /// Per-case failures are recovered into degraded data; only these are not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JudgeError::Validation(_) | JudgeError::AggregationEmpty
        )
    }
}

impl From<String> for JudgeError {
    fn from(s: String) -> Self {
        JudgeError::Other(s)
    }
}

impl From<&str> for JudgeError {
    fn from(s: &str) -> Self {
        JudgeError::Other(s.to_string())
    }
}
