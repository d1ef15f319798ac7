//! One backend's verdict on one translation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Winner value when no participant can be credited
pub const NO_WINNER: &str = "N/A";

/// Score substituted for a dimension the backend left out
pub const DEFAULT_SCORE: f64 = 5.0;

const PLACEHOLDER_REASONING: &str = "No reasoning provided by the scoring backend.";

/// Scores and verdict for a single evaluation case.
///
/// Scores are conventionally in `[0, 10]` but are not clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseEvaluation {
    pub reasoning: String,
    pub winner: String,
    pub execution_correctness: f64,
    pub style_score: f64,
    pub conciseness: f64,
    pub relevance: f64,
}

impl CaseEvaluation {
    /// JSON schema requested from structured-output backends
    pub fn json_schema() -> Value {
        let score = |what: &str| {
            json!({
                "type": "number",
                "description": format!("Score for {} (0-10).", what)
            })
        };

        json!({
            "type": "object",
            "properties": {
                "reasoning": {
                    "type": "string",
                    "description": "The reasoning behind the evaluation."
                },
                "execution_correctness": score("execution correctness"),
                "style_score": score("style and documentation"),
                "conciseness": score("conciseness"),
                "relevance": score("relevance"),
                "winner": {
                    "type": "string",
                    "description": "The role of the winning participant, or 'N/A'."
                }
            },
            "required": [
                "reasoning",
                "execution_correctness",
                "style_score",
                "conciseness",
                "relevance",
                "winner"
            ],
            "additionalProperties": false
        })
    }

    /// Build from a loosely shaped object recovered from free text.
    ///
    /// Missing or unparseable scores become [`DEFAULT_SCORE`]; numeric strings
    /// are accepted. Missing reasoning gets a placeholder, a missing winner
    /// becomes [`NO_WINNER`].
    pub fn from_lenient(object: &Map<String, Value>) -> Self {
        let score = |key: &str| object.get(key).and_then(lenient_number).unwrap_or(DEFAULT_SCORE);
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            reasoning: text("reasoning").unwrap_or_else(|| PLACEHOLDER_REASONING.to_string()),
            winner: text("winner").unwrap_or_else(|| NO_WINNER.to_string()),
            execution_correctness: score("execution_correctness"),
            style_score: score("style_score"),
            conciseness: score("conciseness"),
            relevance: score("relevance"),
        }
    }

    /// Placeholder used when every backend failed
    pub fn degraded(last_error: &str) -> Self {
        Self {
            reasoning: format!("Evaluation failed: {}", last_error),
            winner: NO_WINNER.to_string(),
            execution_correctness: 0.0,
            style_score: 0.0,
            conciseness: 0.0,
            relevance: 0.0,
        }
    }

    /// Whether a participant was credited
    pub fn has_winner(&self) -> bool {
        self.winner != NO_WINNER
    }
}

fn lenient_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
