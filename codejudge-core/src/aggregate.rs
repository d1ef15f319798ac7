//! Combines per-case evaluations into one verdict

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{JudgeError, Result};
use crate::scoring::{CaseEvaluation, NO_WINNER};

/// Final result of an evaluation request, serialized flat as the terminal artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub reasoning: String,
    pub winner: String,
    pub execution_correctness: f64,
    pub style_score: f64,
    pub conciseness: f64,
    pub relevance: f64,
}

/// Round half away from zero to two decimals
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(evaluations: &[CaseEvaluation], field: impl Fn(&CaseEvaluation) -> f64) -> f64 {
    let sum: f64 = evaluations.iter().map(field).sum();
    round2(sum / evaluations.len() as f64)
}

/// Most frequent credited winner; ties go to the one seen first
fn plurality_winner(evaluations: &[CaseEvaluation]) -> String {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, evaluation) in evaluations.iter().enumerate() {
        if evaluation.has_winner() {
            counts.entry(evaluation.winner.as_str()).or_insert((0, position)).0 += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(winner, _)| winner.to_string())
        .unwrap_or_else(|| NO_WINNER.to_string())
}

/// Aggregate an ordered, non-empty sequence of evaluations.
///
/// # Errors
///
/// Returns [`JudgeError::AggregationEmpty`] when `evaluations` is empty.
pub fn aggregate(evaluations: &[CaseEvaluation]) -> Result<AggregateResult> {
    if evaluations.is_empty() {
        return Err(JudgeError::AggregationEmpty);
    }

    let total = evaluations.len();
    let reasoning = evaluations
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{}/{}] Winner: {}. {}", i + 1, total, e.winner, e.reasoning))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(AggregateResult {
        reasoning,
        winner: plurality_winner(evaluations),
        execution_correctness: mean(evaluations, |e| e.execution_correctness),
        style_score: mean(evaluations, |e| e.style_score),
        conciseness: mean(evaluations, |e| e.conciseness),
        relevance: mean(evaluations, |e| e.relevance),
    })
}
