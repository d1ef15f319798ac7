//! Evaluation requests and their validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::error::{JudgeError, Result};

/// An incoming request to judge one participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRequest {
    /// Role name mapped to endpoint address; exactly one entry is accepted
    pub participants: BTreeMap<String, String>,
    /// `source_language`, `target_language` and either `code_to_translate` or `test_cases`
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// One code sample to translate, with its position in the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationCase {
    pub original_code: String,
    pub source_language: String,
    pub target_language: String,
    /// 1-based position
    pub index: usize,
    pub total: usize,
}

impl EvaluationCase {
    /// Progress label such as `2/5`
    pub fn label(&self) -> String {
        format!("{}/{}", self.index, self.total)
    }

    /// Text sent to the participant for this case
    pub fn payload(&self) -> String {
        json!({
            "code_to_translate": self.original_code,
            "source_language": self.source_language,
            "target_language": self.target_language,
        })
        .to_string()
    }
}

/// A request that passed validation, split into cases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub role: String,
    pub endpoint: String,
    pub source_language: String,
    pub target_language: String,
    pub cases: Vec<EvaluationCase>,
}

fn invalid(message: impl Into<String>) -> JudgeError {
    JudgeError::Validation(message.into())
}

fn required_string(config: &Map<String, Value>, key: &str) -> Result<String> {
    match config.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(invalid(format!("`{}` must not be empty", key))),
        Some(_) => Err(invalid(format!("`{}` must be a string", key))),
        None => Err(invalid(format!("missing `{}`", key))),
    }
}

fn code_samples(config: &Map<String, Value>) -> Result<Vec<String>> {
    match (config.get("code_to_translate"), config.get("test_cases")) {
        (Some(_), Some(_)) => Err(invalid(
            "provide either `code_to_translate` or `test_cases`, not both",
        )),
        (None, None) => Err(invalid("missing `code_to_translate` or `test_cases`")),
        (Some(Value::String(code)), None) => Ok(vec![code.clone()]),
        (Some(_), None) => Err(invalid("`code_to_translate` must be a string")),
        (None, Some(Value::Array(cases))) => {
            if cases.is_empty() {
                return Err(invalid("`test_cases` must not be empty"));
            }
            cases
                .iter()
                .enumerate()
                .map(|(i, case)| {
                    case.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(format!("`test_cases[{}]` must be a string", i)))
                })
                .collect()
        }
        (None, Some(_)) => Err(invalid("`test_cases` must be a list of strings")),
    }
}

impl EvalRequest {
    /// Check the request shape and split it into ordered cases.
    ///
    /// # Errors
    ///
    /// Returns [`JudgeError::Validation`] naming the first violated rule.
    pub fn validate(&self) -> Result<ValidatedRequest> {
        if self.participants.len() != 1 {
            return Err(invalid(format!(
                "expected exactly one participant, got {}",
                self.participants.len()
            )));
        }
        let Some((role, endpoint)) = self.participants.iter().next() else {
            return Err(invalid("expected exactly one participant, got 0"));
        };
        if endpoint.trim().is_empty() {
            return Err(invalid(format!("participant `{}` has no endpoint", role)));
        }

        let source_language = required_string(&self.config, "source_language")?;
        let target_language = required_string(&self.config, "target_language")?;
        let samples = code_samples(&self.config)?;

        let total = samples.len();
        let cases = samples
            .into_iter()
            .enumerate()
            .map(|(i, original_code)| EvaluationCase {
                original_code,
                source_language: source_language.clone(),
                target_language: target_language.clone(),
                index: i + 1,
                total,
            })
            .collect();

        Ok(ValidatedRequest {
            role: role.clone(),
            endpoint: endpoint.clone(),
            source_language,
            target_language,
            cases,
        })
    }
}
