//! Judging prompt rendering

use crate::llm::LLMRequest;

const SYSTEM_PROMPT: &str = "You are an expert reviewer of source code translated between \
programming languages. Judge a translation on four dimensions, each scored from 0 to 10:

- execution_correctness: the code runs without errors and keeps the original behavior.
- style_score: the code follows the conventions of the target language and is well commented.
- conciseness: the code has no redundant or unrelated parts.
- relevance: the code stays on the task and mirrors the original structure and logic.

Name the participant role as the winner when the translation is acceptable, otherwise use \"N/A\".";

const JSON_INSTRUCTIONS: &str = "Respond with a single JSON object with the keys \
\"reasoning\" (string), \"execution_correctness\", \"style_score\", \"conciseness\", \
\"relevance\" (numbers) and \"winner\" (string). Do not add any other text.";

/// Everything a backend needs to judge one translation
#[derive(Debug, Clone, Copy)]
pub struct JudgingPrompt<'a> {
    pub original_code: &'a str,
    pub translated_code: &'a str,
    pub source_language: &'a str,
    pub target_language: &'a str,
    pub participant_role: &'a str,
}

impl<'a> JudgingPrompt<'a> {
    /// User turn shared by both backend kinds
    pub fn user_prompt(&self) -> String {
        format!(
            "Participant role: {role}\n\n\
             Original code ({source}):\n```{source}\n{original}\n```\n\n\
             Translated code ({target}):\n```{target}\n{translated}\n```",
            role = self.participant_role,
            source = self.source_language,
            target = self.target_language,
            original = self.original_code,
            translated = self.translated_code,
        )
    }

    /// Request for a backend that enforces the evaluation schema itself
    pub fn structured_request(&self) -> LLMRequest {
        LLMRequest::with_system_prompt(SYSTEM_PROMPT, self.user_prompt())
    }

    /// Request for a text-only backend; spells out the JSON shape in prose
    pub fn text_request(&self) -> LLMRequest {
        LLMRequest::with_system_prompt(
            format!("{}\n\n{}", SYSTEM_PROMPT, JSON_INSTRUCTIONS),
            self.user_prompt(),
        )
    }
}
