//! Best-effort recovery of translated code from a participant reply

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// Placeholder scored when nothing usable came back
pub const NO_CODE_SENTINEL: &str = "// Error: No Code Translated";

/// Object keys probed for the translation, highest priority first
pub const TRANSLATION_KEYS: &[&str] = &["translated_code", "code", "content", "message"];

/// Which strategy produced the extracted code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTier {
    /// A JSON object field or bare JSON string
    Structured,
    /// The longest fenced code block
    FencedBlock,
    /// The trimmed reply itself
    Raw,
    /// Nothing usable; the sentinel was substituted
    Sentinel,
}

/// Turns arbitrary participant replies into a non-empty code string
#[derive(Debug, Clone)]
pub struct ResponseExtractor {
    keys: &'static [&'static str],
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self {
            keys: TRANSLATION_KEYS,
        }
    }
}

impl ResponseExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different key priority table
    pub fn with_keys(keys: &'static [&'static str]) -> Self {
        Self { keys }
    }

    /// Extract code from a reply. Never fails and never returns an empty string.
    pub fn extract(&self, raw: &str) -> String {
        self.extract_with_tier(raw).0
    }

    /// Extract code and report the tier that produced it
    pub fn extract_with_tier(&self, raw: &str) -> (String, ExtractionTier) {
        let result = self
            .structured(raw)
            .map(|code| (code, ExtractionTier::Structured))
            .or_else(|| longest_fenced_block(raw).map(|code| (code, ExtractionTier::FencedBlock)))
            .or_else(|| {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| (trimmed.to_string(), ExtractionTier::Raw))
            })
            .unwrap_or_else(|| (NO_CODE_SENTINEL.to_string(), ExtractionTier::Sentinel));

        debug!(tier = ?result.1, chars = result.0.len(), "extracted translation");
        result
    }

    fn structured(&self, raw: &str) -> Option<String> {
        match serde_json::from_str::<Value>(raw.trim()).ok()? {
            Value::Object(map) => self
                .keys
                .iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .find(|value| !value.trim().is_empty())
                .map(str::to_string),
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Longest fenced code block by character count; earliest wins ties
fn longest_fenced_block(raw: &str) -> Option<String> {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"```[A-Za-z0-9_+#.\-]*[ \t]*\r?\n([\s\S]*?)```").unwrap()
    });

    let mut best: Option<(usize, &str)> = None;
    for caps in FENCE_RE.captures_iter(raw) {
        let Some(body) = caps.get(1) else { continue };
        let body = body.as_str().trim();
        let len = body.chars().count();
        if best.is_none_or(|(best_len, _)| len > best_len) {
            best = Some((len, body));
        }
    }

    best.filter(|(len, _)| *len > 0)
        .map(|(_, body)| body.to_string())
}
