//! Brace-matching JSON object scanner with fuzzy repair

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::parser::{OutputParser, ParseError, ParseResult, ParserConfig};

/// Locates one JSON object inside free text and parses it
pub struct JsonObjectParser {
    config: ParserConfig,
}

impl JsonObjectParser {
    /// Create a new parser with default config
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a strict parser (no repair)
    pub fn strict() -> Self {
        Self {
            config: ParserConfig::strict(),
        }
    }

    /// Extract the body of the first ```json fence, if any
    fn strip_code_fences<'a>(&self, input: &'a str) -> &'a str {
        static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"```(?:json|JSON)?[ \t]*\n?([\s\S]*?)\n?```").unwrap()
        });

        CODE_FENCE_RE
            .captures(input)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|body| body.contains('{'))
            .unwrap_or(input)
    }

    /// Return the balanced `{...}` substring starting at byte offset `start`.
    ///
    /// Braces inside string literals are ignored. An unbalanced tail yields the
    /// remainder of the input so repair can close it.
    fn balanced_object(input: &str, start: usize) -> (&str, bool) {
        let substring = &input[start..];
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escape_next = false;

        for (i, c) in substring.char_indices() {
            if escape_next {
                escape_next = false;
                continue;
            }

            match c {
                '\\' if in_string => escape_next = true,
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return (&substring[..=i], true);
                    }
                }
                _ => {}
            }
        }

        (substring, false)
    }

    fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Repair common JSON issues
    fn repair_json(&self, input: &str) -> String {
        static TRAILING_COMMA_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r",(\s*[}\]])").unwrap());
        static UNQUOTED_KEY_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(\{|,)\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*:").unwrap());

        let mut result = self.fix_quotes(input);
        result = TRAILING_COMMA_RE.replace_all(&result, "$1").to_string();
        result = UNQUOTED_KEY_RE
            .replace_all(&result, r#"$1"$2":"#)
            .to_string();

        let open_braces = result.matches('{').count();
        let close_braces = result.matches('}').count();
        for _ in close_braces..open_braces {
            result.push('}');
        }

        result
    }

    /// Fix single-quoted strings to double quotes
    fn fix_quotes(&self, input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut in_double_string = false;
        let mut in_single_string = false;
        let mut escape_next = false;

        for c in input.chars() {
            if escape_next {
                result.push(c);
                escape_next = false;
                continue;
            }

            match c {
                '\\' => {
                    result.push(c);
                    escape_next = true;
                }
                '"' if !in_single_string => {
                    in_double_string = !in_double_string;
                    result.push(c);
                }
                '\'' if !in_double_string => {
                    in_single_string = !in_single_string;
                    result.push('"');
                }
                _ => result.push(c),
            }
        }

        result
    }
}

impl Default for JsonObjectParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser for JsonObjectParser {
    type Output = Map<String, Value>;

    fn parse(&self, raw: &str) -> ParseResult<Self::Output> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        if let Some(map) = Self::parse_object(trimmed) {
            return Ok(map);
        }

        let input = if self.config.strip_code_fences {
            self.strip_code_fences(trimmed)
        } else {
            trimmed
        };

        let mut found_any = false;
        let starts = input
            .char_indices()
            .filter(|(_, c)| *c == '{')
            .map(|(i, _)| i)
            .take(self.config.max_candidates);

        for start in starts {
            found_any = true;
            let (candidate, balanced) = Self::balanced_object(input, start);

            if balanced {
                if let Some(map) = Self::parse_object(candidate) {
                    return Ok(map);
                }
            }

            if self.config.attempt_repair {
                if let Some(map) = Self::parse_object(&self.repair_json(candidate)) {
                    return Ok(map);
                }
            }
        }

        if !found_any {
            return Err(ParseError::NoObject);
        }

        Err(ParseError::InvalidFormat(
            "Failed to parse JSON object after repair attempts".to_string(),
        ))
    }
}
