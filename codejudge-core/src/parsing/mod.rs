//! Structured Output Parsing
//!
//! Robust recovery of JSON objects from free-text backend replies.
//!
//! # Features
//!
//! - **Brace matching**: finds a balanced `{...}` even when prose surrounds it
//! - **Fuzzy repair**: trailing commas, single quotes, unquoted keys, missing braces
//! - **Fence aware**: prefers the body of a ```json fence when present
//!
//! # Example
//!
//! ```rust
//! use codejudge_core::parsing::{JsonObjectParser, OutputParser};
//!
//! let parser = JsonObjectParser::new();
//! let object = parser.parse("Verdict: {\"winner\": \"translator\",}").unwrap();
//! assert_eq!(object["winner"], "translator");
//! ```

mod json;
mod parser;

pub use json::JsonObjectParser;
pub use parser::{OutputParser, ParseError, ParseResult, ParserConfig};
