//! Message template compilation
//!
//! Templates are literal text interspersed with `{source:format}`
//! placeholders. `source` is one of `method`, `this`, `result`, `arg<N>`,
//! `args`; `format` is `%s` or `%i` (both stringify) or `%x` (identity
//! token). A bare `{source}` defaults to `%s`. Unrecognized sources or
//! formats are fatal at compile time, never silently dropped.
//!
//! Compilation is deterministic and produces a reusable plan: ordered
//! `(literal, source, format)` segments plus the trailing literal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{InstrumentError, Result};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z]+[0-9]*)(?::(%[A-Za-z]))?\}").expect("valid pattern"));

/// Where a placeholder draws its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceholderSource {
    /// Enclosing method's fully qualified signature (constant text)
    Method,
    /// Call receiver, or the enclosing method's self-reference for
    /// entry-logging directives
    This,
    /// The instrumented call's assignment target
    Result,
    /// Nth actual call argument
    Arg(usize),
    /// Synthesized display of all arguments
    Args,
}

/// How a placeholder renders its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatKind {
    /// `%s` / `%i`: textual conversion
    Stringify,
    /// `%x`: integer correlator from reference identity
    Identity,
}

/// One literal-then-placeholder step of a compiled template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub literal: String,
    pub source: PlaceholderSource,
    pub format: FormatKind,
}

/// Compiled, reusable template plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledTemplate {
    pub segments: Vec<Segment>,
    pub trailer: String,
}

impl CompiledTemplate {
    /// Compile a template string; fails fast on unknown placeholders.
    pub fn compile(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut cursor = 0;
        for capture in PLACEHOLDER.captures_iter(template) {
            let whole = capture.get(0).expect("match");
            let source = parse_source(&capture[1], template)?;
            let format = match capture.get(2).map(|m| m.as_str()) {
                None | Some("%s") | Some("%i") => FormatKind::Stringify,
                Some("%x") => FormatKind::Identity,
                Some(other) => {
                    return Err(InstrumentError::config(format!(
                        "unknown placeholder format {:?} in template {:?}",
                        other, template
                    )));
                }
            };
            segments.push(Segment {
                literal: template[cursor..whole.start()].to_string(),
                source,
                format,
            });
            cursor = whole.end();
        }
        Ok(CompiledTemplate {
            segments,
            trailer: template[cursor..].to_string(),
        })
    }
}

fn parse_source(name: &str, template: &str) -> Result<PlaceholderSource> {
    match name {
        "method" => Ok(PlaceholderSource::Method),
        "this" => Ok(PlaceholderSource::This),
        "result" => Ok(PlaceholderSource::Result),
        "args" => Ok(PlaceholderSource::Args),
        _ => {
            if let Some(index) = name.strip_prefix("arg") {
                if let Ok(index) = index.parse::<usize>() {
                    return Ok(PlaceholderSource::Arg(index));
                }
            }
            Err(InstrumentError::config(format!(
                "unknown placeholder source {:?} in template {:?}",
                name, template
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiles_segments_in_order() {
        let compiled =
            CompiledTemplate::compile("Method {method:%s} retrieved code {result:%i}").unwrap();
        assert_eq!(compiled.segments.len(), 2);
        assert_eq!(compiled.segments[0].literal, "Method ");
        assert_eq!(compiled.segments[0].source, PlaceholderSource::Method);
        assert_eq!(compiled.segments[1].literal, " retrieved code ");
        assert_eq!(compiled.segments[1].source, PlaceholderSource::Result);
        assert_eq!(compiled.segments[1].format, FormatKind::Stringify);
        assert_eq!(compiled.trailer, "");
    }

    #[test]
    fn test_bare_placeholder_defaults_to_stringify() {
        let compiled = CompiledTemplate::compile("{args}!").unwrap();
        assert_eq!(compiled.segments[0].format, FormatKind::Stringify);
        assert_eq!(compiled.segments[0].source, PlaceholderSource::Args);
        assert_eq!(compiled.trailer, "!");
    }

    #[test]
    fn test_arg_indices() {
        let compiled = CompiledTemplate::compile("{arg0:%s}={arg12:%x}").unwrap();
        assert_eq!(compiled.segments[0].source, PlaceholderSource::Arg(0));
        assert_eq!(compiled.segments[1].source, PlaceholderSource::Arg(12));
        assert_eq!(compiled.segments[1].format, FormatKind::Identity);
    }

    #[test]
    fn test_unknown_source_is_fatal() {
        let err = CompiledTemplate::compile("{receiver:%s}").unwrap_err();
        assert!(matches!(err, InstrumentError::Config(_)));
        assert!(err.to_string().contains("receiver"));
    }

    #[test]
    fn test_unknown_format_is_fatal() {
        assert!(CompiledTemplate::compile("{this:%q}").is_err());
    }

    #[test]
    fn test_literal_braces_pass_through() {
        let compiled = CompiledTemplate::compile("nothing {here at all}").unwrap();
        assert!(compiled.segments.is_empty());
        assert_eq!(compiled.trailer, "nothing {here at all}");
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let a = CompiledTemplate::compile("x {this:%x} y {args} z").unwrap();
        let b = CompiledTemplate::compile("x {this:%x} y {args} z").unwrap();
        assert_eq!(a, b);
    }
}
