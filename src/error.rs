use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_UNTERMINATED_MUSTACHE: &str = "HBS-PARSE-001";
pub const ERR_UNEXPECTED_CLOSE: &str = "HBS-PARSE-002";
pub const ERR_MISMATCHED_CLOSE: &str = "HBS-PARSE-003";
pub const ERR_UNCLOSED_BLOCK: &str = "HBS-PARSE-004";
pub const ERR_EMPTY_MUSTACHE: &str = "HBS-PARSE-005";
pub const ERR_MODEL_JSON: &str = "HBS-MODEL-001";
pub const ERR_DUPLICATE_CLASS: &str = "HBS-MODEL-002";
pub const ERR_BAD_TYPE: &str = "HBS-MODEL-003";
pub const ERR_UNKNOWN_ROOT: &str = "HBS-MODEL-004";
pub const ERR_OPTIONS_JSON: &str = "HBS-CONFIG-001";

fn describe(code: &str) -> &'static str {
    match code {
        ERR_UNTERMINATED_MUSTACHE => "Every `{{` must be closed by a matching `}}`.",
        ERR_UNEXPECTED_CLOSE => "A closing block `{{/name}}` needs an open block.",
        ERR_MISMATCHED_CLOSE => "A closing block must name the block it closes.",
        ERR_UNCLOSED_BLOCK => "Every `{{#name}}` block must be closed before end of input.",
        ERR_EMPTY_MUSTACHE => "A mustache must contain an expression.",
        ERR_MODEL_JSON => "The class model must be valid JSON.",
        ERR_DUPLICATE_CLASS => "Class names are unique within a model.",
        ERR_BAD_TYPE => "Declared field types follow `Name`, `Name<Args>` or `Name[]`.",
        ERR_UNKNOWN_ROOT => "The template root class must exist in the model.",
        ERR_OPTIONS_JSON => "Resolver options must be a valid JSON object.",
        _ => "Unknown error.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure to load a template or a class model.
///
/// Resolution itself never produces one of these; an unresolved reference is
/// an ordinary `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveError {
    pub code: String,
    pub message: String,
    pub description: String,
    pub line: u32,
    pub column: u32,
    pub hints: Vec<String>,
}

impl ResolveError {
    pub fn new(code: &str, message: &str, line: u32, column: u32) -> Self {
        Self::with_hints(code, message, line, column, vec![])
    }

    pub fn with_hints(code: &str, message: &str, line: u32, column: u32, hints: Vec<String>) -> Self {
        ResolveError {
            code: code.to_string(),
            message: message.to_string(),
            description: describe(code).to_string(),
            line,
            column,
            hints,
        }
    }

    /// Error that has no meaningful source position (model loading).
    pub fn unpositioned(code: &str, message: &str) -> Self {
        Self::new(code, message, 0, 0)
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "[{}] {}:{}: {}", self.code, self.line, self.column, self.message)?;
        } else {
            write!(f, "[{}] {}", self.code, self.message)?;
        }
        for hint in &self.hints {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolveError {}

/// 1-based line and column of a byte offset.
pub fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() as u32 + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() as u32 + 1,
        None => before.chars().count() as u32 + 1,
    };
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position_and_hints() {
        let err = ResolveError::with_hints(
            ERR_MISMATCHED_CLOSE,
            "expected {{/each}}, found {{/with}}",
            3,
            7,
            vec!["close the inner block first".to_string()],
        );
        let text = err.to_string();
        assert!(text.starts_with("[HBS-PARSE-003] 3:7:"));
        assert!(text.contains("hint: close the inner block first"));
        assert_eq!(err.description, "A closing block must name the block it closes.");
    }

    #[test]
    fn test_unpositioned_display() {
        let err = ResolveError::unpositioned(ERR_UNKNOWN_ROOT, "no class named 'Zoo'");
        assert_eq!(err.to_string(), "[HBS-MODEL-004] no class named 'Zoo'");
    }

    #[test]
    fn test_line_column() {
        let src = "ab\ncd{{x}}";
        assert_eq!(line_column(src, 0), (1, 1));
        assert_eq!(line_column(src, 3), (2, 1));
        assert_eq!(line_column(src, 5), (2, 3));
        assert_eq!(line_column(src, 100), (2, 8));
    }
}
