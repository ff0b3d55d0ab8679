//! Diagnostics for the HED toolchain.
//!
//! Provides [`Diagnostic`], [`Severity`], and [`Span`] types used to report
//! errors and warnings from the tokenizer, parser, and validators.
//! Diagnostic codes are defined in the [`codes`] module.

#![warn(missing_docs)]

/// Diagnostic ID constants generated from the diagnostic catalogue.
pub mod codes;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Severity {
    /// Hard error: the annotation is invalid.
    Error,
    /// Warning: the annotation is valid but uses something discouraged.
    Warn,
}

/// Byte span in the source string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Span {
    /// Byte offset of the first character (0-based).
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Create a span covering `[start, end)`.
    ///
    /// Panics if `end < start`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(end >= start, "Span end ({end}) < start ({start})");
        Self { start, end }
    }

    /// Create a zero-width span at the given position.
    pub fn empty(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Create a span covering the single character starting at `pos`.
    pub fn at(pos: usize, ch: char) -> Self {
        Self::new(pos, pos + ch.len_utf8())
    }

    /// Number of bytes covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is zero-width.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A diagnostic message produced by the parser or a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Unique diagnostic code (e.g., `"HED1001"`).
    pub id: Cow<'static, str>,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable diagnostic message.
    pub message: String,
    /// Optional byte span in the source string that this diagnostic relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Machine-readable context for tooling. Keys and values are free-form strings.
    /// Serialized only when present.
    ///
    /// Uses `BTreeMap` for deterministic key ordering in serialized output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, String>>,
}

impl Diagnostic {
    /// Create a diagnostic with the given fields.
    pub fn new(
        id: impl Into<Cow<'static, str>>,
        severity: Severity,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            span,
            context: None,
        }
    }

    /// Shorthand for an `Error` diagnostic.
    pub fn error(
        id: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self::new(id, Severity::Error, message, span)
    }

    /// Shorthand for a `Warn` diagnostic.
    pub fn warn(
        id: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self::new(id, Severity::Warn, message, span)
    }

    /// Create a diagnostic whose severity is the catalogue default for `id`.
    ///
    /// Codes missing from the catalogue are reported as errors.
    pub fn coded(id: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        let severity = severity_for_code(id).unwrap_or(Severity::Error);
        Self::new(id, severity, message, span)
    }

    /// Attach machine-readable context metadata (builder pattern).
    ///
    /// Keys are short descriptors like `"tag"`, `"definition"`, `"unit"`.
    pub fn with_context(mut self, ctx: BTreeMap<String, String>) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Returns the human-readable explanation for this diagnostic's code, if available.
    pub fn explain(&self) -> Option<&'static str> {
        explain(&self.id)
    }

    /// Returns the standard HED issue code (e.g. `TAG_INVALID`) this diagnostic maps to.
    pub fn hed_code(&self) -> Option<&'static str> {
        hed_code_for(&self.id)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warn => write!(f, "warn"),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.id, self.message)
    }
}

/// Returns the human-readable explanation for a diagnostic code, if known.
pub fn explain(id: &str) -> Option<&'static str> {
    include!(concat!(env!("OUT_DIR"), "/generated_explain.rs"))
}

/// Returns the default severity for a diagnostic code, if known.
pub fn severity_for_code(id: &str) -> Option<Severity> {
    include!(concat!(env!("OUT_DIR"), "/generated_severity.rs"))
}

/// Returns the standard HED issue code a diagnostic code maps to, if known.
///
/// Several toolchain codes share one HED code; `HED1004` and `HED1005` both
/// map to `PARENTHESES_MISMATCH`, for example.
pub fn hed_code_for(id: &str) -> Option<&'static str> {
    include!(concat!(env!("OUT_DIR"), "/generated_hed_codes.rs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Span ────────────────────────────────────────────────────────────

    #[test]
    fn span_new_valid() {
        let s = Span::new(5, 10);
        assert_eq!(s.start, 5);
        assert_eq!(s.end, 10);
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn span_empty() {
        let s = Span::empty(7);
        assert_eq!(s.start, 7);
        assert!(s.is_empty());
    }

    #[test]
    fn span_at_multibyte_char() {
        let s = Span::at(2, '€');
        assert_eq!(s, Span::new(2, 5));
    }

    #[test]
    #[should_panic(expected = "Span end (3) < start (5)")]
    fn span_new_inverted_panics() {
        Span::new(5, 3);
    }

    // ── Severity ────────────────────────────────────────────────────────

    #[test]
    fn severity_display() {
        assert_eq!(format!("{}", Severity::Error), "error");
        assert_eq!(format!("{}", Severity::Warn), "warn");
    }

    #[test]
    fn catalogue_severities() {
        assert_eq!(severity_for_code(codes::INVALID_TAG), Some(Severity::Error));
        assert_eq!(severity_for_code(codes::EXTENDED_TAG), Some(Severity::Warn));
        assert_eq!(severity_for_code(codes::DEPRECATED_TAG), Some(Severity::Warn));
        assert_eq!(severity_for_code("HED0000"), None);
    }

    // ── Diagnostic constructors ─────────────────────────────────────────

    #[test]
    fn diagnostic_error_constructor() {
        let d = Diagnostic::error(codes::EMPTY_TAG, "empty tag", None);
        assert_eq!(d.id, "HED1001");
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "empty tag");
        assert!(d.span.is_none());
        assert!(d.is_error());
    }

    #[test]
    fn diagnostic_coded_uses_catalogue_severity() {
        let d = Diagnostic::coded(codes::EXTENDED_TAG, "extended", Some(Span::new(0, 5)));
        assert_eq!(d.severity, Severity::Warn);
        assert!(!d.is_error());
        let e = Diagnostic::coded(codes::INVALID_UNIT, "bad unit", None);
        assert_eq!(e.severity, Severity::Error);
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::error(codes::UNOPENED_PARENTHESIS, "unopened parenthesis", None);
        assert_eq!(format!("{}", d), "error[HED1005]: unopened parenthesis");
    }

    // ── explain / HED codes ─────────────────────────────────────────────

    #[test]
    fn diagnostic_explain_known() {
        let d = Diagnostic::error(codes::CHILD_REQUIRED, "test", None);
        assert!(d.explain().unwrap().contains("requireChild"));
    }

    #[test]
    fn diagnostic_explain_unknown() {
        let d = Diagnostic::error("UNKNOWN_CODE", "test", None);
        assert!(d.explain().is_none());
        assert!(d.hed_code().is_none());
    }

    #[test]
    fn shared_hed_codes() {
        assert_eq!(hed_code_for(codes::UNCLOSED_PARENTHESIS), Some("PARENTHESES_MISMATCH"));
        assert_eq!(hed_code_for(codes::UNOPENED_PARENTHESIS), Some("PARENTHESES_MISMATCH"));
        assert_eq!(hed_code_for(codes::INVALID_UNIT), Some("UNITS_INVALID"));
    }

    #[test]
    fn all_codes_have_catalogue_entries() {
        assert!(!codes::ALL.is_empty());
        for code in codes::ALL {
            assert!(explain(code).is_some(), "{code} has no explain() entry");
            assert!(severity_for_code(code).is_some(), "{code} has no severity");
            assert!(hed_code_for(code).is_some(), "{code} has no HED code");
        }
    }

    // ── Serde ───────────────────────────────────────────────────────────

    #[test]
    fn diagnostic_serde_roundtrip() {
        let d = Diagnostic::error(codes::INVALID_VALUE, "bad value", Some(Span::new(10, 20)));
        let json = serde_json::to_string(&d).unwrap();
        let d2: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(d, d2);
    }

    #[test]
    fn diagnostic_serde_omits_none_fields() {
        let d = Diagnostic::error(codes::EMPTY_TAG, "test", None);
        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("span"), "None span should be omitted: {json}");
        assert!(
            !json.contains("context"),
            "None context should be omitted: {json}"
        );
    }

    #[test]
    fn diagnostic_context_deterministic_order() {
        let d = Diagnostic::error(codes::INVALID_TAG, "test", None).with_context(BTreeMap::from([
            ("z_last".into(), "1".into()),
            ("a_first".into(), "2".into()),
            ("m_middle".into(), "3".into()),
        ]));
        let json = serde_json::to_string(&d).unwrap();
        let a_pos = json.find("a_first").unwrap();
        let m_pos = json.find("m_middle").unwrap();
        let z_pos = json.find("z_last").unwrap();
        assert!(
            a_pos < m_pos && m_pos < z_pos,
            "BTreeMap should serialize in alphabetical key order: {json}"
        );
    }
}
