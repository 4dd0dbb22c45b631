//! Diagnostics for the sft-toolchain.
//!
//! Provides [`Diagnostic`], [`Severity`], and [`Span`] types used to report
//! errors, warnings, and informational messages from the token scanner, the
//! semantic reconstructor, and the encoder. Diagnostic codes are defined in
//! the [`codes`] module.
//!
//! Spans are byte ranges into the *input buffer* — for binary inputs they
//! index the raw bytes, for text-mode inputs they index the UTF-8 source.

#![warn(missing_docs)]

/// Stable diagnostic ID constants.
pub mod codes;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Severity {
    /// Hard error — the input is invalid.
    Error,
    /// Warning — the input may produce unexpected results.
    Warn,
    /// Informational note.
    Info,
}

/// Byte span in the input buffer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first byte (0-based).
    pub start: usize,
    /// Byte offset one past the last byte.
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
}

/// A diagnostic message produced by the scanner, reconstructor, or encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Unique diagnostic code (e.g., `"SFT1101"`).
    pub id: Cow<'static, str>,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable diagnostic message.
    pub message: String,
    /// Optional byte span in the input buffer that this diagnostic relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Machine-readable context for tooling. Keys and values are free-form
    /// strings. Absent when no context is applicable.
    ///
    /// Uses `BTreeMap` for deterministic key ordering in serialized output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, String>>,
}

impl Diagnostic {
    /// Create a diagnostic with the given severity.
    pub fn new(
        id: impl Into<Cow<'static, str>>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            span: None,
            context: None,
        }
    }

    /// Shorthand for an `Error` diagnostic.
    pub fn error(id: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Error, message)
    }

    /// Shorthand for a `Warn` diagnostic.
    pub fn warn(id: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Warn, message)
    }

    /// Shorthand for an `Info` diagnostic.
    pub fn info(id: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::new(id, Severity::Info, message)
    }

    /// Attach the byte span the diagnostic refers to (builder pattern).
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach machine-readable context metadata (builder pattern).
    pub fn with_context(mut self, ctx: BTreeMap<String, String>) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Returns the human-readable explanation for this diagnostic's code,
    /// if available.
    pub fn explain(&self) -> Option<&'static str> {
        explain(&self.id)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warn => write!(f, "warn"),
            Severity::Info => write!(f, "info"),
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
    match id {
        codes::SCAN_EMPTY_TOKEN_STREAM => Some(
            "The scanner tested every offset of the buffer as a 4-byte \
             big-endian length prefix and recovered zero printable string \
             cells. The input is either not a spring-force tester binary or \
             already in text form; decoding falls back to the line-oriented \
             text grammar.",
        ),
        codes::SCAN_HEADER_MISMATCH => Some(
            "The first 13 bytes did not match the fixed magic header \
             (00 00 00 12 00 00 00 06 00 00 00 01 31). Files from older \
             firmware occasionally deviate; decoding continues and this is \
             a compatibility warning, not a failure.",
        ),
        codes::RECON_UNKNOWN_COMMAND => Some(
            "A command-shaped token has no entry in the command schema \
             table. The step is captured generically: the code is kept \
             as-is, the next token becomes the description, and a bounded \
             number of following tokens are classified heuristically.",
        ),
        codes::RECON_AMBIGUOUS_OPERAND => Some(
            "An operand token matched none of the classification rules \
             (numeric/formula, known unit, parenthesised tolerance, \
             structural punctuation). It was preserved in the step's extra \
             list rather than assigned to a role.",
        ),
        codes::RECON_MISSING_SEPARATOR => Some(
            "A metadata label was not immediately followed by its expected \
             separator cell (\"--\" or a unit). The value was recovered by \
             scanning ahead up to 4 tokens, which is a heuristic, not a \
             documented grammar rule.",
        ),
        codes::RECON_MISSING_SEQUENCE_MARKER => Some(
            "The literal \"<Test Sequence>\" cell was not found, so the \
             document contains metadata only and no steps.",
        ),
        codes::RECON_TRUNCATED_STEP => Some(
            "The token stream ended before all operand roles declared by \
             the command's schema entry could be filled. The roles that \
             were reached are populated; the rest are left blank.",
        ),
        codes::ENCODE_UNREPRESENTABLE_VALUE => Some(
            "A document value cannot be written as a valid string cell: \
             cells must be 1..=100 bytes of printable ASCII so that the \
             scanner's own acceptance predicate recovers them. This error \
             is fatal for the offending file only.",
        ),
        codes::TEXT_INVALID_LINE => Some(
            "A line inside the \"--- Test Sequence ---\" region did not \
             match the `CMD - Description: params` shape and was skipped.",
        ),
        codes::TEXT_EMPTY_DOCUMENT => Some(
            "The text-mode grammar recovered neither metadata nor steps. \
             The input is not a recognizable spring-force test file in \
             either representation.",
        ),
        _ => None,
    }
}
