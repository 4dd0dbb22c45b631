//! Semantic reconstruction — turns a scanned token stream into a [`Document`].
//!
//! Reconstruction runs in three passes over the token list: header triplets,
//! the `<Test Sequence>` marker block, then table-driven step assembly.
//! Nothing here is fatal except a completely empty token stream; every other
//! irregularity degrades to a [`Diagnostic`] so a damaged capture still
//! yields whatever structure it contains.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use sft_toolchain_diagnostics::{codes, Diagnostic, Span};
use sft_toolchain_schema::{Column, OperandRole, SchemaTable};

use super::classify::{classify, OperandClass};
use super::document::{Document, Step};
use super::scan::Token;

/// The marker cell separating the header region from the step region.
pub const SEQUENCE_MARKER: &str = "<Test Sequence>";

/// Separator cell between a header label and its value.
pub const TRIPLET_SEPARATOR: &str = "--";

/// Fatal decoding failures. Anything recoverable is a [`Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The scanner recovered nothing; the caller should try the text path.
    #[error("no length-prefixed string cells found in input")]
    EmptyTokenStream,
    /// Both the binary and text readings produced an empty document.
    #[error("input contains no recognizable header fields or sequence steps")]
    EmptyDocument,
}

/// A reconstructed document together with everything worth reporting about
/// how it was recovered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodeOutput {
    /// The recovered document.
    pub document: Document,
    /// Non-fatal findings, in encounter order.
    pub diagnostics: Vec<Diagnostic>,
}

/// How many tokens ahead the reconstructor searches when the stream is not
/// in canonical triplet or operand shape.
const LOOKAHEAD: usize = 4;

fn span_of(token: &Token) -> Span {
    Span::new(token.offset, token.end())
}

/// A bare unit word, as written between a header label and its value.
fn is_unit_word(value: &str) -> bool {
    classify(value) == OperandClass::Unit
}

/// Whether a cell ends the current step's run of operands. Known command
/// codes always do; command-shaped words do too unless they are unit words,
/// which share the all-letters shape but are plainly operands.
fn ends_operand_run(value: &str, table: &SchemaTable) -> bool {
    table.is_known(value) || (is_command_like(value) && classify(value) != OperandClass::Unit)
}

/// `Letters` or `Letters(Letters)` — the surface shape of a command code.
fn is_command_like(value: &str) -> bool {
    let rest = match value.find('(') {
        Some(open) => {
            let Some(inner) = value[open + 1..].strip_suffix(')') else {
                return false;
            };
            if open == 0 || inner.is_empty() || !inner.chars().all(|c| c.is_ascii_alphabetic()) {
                return false;
            }
            &value[..open]
        }
        None => value,
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphabetic())
}

/// Reconstruct a document from scanned tokens.
///
/// Fails only when `tokens` is empty. The token order is the document order;
/// steps come out in the order their command cells appear.
pub fn reconstruct(tokens: &[Token], table: &SchemaTable) -> Result<DecodeOutput, DecodeError> {
    if tokens.is_empty() {
        return Err(DecodeError::EmptyTokenStream);
    }

    let mut out = DecodeOutput::default();
    let marker = tokens.iter().position(|t| t.value == SEQUENCE_MARKER);

    let header_end = match marker {
        Some(m) => m,
        None => {
            out.diagnostics.push(Diagnostic::warn(
                codes::RECON_MISSING_SEQUENCE_MARKER,
                format!("no `{SEQUENCE_MARKER}` marker found; treating the whole stream as header data"),
            ));
            tokens.len()
        }
    };

    read_header(&tokens[..header_end], &mut out);

    if let Some(m) = marker {
        let body_start = read_marker_block(tokens, m, table, &mut out);
        read_steps(&tokens[body_start..], table, &mut out);
    }

    Ok(out)
}

/// Header pass: `label / separator / value` triplets. The separator is the
/// literal `--` or a unit word; a unit word is folded back into the stored
/// value (`Free Length` keeps its `mm` suffix).
fn read_header(tokens: &[Token], out: &mut DecodeOutput) {
    let mut i = 0;
    while i < tokens.len() {
        let label = &tokens[i];
        let sep = tokens.get(i + 1);
        let value = tokens.get(i + 2);

        match (sep, value) {
            (Some(sep), Some(value)) if sep.value == TRIPLET_SEPARATOR => {
                out.document.metadata.insert(&label.value, &value.value);
                i += 3;
            }
            (Some(sep), Some(value)) if is_unit_word(&sep.value) => {
                out.document
                    .metadata
                    .insert(&label.value, format!("{} {}", value.value, sep.value));
                i += 3;
            }
            // The token at `i + 1` opens a triplet of its own, so the
            // current token is a stray cell, not a label.
            (Some(_), _)
                if tokens
                    .get(i + 2)
                    .is_some_and(|t| t.value == TRIPLET_SEPARATOR || is_unit_word(&t.value)) =>
            {
                out.diagnostics.push(
                    Diagnostic::info(
                        codes::RECON_AMBIGUOUS_OPERAND,
                        format!("stray cell `{}` in the header region was skipped", label.value),
                    )
                    .with_span(span_of(label)),
                );
                i += 1;
            }
            _ => {
                // Not in triplet shape: search a few tokens ahead for a
                // plausible value and pair it with this label.
                let recovered = tokens[i + 1..]
                    .iter()
                    .take(LOOKAHEAD)
                    .find(|t| t.value != TRIPLET_SEPARATOR && !is_unit_word(&t.value));
                match recovered {
                    Some(value) => {
                        out.diagnostics.push(
                            Diagnostic::warn(
                                codes::RECON_MISSING_SEPARATOR,
                                format!(
                                    "header field `{}` is missing its separator; paired with `{}` by look-ahead",
                                    label.value, value.value
                                ),
                            )
                            .with_span(span_of(label)),
                        );
                        out.document.metadata.insert(&label.value, &value.value);
                        // Resume after the recovered value.
                        let skip = tokens[i + 1..]
                            .iter()
                            .position(|t| t.offset == value.offset)
                            .unwrap_or(0);
                        i += skip + 2;
                    }
                    None => {
                        out.diagnostics.push(
                            Diagnostic::warn(
                                codes::RECON_MISSING_SEPARATOR,
                                format!(
                                    "header field `{}` has no value within {LOOKAHEAD} tokens; dropped",
                                    label.value
                                ),
                            )
                            .with_span(span_of(label)),
                        );
                        i += 1;
                    }
                }
            }
        }
    }
}

/// Marker block pass: the five cells after `<Test Sequence>` are the force
/// unit, a separator, the `Height` axis label, and two range values. Only
/// the force unit carries information, and only when it differs from what
/// the document's own header already implies; the rest is fixed-format
/// filler the encoder regenerates. A command code appearing early ends the
/// block so a truncated header cannot swallow a real step.
fn read_marker_block(
    tokens: &[Token],
    marker: usize,
    table: &SchemaTable,
    out: &mut DecodeOutput,
) -> usize {
    let mut i = marker + 1;
    let block_end = (marker + 1 + 5).min(tokens.len());
    if let Some(first) = tokens.get(i) {
        // Bare unit words share the command-like shape, so only a known
        // command code disqualifies the cell.
        if !table.is_known(&first.value)
            && first.value != super::encode::default_force_unit(&out.document.metadata)
        {
            out.document.metadata.insert("Force Unit", &first.value);
        }
    }
    while i < block_end {
        if table.is_known(&tokens[i].value) {
            break;
        }
        i += 1;
    }
    i
}

/// Step pass: table-driven assembly. Known command codes open a step and
/// consume operands positionally by declared role; surplus operands before
/// the next command are classified heuristically. Unknown but command-like
/// tokens get a generic capture bounded to a short look-ahead.
fn read_steps(tokens: &[Token], table: &SchemaTable, out: &mut DecodeOutput) {
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];

        if let Some(entry) = table.entry(&token.value) {
            let mut step = Step::new(&token.value);
            i += 1;
            let mut truncated = false;
            for role in &entry.roles {
                match tokens.get(i) {
                    Some(operand) if !table.is_known(&operand.value) => {
                        assign_role(&mut step, *role, &operand.value);
                        i += 1;
                    }
                    _ => {
                        truncated = true;
                        break;
                    }
                }
            }
            if truncated {
                if step.description.is_empty() {
                    step.description = entry.description.to_string();
                }
                out.diagnostics.push(
                    Diagnostic::warn(
                        codes::RECON_TRUNCATED_STEP,
                        format!(
                            "step `{}` ended before all of its {} operand cells were found",
                            entry.code,
                            entry.roles.len()
                        ),
                    )
                    .with_span(span_of(token)),
                );
            }
            // Surplus operands belonging to this step.
            while let Some(extra) = tokens.get(i) {
                if ends_operand_run(&extra.value, table) {
                    break;
                }
                attach_surplus(&mut step, extra, out);
                i += 1;
            }
            out.document.steps.push(step);
        } else if is_command_like(&token.value) {
            out.diagnostics.push(
                Diagnostic::warn(
                    codes::RECON_UNKNOWN_COMMAND,
                    format!("unknown command code `{}`; captured generically", token.value),
                )
                .with_context(context_for(token)),
            );
            let mut step = Step::new(&token.value);
            i += 1;
            if let Some(desc) = tokens.get(i) {
                if !table.is_known(&desc.value) && !is_command_like(&desc.value) {
                    step.description = desc.value.clone();
                    i += 1;
                }
            }
            let mut taken = 0;
            while taken < LOOKAHEAD {
                let Some(operand) = tokens.get(i) else { break };
                if ends_operand_run(&operand.value, table) {
                    break;
                }
                attach_surplus(&mut step, operand, out);
                i += 1;
                taken += 1;
            }
            if step.description.is_empty() {
                step.description = step.cmd.clone();
            }
            out.document.steps.push(step);
        } else {
            // A stray cell with no step to belong to.
            out.diagnostics.push(
                Diagnostic::info(
                    codes::RECON_AMBIGUOUS_OPERAND,
                    format!("cell `{}` precedes any command and was skipped", token.value),
                )
                .with_span(span_of(token)),
            );
            i += 1;
        }
    }
}

fn assign_role(step: &mut Step, role: OperandRole, value: &str) {
    let slot = step.column_mut(role.column());
    if slot.is_empty() {
        *slot = value.to_string();
    } else {
        step.extra.push(value.to_string());
    }
}

/// Route an operand the schema did not ask for. The classifier decides the
/// column; an occupied column or an unclassifiable value lands in `extra`.
fn attach_surplus(step: &mut Step, token: &Token, out: &mut DecodeOutput) {
    let column = match classify(&token.value) {
        OperandClass::Condition => Some(Column::Condition),
        OperandClass::Unit => Some(Column::Unit),
        OperandClass::Tolerance => Some(Column::Tolerance),
        OperandClass::Unclassified => None,
    };
    match column {
        Some(column) if step.column(column).is_empty() => {
            *step.column_mut(column) = token.value.clone();
        }
        _ => {
            out.diagnostics.push(
                Diagnostic::warn(
                    codes::RECON_AMBIGUOUS_OPERAND,
                    format!(
                        "operand `{}` could not be placed for step `{}`; kept in Extra",
                        token.value, step.cmd
                    ),
                )
                .with_span(span_of(token)),
            );
            step.extra.push(token.value.clone());
        }
    }
}

fn context_for(token: &Token) -> BTreeMap<String, String> {
    let mut context = BTreeMap::new();
    context.insert("offset".to_string(), token.offset.to_string());
    context.insert("value".to_string(), token.value.clone());
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use sft_toolchain_schema::builtin;

    fn toks(values: &[&str]) -> Vec<Token> {
        let mut offset = 0;
        values
            .iter()
            .map(|v| {
                let t = Token {
                    offset,
                    length: v.len(),
                    value: (*v).to_string(),
                };
                offset += 4 + v.len();
                t
            })
            .collect()
    }

    #[test]
    fn empty_stream_is_fatal() {
        assert!(matches!(
            reconstruct(&[], builtin()),
            Err(DecodeError::EmptyTokenStream)
        ));
    }

    #[test]
    fn header_triplets_with_separator_and_unit() {
        let tokens = toks(&[
            "Part Number",
            "--",
            "C-SPRING-10",
            "Free Length",
            "mm",
            "120",
        ]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert_eq!(out.document.metadata.get("Part Number"), Some("C-SPRING-10"));
        assert_eq!(out.document.metadata.get("Free Length"), Some("120 mm"));
        assert!(out
            .diagnostics
            .iter()
            .all(|d| d.id != codes::RECON_MISSING_SEPARATOR));
    }

    #[test]
    fn missing_separator_recovered_by_lookahead() {
        let tokens = toks(&["Part Number", "C-SPRING-10"]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert_eq!(out.document.metadata.get("Part Number"), Some("C-SPRING-10"));
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.id == codes::RECON_MISSING_SEPARATOR));
    }

    #[test]
    fn stray_cell_before_header_triplet_is_skipped() {
        let tokens = toks(&["1", "Part Number", "--", "C-SPRING-10"]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert_eq!(out.document.metadata.get("Part Number"), Some("C-SPRING-10"));
        assert!(out.document.metadata.get("1").is_none());
    }

    #[test]
    fn missing_marker_is_diagnosed_not_fatal() {
        let tokens = toks(&["Part Number", "--", "X"]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert!(out.document.steps.is_empty());
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.id == codes::RECON_MISSING_SEQUENCE_MARKER));
    }

    #[test]
    fn marker_block_keeps_only_informative_force_unit() {
        let tokens = toks(&[
            "Part Number",
            "--",
            "X",
            "<Test Sequence>",
            "kgf",
            "--",
            "Height",
            "300",
            "800",
            "ZF",
            "Zero Force",
        ]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert_eq!(out.document.metadata.get("Force Unit"), Some("kgf"));
        assert_eq!(out.document.steps.len(), 1);
        assert_eq!(out.document.steps[0].cmd, "ZF");
        assert_eq!(out.document.steps[0].description, "Zero Force");

        // A force unit the header already implies adds nothing.
        let tokens = toks(&[
            "Part Number",
            "--",
            "X",
            "<Test Sequence>",
            "N",
            "--",
            "Height",
            "300",
            "100",
        ]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert!(out.document.metadata.get("Force Unit").is_none());
    }

    #[test]
    fn steps_assembled_by_declared_roles() {
        let tokens = toks(&[
            "<Test Sequence>",
            "N",
            "--",
            "Height",
            "300",
            "100",
            "TH",
            "Search Contact",
            "10",
            "N",
            "10",
            "FL(P)",
            "Measure Free Length",
            "mm",
            "120(119,121)",
        ]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert_eq!(out.document.steps.len(), 2);
        let th = &out.document.steps[0];
        assert_eq!(th.cmd, "TH");
        assert_eq!(th.description, "Search Contact");
        assert_eq!(th.condition, "10");
        assert_eq!(th.unit, "N");
        assert_eq!(th.tolerance, "10");
        let fl = &out.document.steps[1];
        assert_eq!(fl.unit, "mm");
        assert_eq!(fl.tolerance, "120(119,121)");
    }

    #[test]
    fn truncated_step_gets_fallback_description_and_warning() {
        let tokens = toks(&["<Test Sequence>", "N", "--", "Height", "300", "100", "ZF"]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert_eq!(out.document.steps.len(), 1);
        assert_eq!(out.document.steps[0].description, "Zero Force");
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.id == codes::RECON_TRUNCATED_STEP));
    }

    #[test]
    fn unknown_command_captured_generically() {
        let tokens = toks(&[
            "<Test Sequence>",
            "N",
            "--",
            "Height",
            "300",
            "100",
            "Qz(X)",
            "Mystery Step",
            "42",
            "mm",
        ]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert_eq!(out.document.steps.len(), 1);
        let step = &out.document.steps[0];
        assert_eq!(step.cmd, "Qz(X)");
        assert_eq!(step.description, "Mystery Step");
        assert_eq!(step.condition, "42");
        assert_eq!(step.unit, "mm");
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.id == codes::RECON_UNKNOWN_COMMAND));
    }

    #[test]
    fn surplus_operand_routed_by_classifier() {
        // ZF declares only a description; the trailing number must land in
        // Condition via the heuristic layer.
        let tokens = toks(&[
            "<Test Sequence>",
            "N",
            "--",
            "Height",
            "300",
            "100",
            "ZF",
            "Zero Force",
            "5",
        ]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert_eq!(out.document.steps[0].condition, "5");
    }

    #[test]
    fn unplaceable_surplus_lands_in_extra_with_diagnostic() {
        let tokens = toks(&[
            "<Test Sequence>",
            "N",
            "--",
            "Height",
            "300",
            "100",
            "ZF",
            "Zero Force",
            "not a thing",
        ]);
        let out = reconstruct(&tokens, builtin()).unwrap();
        assert_eq!(out.document.steps[0].extra, ["not a thing"]);
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.id == codes::RECON_AMBIGUOUS_OPERAND));
    }

    #[test]
    fn command_like_shapes() {
        assert!(is_command_like("ZF"));
        assert!(is_command_like("Scrag"));
        assert!(is_command_like("Mv(P)"));
        assert!(!is_command_like("Zero Force"));
        assert!(!is_command_like("(P)"));
        assert!(!is_command_like("Mv()"));
        assert!(!is_command_like("120"));
        assert!(!is_command_like(""));
    }
}
