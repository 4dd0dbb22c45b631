//! Text-mode variant — the line-oriented sibling of the binary codec.
//!
//! Some captures arrive already flattened to text by earlier tooling. The
//! grammar is `Key: Value` header lines, a `--- Test Sequence ---` divider,
//! and `CMD - Description: params` step lines. [`reconstruct_text`] reads
//! it, [`emit_text`] writes it, and the two round-trip through the same
//! [`Document`] the binary codec uses.

use sft_toolchain_diagnostics::{codes, Diagnostic, Span};
use sft_toolchain_schema::SchemaTable;

use super::classify::{classify, OperandClass};
use super::document::{Document, Step};
use super::reconstruct::DecodeOutput;

/// Divider between header lines and step lines.
pub const TEXT_SEQUENCE_MARKER: &str = "--- Test Sequence ---";

/// Unit words accepted in trailing position, `"10 N"` style. `Sec` appears
/// capitalized in legacy text exports, so both spellings are recognized.
const TRAILING_UNITS: [&str; 5] = ["mm", "sec", "Sec", "N", "kgf"];

/// Parse a text-form capture into a document.
///
/// Never fails; unparseable lines become diagnostics and are skipped, and a
/// source that yields nothing at all is reported with an info diagnostic so
/// the caller can decide whether that is fatal.
pub fn reconstruct_text(source: &str, table: &SchemaTable) -> DecodeOutput {
    let mut out = DecodeOutput::default();
    let mut in_sequence = false;
    let mut offset = 0;

    for raw_line in source.split('\n') {
        let line_start = offset;
        offset += raw_line.len() + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let span = Span::new(line_start, line_start + raw_line.len());

        if line == TEXT_SEQUENCE_MARKER {
            in_sequence = true;
            continue;
        }

        if !in_sequence {
            match line.split_once(':') {
                Some((key, value)) => {
                    out.document.metadata.insert(key.trim(), value.trim());
                }
                None => {
                    out.diagnostics.push(
                        Diagnostic::warn(
                            codes::TEXT_INVALID_LINE,
                            format!("header line has no `:` separator: `{line}`"),
                        )
                        .with_span(span),
                    );
                }
            }
        } else {
            match parse_step_line(line, table) {
                Some(step) => out.document.steps.push(step),
                None => {
                    out.diagnostics.push(
                        Diagnostic::warn(
                            codes::TEXT_INVALID_LINE,
                            format!("step line is not in `CMD - Description` form: `{line}`"),
                        )
                        .with_span(span),
                    );
                }
            }
        }
    }

    if out.document.metadata.is_empty() && out.document.steps.is_empty() {
        out.diagnostics.push(Diagnostic::info(
            codes::TEXT_EMPTY_DOCUMENT,
            "text reading produced no header fields and no steps",
        ));
    }

    out
}

fn parse_step_line(line: &str, table: &SchemaTable) -> Option<Step> {
    // Trimming turns an empty-description line like `ZF - ` into `ZF -`.
    let (cmd, rest) = match line.split_once(" - ") {
        Some(parts) => parts,
        None => (line.strip_suffix(" -")?, ""),
    };
    let mut step = Step::new(cmd.trim());

    let (description, params) = match rest.split_once(':') {
        Some((description, params)) => (description.trim(), Some(params.trim())),
        None => (rest.trim(), None),
    };
    step.description = description.to_string();
    if step.description.is_empty() {
        if let Some(entry) = table.entry(&step.cmd) {
            step.description = entry.description.to_string();
        }
    }

    if let Some(params) = params {
        for param in split_params(params) {
            place_param(&mut step, param.trim());
        }
    }
    Some(step)
}

/// Split a parameter list at top-level `", "` only. The legacy exporter
/// always wrote comma-space between parameters, so a bare comma belongs to
/// the value itself — tolerance pairs like `120(119,121)` and loop specs
/// like `R04,3` stay whole.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in params.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 && params.as_bytes().get(i + 1) == Some(&b' ') => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts
}

/// Route one parameter into the step. Labelled forms win, then the trailing
/// unit form, then the shape heuristics; anything with nowhere to go keeps
/// its text in `extra`.
fn place_param(step: &mut Step, param: &str) {
    if param.is_empty() {
        return;
    }
    if let Some(value) = param.strip_prefix("Value:").or_else(|| param.strip_prefix("Target:")) {
        fill(&mut step.tolerance, value.trim(), &mut step.extra);
        return;
    }
    if let Some(value) = param.strip_prefix("Speed:") {
        fill(&mut step.speed, value.trim(), &mut step.extra);
        return;
    }
    if let Some((value, unit)) = param.rsplit_once(' ') {
        if TRAILING_UNITS.contains(&unit) && !value.trim().is_empty() {
            fill(&mut step.condition, value.trim(), &mut step.extra);
            fill(&mut step.unit, unit, &mut step.extra);
            return;
        }
    }
    match classify(param) {
        OperandClass::Unit => fill(&mut step.unit, param, &mut step.extra),
        OperandClass::Tolerance => fill(&mut step.tolerance, param, &mut step.extra),
        OperandClass::Condition | OperandClass::Unclassified => {
            fill(&mut step.condition, param, &mut step.extra);
        }
    }
}

fn fill(slot: &mut String, value: &str, extra: &mut Vec<String>) {
    if slot.is_empty() {
        *slot = value.to_string();
    } else {
        extra.push(value.to_string());
    }
}

/// Render a document in the text grammar. The output is accepted back by
/// [`reconstruct_text`], and by the legacy tooling that consumes this form.
pub fn emit_text(document: &Document) -> String {
    let mut out = String::new();
    for (key, value) in document.metadata.iter() {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(TEXT_SEQUENCE_MARKER);
    out.push('\n');

    for step in &document.steps {
        out.push_str(&step.cmd);
        out.push_str(" - ");
        out.push_str(&step.description);

        let mut params = Vec::new();
        match (step.condition.is_empty(), step.unit.is_empty()) {
            (false, false) => params.push(format!("{} {}", step.condition, step.unit)),
            (false, true) => params.push(step.condition.clone()),
            (true, false) => params.push(step.unit.clone()),
            (true, true) => {}
        }
        if !step.tolerance.is_empty() {
            params.push(format!("Value: {}", step.tolerance));
        }
        if !step.speed.is_empty() {
            params.push(format!("Speed: {}", step.speed));
        }
        params.extend(step.extra.iter().cloned());

        if !params.is_empty() {
            out.push_str(": ");
            out.push_str(&params.join(", "));
        }
        out.push('\n');
    }
    out
}
