//! Encoding — serializes a [`Document`] back into the equipment's byte layout.
//!
//! The encoder is the strict half of the codec: where reconstruction absorbs
//! damage with diagnostics, encoding refuses to produce bytes the scanner
//! could not recover. Every cell it writes is checked against the scanner's
//! own acceptance predicate before it goes out.

use thiserror::Error;

use sft_toolchain_schema::SchemaTable;

use super::document::{row_label, Document, Step};
use super::reconstruct::{SEQUENCE_MARKER, TRIPLET_SEPARATOR};
use super::scan::{is_acceptable, ScanConfig};

/// File identifier written before any string cell.
pub const MAGIC_HEADER: [u8; 13] = [
    0x00, 0x00, 0x00, 0x12, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x01, 0x31,
];

/// Header fields the equipment writes first, in this order, ahead of any
/// other metadata the document carries.
const LEADING_FIELDS: [&str; 3] = ["Part Number", "Model Number", "Free Length"];

/// The force-unit slot in the marker block, not a header triplet.
const FORCE_UNIT_KEY: &str = "Force Unit";

/// Fatal encoding failures. There is no lossy mode: a document that cannot
/// be represented exactly is rejected.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A step carries a value that cannot survive as a string cell.
    #[error("step {row} ({cmd}): value `{value}` cannot be written as a string cell")]
    Unencodable {
        /// Derived row label of the offending step.
        row: String,
        /// Command code of the offending step.
        cmd: String,
        /// The rejected value.
        value: String,
    },
    /// A header field carries a value that cannot survive as a string cell.
    #[error("header field `{key}`: value `{value}` cannot be written as a string cell")]
    UnencodableMetadata {
        /// The header label.
        key: String,
        /// The rejected value.
        value: String,
    },
}

/// Encode with the default scanner configuration.
pub fn encode(document: &Document, table: &SchemaTable) -> Result<Vec<u8>, EncodeError> {
    encode_with_config(document, table, &ScanConfig::default())
}

/// Encode a document into the exact binary layout.
///
/// Layout: magic header, header triplets (leading fields first, then any
/// remaining metadata in document order), the `<Test Sequence>` marker and
/// its five-cell block, then one cell run per step followed by the step's
/// declared zero padding.
pub fn encode_with_config(
    document: &Document,
    table: &SchemaTable,
    config: &ScanConfig,
) -> Result<Vec<u8>, EncodeError> {
    let mut writer = CellWriter::new(config);
    writer.bytes.extend_from_slice(&MAGIC_HEADER);

    write_header(document, &mut writer)?;
    write_marker_block(document, &mut writer)?;
    for (index, step) in document.steps.iter().enumerate() {
        write_step(index, step, table, &mut writer)?;
    }

    Ok(writer.bytes)
}

struct CellWriter<'a> {
    bytes: Vec<u8>,
    config: &'a ScanConfig,
}

impl<'a> CellWriter<'a> {
    fn new(config: &'a ScanConfig) -> Self {
        Self {
            bytes: Vec::new(),
            config,
        }
    }

    /// Append one length-prefixed cell. The value must already have passed
    /// the acceptance check.
    fn cell_unchecked(&mut self, value: &str) {
        self.bytes
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
    }

    fn metadata_cell(&mut self, key: &str, value: &str) -> Result<(), EncodeError> {
        if !is_acceptable(value, self.config) {
            return Err(EncodeError::UnencodableMetadata {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        self.cell_unchecked(value);
        Ok(())
    }

    fn step_cell(&mut self, index: usize, step: &Step, value: &str) -> Result<(), EncodeError> {
        if !is_acceptable(value, self.config) {
            return Err(EncodeError::Unencodable {
                row: row_label(index),
                cmd: step.cmd.clone(),
                value: value.to_string(),
            });
        }
        self.cell_unchecked(value);
        Ok(())
    }

    fn padding(&mut self, count: usize) {
        self.bytes.extend(std::iter::repeat_n(0u8, count));
    }
}

fn write_header(document: &Document, writer: &mut CellWriter<'_>) -> Result<(), EncodeError> {
    for key in LEADING_FIELDS {
        if let Some(value) = document.metadata.get(key) {
            write_field(key, value, writer)?;
        }
    }
    for (key, value) in document.metadata.iter() {
        if key == FORCE_UNIT_KEY || LEADING_FIELDS.contains(&key) {
            continue;
        }
        write_field(key, value, writer)?;
    }
    Ok(())
}

/// One header triplet. `Free Length` stores its unit inside the value
/// (`"120 mm"`), and the wire format wants the unit in the separator slot,
/// so the value is split back apart here.
fn write_field(key: &str, value: &str, writer: &mut CellWriter<'_>) -> Result<(), EncodeError> {
    writer.metadata_cell(key, key)?;
    if key == "Free Length" {
        let mut parts = value.split_whitespace();
        let number = parts.next().unwrap_or(value);
        let unit = parts.next().unwrap_or("mm");
        writer.metadata_cell(key, unit)?;
        writer.metadata_cell(key, number)?;
    } else {
        writer.cell_unchecked(TRIPLET_SEPARATOR);
        writer.metadata_cell(key, value)?;
    }
    Ok(())
}

/// The force unit implied by a document that does not state one: tension
/// rigs get `kgf`, everything else `N`, keyed off the part and model fields.
/// The decoder uses the same derivation to decide whether a marker block's
/// force unit carries information worth keeping.
pub fn default_force_unit(metadata: &super::document::Metadata) -> &'static str {
    let mentions_tension = |key: &str| {
        metadata
            .get(key)
            .is_some_and(|v| v.contains("Tens") || v.contains("Tension"))
    };
    if mentions_tension("Model Number") || mentions_tension("Part Number") {
        "kgf"
    } else {
        "N"
    }
}

/// The `<Test Sequence>` marker and its fixed five-cell block. The force
/// unit comes from the document when present, otherwise from
/// [`default_force_unit`].
fn write_marker_block(document: &Document, writer: &mut CellWriter<'_>) -> Result<(), EncodeError> {
    writer.cell_unchecked(SEQUENCE_MARKER);

    let force_unit = document
        .metadata
        .get(FORCE_UNIT_KEY)
        .unwrap_or_else(|| default_force_unit(&document.metadata))
        .to_string();
    let force_range = if force_unit == "kgf" { "800" } else { "100" };

    writer.metadata_cell(FORCE_UNIT_KEY, &force_unit)?;
    writer.cell_unchecked(TRIPLET_SEPARATOR);
    writer.cell_unchecked("Height");
    writer.cell_unchecked("300");
    writer.cell_unchecked(force_range);
    Ok(())
}

fn write_step(
    index: usize,
    step: &Step,
    table: &SchemaTable,
    writer: &mut CellWriter<'_>,
) -> Result<(), EncodeError> {
    writer.step_cell(index, step, &step.cmd)?;

    match table.entry(&step.cmd) {
        Some(entry) => {
            for role in &entry.roles {
                let value = step.column(role.column());
                // An equipment export never leaves a declared cell empty
                // except the description, which has a schema default.
                if value.is_empty() && role.column() == sft_toolchain_schema::Column::Description {
                    writer.step_cell(index, step, &entry.description)?;
                } else {
                    writer.step_cell(index, step, value)?;
                }
            }
            writer.padding(entry.padding_after);
        }
        None => {
            // Best effort for a command outside the vocabulary: description
            // first, then whatever columns are populated, then the strays.
            let description = if step.description.is_empty() {
                &step.cmd
            } else {
                &step.description
            };
            writer.step_cell(index, step, description)?;
            for value in [&step.condition, &step.unit, &step.tolerance, &step.speed] {
                if !value.is_empty() {
                    writer.step_cell(index, step, value)?;
                }
            }
            for value in &step.extra {
                writer.step_cell(index, step, value)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::document::Metadata;
    use sft_toolchain_schema::builtin;

    fn cell(value: &str) -> Vec<u8> {
        let mut out = (value.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(value.as_bytes());
        out
    }

    fn minimal_doc() -> Document {
        let mut metadata = Metadata::new();
        metadata.insert("Part Number", "C-SPRING-10");
        let mut step = Step::new("ZF");
        step.description = "Zero Force".to_string();
        Document {
            metadata,
            steps: vec![step],
        }
    }

    #[test]
    fn starts_with_magic_header() {
        let bytes = encode(&minimal_doc(), builtin()).unwrap();
        assert_eq!(&bytes[..13], &MAGIC_HEADER);
    }

    #[test]
    fn header_triplet_layout() {
        let bytes = encode(&minimal_doc(), builtin()).unwrap();
        let mut expected = MAGIC_HEADER.to_vec();
        expected.extend(cell("Part Number"));
        expected.extend(cell("--"));
        expected.extend(cell("C-SPRING-10"));
        assert_eq!(&bytes[..expected.len()], &expected);
    }

    #[test]
    fn free_length_unit_split_into_separator_slot() {
        let mut doc = minimal_doc();
        doc.metadata.insert("Free Length", "120 mm");
        let bytes = encode(&doc, builtin()).unwrap();
        let mut triplet = cell("Free Length");
        triplet.extend(cell("mm"));
        triplet.extend(cell("120"));
        assert!(bytes
            .windows(triplet.len())
            .any(|w| w == triplet.as_slice()));
    }

    #[test]
    fn padded_step_gets_sixteen_zero_bytes() {
        let bytes = encode(&minimal_doc(), builtin()).unwrap();
        assert_eq!(&bytes[bytes.len() - 16..], &[0u8; 16]);
    }

    #[test]
    fn force_unit_defaults_and_tension_heuristic() {
        let bytes = encode(&minimal_doc(), builtin()).unwrap();
        let mut block = cell("<Test Sequence>");
        block.extend(cell("N"));
        block.extend(cell("--"));
        block.extend(cell("Height"));
        block.extend(cell("300"));
        block.extend(cell("100"));
        assert!(bytes.windows(block.len()).any(|w| w == block.as_slice()));

        let mut tension = minimal_doc();
        tension.metadata.insert("Model Number", "Tension-9");
        let bytes = encode(&tension, builtin()).unwrap();
        let mut block = cell("<Test Sequence>");
        block.extend(cell("kgf"));
        block.extend(cell("--"));
        block.extend(cell("Height"));
        block.extend(cell("300"));
        block.extend(cell("800"));
        assert!(bytes.windows(block.len()).any(|w| w == block.as_slice()));
    }

    #[test]
    fn explicit_force_unit_wins_over_heuristic() {
        let mut doc = minimal_doc();
        doc.metadata.insert("Model Number", "Tension-9");
        doc.metadata.insert("Force Unit", "N");
        let bytes = encode(&doc, builtin()).unwrap();
        let mut block = cell("<Test Sequence>");
        block.extend(cell("N"));
        assert!(bytes.windows(block.len()).any(|w| w == block.as_slice()));
    }

    #[test]
    fn empty_description_falls_back_to_schema() {
        let mut doc = minimal_doc();
        doc.steps[0].description.clear();
        let bytes = encode(&doc, builtin()).unwrap();
        let run = cell("Zero Force");
        assert!(bytes.windows(run.len()).any(|w| w == run.as_slice()));
    }

    #[test]
    fn empty_required_operand_is_unencodable() {
        let mut doc = minimal_doc();
        let mut th = Step::new("TH");
        th.description = "Search Contact".to_string();
        th.condition = "10".to_string();
        th.unit = "N".to_string();
        // tolerance left empty
        doc.steps.push(th);
        let err = encode(&doc, builtin()).unwrap_err();
        match err {
            EncodeError::Unencodable { row, cmd, value } => {
                assert_eq!(row, "R01");
                assert_eq!(cmd, "TH");
                assert_eq!(value, "");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_ascii_value_is_unencodable() {
        let mut doc = minimal_doc();
        doc.steps[0].description = "caf\u{e9}".to_string();
        assert!(matches!(
            encode(&doc, builtin()),
            Err(EncodeError::Unencodable { .. })
        ));
    }

    #[test]
    fn overlong_metadata_value_is_unencodable() {
        let mut doc = minimal_doc();
        doc.metadata.insert("Part Number", "x".repeat(150));
        assert!(matches!(
            encode(&doc, builtin()),
            Err(EncodeError::UnencodableMetadata { .. })
        ));
    }

    #[test]
    fn unknown_command_written_best_effort() {
        let mut doc = minimal_doc();
        let mut step = Step::new("Qz(X)");
        step.description = "Mystery Step".to_string();
        step.condition = "42".to_string();
        step.extra.push("stray".to_string());
        doc.steps.push(step);
        let bytes = encode(&doc, builtin()).unwrap();
        let mut run = cell("Qz(X)");
        run.extend(cell("Mystery Step"));
        run.extend(cell("42"));
        run.extend(cell("stray"));
        assert!(bytes.windows(run.len()).any(|w| w == run.as_slice()));
    }
}
