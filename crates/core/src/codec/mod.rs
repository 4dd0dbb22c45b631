//! The codec: scanning, reconstruction, encoding, and the text-mode variant.
//!
//! The normal entry point is [`decode`], which runs the binary path and
//! falls back to the text grammar when the scanner finds nothing. The
//! individual passes are public for callers that want finer control, such
//! as re-running reconstruction over an already-scanned token list.

pub mod classify;
pub mod document;
pub mod dump;
pub mod encode;
pub mod reconstruct;
pub mod scan;
pub mod text;

pub use classify::{classify, OperandClass, KNOWN_UNITS};
pub use document::{row_label, Document, Metadata, Step};
pub use encode::{encode, encode_with_config, EncodeError, MAGIC_HEADER};
pub use reconstruct::{reconstruct, DecodeError, DecodeOutput, SEQUENCE_MARKER};
pub use scan::{scan, scan_with_config, ScanConfig, Token};
pub use text::{emit_text, reconstruct_text, TEXT_SEQUENCE_MARKER};

use sft_toolchain_diagnostics::{codes, Diagnostic};
use sft_toolchain_schema::SchemaTable;

/// Decode a raw capture, binary first, text grammar as the fallback.
///
/// A buffer that does not open with the expected file identifier still
/// decodes, with a compatibility warning attached. Failure is reserved for
/// input that yields nothing under either reading.
pub fn decode(
    bytes: &[u8],
    table: &SchemaTable,
    config: &ScanConfig,
) -> Result<DecodeOutput, DecodeError> {
    let mut leading = Vec::new();
    if !bytes.starts_with(&MAGIC_HEADER) {
        leading.push(Diagnostic::warn(
            codes::SCAN_HEADER_MISMATCH,
            "input does not start with the standard 13-byte file identifier",
        ));
    }

    // The file identifier's last five bytes scan as a stray one-byte cell,
    // so cells inside the identifier region are not document content.
    let mut tokens = scan_with_config(bytes, config);
    if bytes.starts_with(&MAGIC_HEADER) {
        tokens.retain(|t| t.end() > MAGIC_HEADER.len());
    }
    let mut out = match reconstruct(&tokens, table) {
        Ok(out) => out,
        Err(DecodeError::EmptyTokenStream) => {
            leading.push(Diagnostic::info(
                codes::SCAN_EMPTY_TOKEN_STREAM,
                "no string cells found; reading the input as text",
            ));
            let out = reconstruct_text(&String::from_utf8_lossy(bytes), table);
            if out.document.metadata.is_empty() && out.document.steps.is_empty() {
                return Err(DecodeError::EmptyDocument);
            }
            out
        }
        Err(other) => return Err(other),
    };

    leading.append(&mut out.diagnostics);
    out.diagnostics = leading;
    Ok(out)
}
