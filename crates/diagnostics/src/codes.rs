//! Stable diagnostic ID constants for the sft-toolchain.
//!
//! IDs are grouped by pipeline stage: `SFT10xx` scanner, `SFT11xx`
//! reconstructor, `SFT12xx` encoder, `SFT13xx` text-mode grammar.

/// No length-prefixed tokens were recovered from the buffer.
pub const SCAN_EMPTY_TOKEN_STREAM: &str = "SFT1001";
/// The fixed 13-byte magic header did not match the expected bytes.
pub const SCAN_HEADER_MISMATCH: &str = "SFT1002";

/// A command code with no schema entry was captured generically.
pub const RECON_UNKNOWN_COMMAND: &str = "SFT1101";
/// An operand token could not be classified and was left unassigned.
pub const RECON_AMBIGUOUS_OPERAND: &str = "SFT1102";
/// A metadata label's separator token was missing; the value was recovered
/// by bounded look-ahead.
pub const RECON_MISSING_SEPARATOR: &str = "SFT1103";
/// The `<Test Sequence>` marker was not found in the token stream.
pub const RECON_MISSING_SEQUENCE_MARKER: &str = "SFT1104";
/// The token stream ended before a step's declared operand roles were filled.
pub const RECON_TRUNCATED_STEP: &str = "SFT1105";

/// A document value cannot be represented as a valid string cell.
pub const ENCODE_UNREPRESENTABLE_VALUE: &str = "SFT1201";

/// A test-sequence line did not match the `CMD - Description: params` shape.
pub const TEXT_INVALID_LINE: &str = "SFT1301";
/// No metadata or steps could be recovered from the text-mode grammar.
pub const TEXT_EMPTY_DOCUMENT: &str = "SFT1302";
