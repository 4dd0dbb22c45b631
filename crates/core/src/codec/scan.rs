//! Token scanner — recovers length-prefixed string cells from a raw buffer.
//!
//! The wire format carries no index or table of contents, so the scanner
//! tests *every* byte offset as a possible 4-byte big-endian length prefix.
//! This exhaustive strategy trades performance for robustness: the header
//! region of these files is undocumented and occasionally overlaps false
//! positives with real cells, and a faster indexed scan is not safe without
//! a confirmed grammar.

/// Inclusive lower bound of printable ASCII (space).
pub const PRINTABLE_MIN: u8 = 32;
/// Inclusive upper bound of printable ASCII (tilde).
pub const PRINTABLE_MAX: u8 = 126;

/// Tunable scanner parameters.
///
/// The 100-byte ceiling is an empirical constant tuned to observed captures,
/// not a documented format limit, so it is configurable rather than baked in.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// Maximum accepted cell payload length in bytes.
    pub max_string_len: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_string_len: 100,
        }
    }
}

/// A recovered string cell: 4-byte big-endian length prefix plus payload.
///
/// `offset` is the byte position of the length prefix. Tokens are produced
/// only by the scan pass and never mutated; ascending offset order is the
/// document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Byte offset of the 4-byte length prefix.
    pub offset: usize,
    /// Declared payload length in bytes.
    pub length: usize,
    /// Decoded payload text (UTF-8, replacement on error).
    pub value: String,
}

impl Token {
    /// Byte offset one past the end of the payload.
    pub fn end(&self) -> usize {
        self.offset + 4 + self.length
    }
}

/// Scan `bytes` with the default configuration.
pub fn scan(bytes: &[u8]) -> Vec<Token> {
    scan_with_config(bytes, &ScanConfig::default())
}

/// Scan `bytes` for length-prefixed string cells.
///
/// For every offset `i`, `bytes[i..i+4]` is read as a big-endian unsigned
/// length `L`. The cell is accepted iff `0 < L <= max_string_len`, the
/// payload fits in the buffer, and every payload byte is printable ASCII.
/// Scanning advances byte-by-byte even past an accepted token so that a
/// false-positive prefix cannot hide a real cell starting inside it.
///
/// Output tokens are strictly increasing in `offset` and deterministic for
/// a given input.
pub fn scan_with_config(bytes: &[u8], config: &ScanConfig) -> Vec<Token> {
    let mut tokens = Vec::new();
    if bytes.len() < 4 {
        return tokens;
    }
    for i in 0..=bytes.len() - 4 {
        let len = u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]) as usize;
        if len == 0 || len > config.max_string_len {
            continue; // malformed length: rejected, not an error
        }
        let start = i + 4;
        let Some(payload) = bytes.get(start..start + len) else {
            continue; // truncated: declared length exceeds the buffer
        };
        if !payload
            .iter()
            .all(|&b| (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&b))
        {
            continue;
        }
        tokens.push(Token {
            offset: i,
            length: len,
            value: String::from_utf8_lossy(payload).into_owned(),
        });
    }
    tokens
}

/// The scanner's acceptance predicate, applied to an outgoing value.
///
/// The encoder re-validates every cell it emits against this so that
/// anything written is guaranteed to be recoverable by [`scan_with_config`]
/// under the same configuration.
pub fn is_acceptable(value: &str, config: &ScanConfig) -> bool {
    let len = value.len();
    len >= 1
        && len <= config.max_string_len
        && value
            .bytes()
            .all(|b| (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&b))
}
