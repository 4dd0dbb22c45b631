//! Codec for the length-prefixed binary test-program files written by
//! spring-force test equipment, plus the line-oriented text form some of
//! those files were flattened into by earlier tooling.
//!
//! The pipeline is scanner → reconstructor → [`Document`] in one direction
//! and [`Document`] → encoder in the other, with the command schema table
//! (`sft_toolchain_schema`) as the single source of truth for both. See
//! [`codec::decode`] for the usual entry point.

pub mod codec;

pub use codec::{
    classify, decode, emit_text, encode, encode_with_config, reconstruct, reconstruct_text, scan,
    scan_with_config, DecodeError, DecodeOutput, Document, EncodeError, Metadata, OperandClass,
    ScanConfig, Step, Token, MAGIC_HEADER,
};
