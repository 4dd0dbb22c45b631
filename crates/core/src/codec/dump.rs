//! JSON projection of documents and decode reports.

use super::document::Document;
use super::reconstruct::DecodeOutput;

/// Pretty-printed JSON for a document, newline-terminated.
pub fn document_to_json(document: &Document) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(document)?;
    json.push('\n');
    Ok(json)
}

/// Parse a document from its JSON form. Row labels, if present, are
/// accepted and discarded.
pub fn document_from_json(source: &str) -> serde_json::Result<Document> {
    serde_json::from_str(source)
}

/// Pretty-printed JSON for a full decode report, document and diagnostics
/// together, newline-terminated.
pub fn report_to_json(output: &DecodeOutput) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(output)?;
    json.push('\n');
    Ok(json)
}
