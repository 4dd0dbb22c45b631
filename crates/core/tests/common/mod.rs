use sft_toolchain_core::{Document, Metadata, Step, MAGIC_HEADER};

/// One length-prefixed string cell.
pub fn cell(value: &str) -> Vec<u8> {
    let mut out = (value.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(value.as_bytes());
    out
}

/// The reference compression-spring program: three header fields, a zero
/// step, and a contact-search step.
pub fn reference_document() -> Document {
    let mut metadata = Metadata::new();
    metadata.insert("Part Number", "C-SPRING");
    metadata.insert("Model Number", "2022");
    metadata.insert("Free Length", "120 mm");

    let mut zf = Step::new("ZF");
    zf.description = "Zero Force".to_string();

    let mut th = Step::new("TH");
    th.description = "Search Contact".to_string();
    th.condition = "1.12".to_string();
    th.unit = "lbf".to_string();
    th.tolerance = "100".to_string();

    Document {
        metadata,
        steps: vec![zf, th],
    }
}

/// The byte-exact binary layout of [`reference_document`], built by hand
/// from the wire format definition rather than by the encoder.
pub fn reference_bytes() -> Vec<u8> {
    let mut bytes = MAGIC_HEADER.to_vec();
    for value in ["Part Number", "--", "C-SPRING"] {
        bytes.extend(cell(value));
    }
    for value in ["Model Number", "--", "2022"] {
        bytes.extend(cell(value));
    }
    for value in ["Free Length", "mm", "120"] {
        bytes.extend(cell(value));
    }
    for value in ["<Test Sequence>", "N", "--", "Height", "300", "100"] {
        bytes.extend(cell(value));
    }
    bytes.extend(cell("ZF"));
    bytes.extend(cell("Zero Force"));
    bytes.extend([0u8; 16]);
    for value in ["TH", "Search Contact", "1.12", "lbf", "100"] {
        bytes.extend(cell(value));
    }
    bytes
}
