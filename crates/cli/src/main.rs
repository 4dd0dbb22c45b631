mod render;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use sft_toolchain_core::codec::dump::{document_from_json, document_to_json};
use sft_toolchain_core::{
    decode, emit_text, encode_with_config, reconstruct_text, DecodeOutput, Document, ScanConfig,
};
use sft_toolchain_diagnostics::{self as diag, Diagnostic, Severity};
use sft_toolchain_schema::{builtin, SchemaTable};

use crate::render::{print_summary, render_diagnostics, Format};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sft",
    version,
    about = "sft-toolchain — decode, encode, and batch-convert spring-force tester binary files"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Decode a tester binary (or flattened text file) into a document.
    Decode {
        file: String,
        /// Document rendering written to stdout or --out.
        #[arg(long, value_enum, default_value_t = DocFormat::Json)]
        format: DocFormat,
        /// Maximum accepted string-cell length in bytes.
        #[arg(long, default_value_t = 100)]
        max_string_len: usize,
        /// Path to a command schema table JSON. Defaults to the built-in
        /// vocabulary.
        #[arg(long)]
        schema: Option<String>,
        /// Write the document here instead of stdout.
        #[arg(long, short)]
        out: Option<String>,
    },

    /// Encode a document (JSON or text form) into a tester binary.
    Encode {
        file: String,
        /// Path to a command schema table JSON (see `decode --help`).
        #[arg(long)]
        schema: Option<String>,
        /// Output path. Defaults to the input with a `.bin` extension.
        #[arg(long, short)]
        out: Option<String>,
    },

    /// Decode, re-encode, and re-decode a binary, and verify the document
    /// survives unchanged.
    Roundtrip {
        file: String,
        /// Maximum accepted string-cell length in bytes.
        #[arg(long, default_value_t = 100)]
        max_string_len: usize,
        /// Path to a command schema table JSON (see `decode --help`).
        #[arg(long)]
        schema: Option<String>,
    },

    /// Decode every file under the given paths to JSON, in parallel.
    Batch {
        /// Input files or directories.
        inputs: Vec<String>,
        /// Directory the per-file JSON documents are written to.
        #[arg(long, short, default_value = "decoded")]
        out: String,
        /// Descend into subdirectories.
        #[arg(long, short)]
        recursive: bool,
        /// Worker thread count. Defaults to the number of CPUs.
        #[arg(long, short)]
        jobs: Option<usize>,
        /// Path to a command schema table JSON (see `decode --help`).
        #[arg(long)]
        schema: Option<String>,
    },

    /// Explain a diagnostic ID (e.g. SFT1101).
    Explain { id: String },
}

/// Document rendering for the `decode` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DocFormat {
    /// The JSON document export.
    Json,
    /// The line-oriented text grammar.
    Text,
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match cli.cmd {
        Cmd::Decode {
            file,
            format: doc_format,
            max_string_len,
            schema,
            out,
        } => cmd_decode(
            &file,
            doc_format,
            max_string_len,
            schema.as_deref(),
            out.as_deref(),
            format,
        )?,
        Cmd::Encode { file, schema, out } => {
            cmd_encode(&file, schema.as_deref(), out.as_deref(), format)?
        }
        Cmd::Roundtrip {
            file,
            max_string_len,
            schema,
        } => cmd_roundtrip(&file, max_string_len, schema.as_deref(), format)?,
        Cmd::Batch {
            inputs,
            out,
            recursive,
            jobs,
            schema,
        } => cmd_batch(&inputs, &out, recursive, jobs, schema.as_deref(), format)?,
        Cmd::Explain { id } => cmd_explain(&id, format)?,
    }

    Ok(())
}

// ── Commands ────────────────────────────────────────────────────────────

fn cmd_decode(
    file: &str,
    doc_format: DocFormat,
    max_string_len: usize,
    schema_path: Option<&str>,
    out: Option<&str>,
    format: Format,
) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("failed to read '{file}'"))?;
    let table = resolve_table(schema_path)?;
    let config = ScanConfig { max_string_len };

    let res = decode(&bytes, table.as_ref(), &config)
        .with_context(|| format!("failed to decode '{file}'"))?;

    let rendered = render_document(&res.document, doc_format)?;

    match (out, format) {
        (Some(path), _) => {
            fs::write(path, rendered).with_context(|| format!("failed to write '{path}'"))?;
            report_diagnostics(&bytes, file, &res, format);
        }
        (None, Format::Json) => {
            // Single valid JSON object to stdout.
            let out = serde_json::json!({
                "document": res.document,
                "diagnostics": res.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        (None, Format::Pretty) => {
            // Document to stdout, diagnostics to stderr.
            print!("{rendered}");
            report_diagnostics(&bytes, file, &res, format);
        }
    }

    exit_on_errors(&res.diagnostics);
    Ok(())
}

fn cmd_encode(
    file: &str,
    schema_path: Option<&str>,
    out: Option<&str>,
    format: Format,
) -> Result<()> {
    let raw = fs::read(file).with_context(|| format!("failed to read '{file}'"))?;
    let table = resolve_table(schema_path)?;

    let document = read_document(&raw, file, table.as_ref(), format)?;
    let bytes = encode_with_config(&document, table.as_ref(), &ScanConfig::default())
        .with_context(|| format!("failed to encode '{file}'"))?;

    let out_path = match out {
        Some(path) => PathBuf::from(path),
        None => Path::new(file).with_extension("bin"),
    };
    fs::write(&out_path, &bytes)
        .with_context(|| format!("failed to write '{}'", out_path.display()))?;

    match format {
        Format::Json => {
            let out = serde_json::json!({
                "status": "encoded",
                "file": file,
                "out": out_path.display().to_string(),
                "bytes": bytes.len(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            eprintln!("encoded: {} -> {} ({} bytes)", file, out_path.display(), bytes.len());
        }
    }
    Ok(())
}

fn cmd_roundtrip(
    file: &str,
    max_string_len: usize,
    schema_path: Option<&str>,
    format: Format,
) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("failed to read '{file}'"))?;
    let table = resolve_table(schema_path)?;
    let config = ScanConfig { max_string_len };

    let first = decode(&bytes, table.as_ref(), &config)
        .with_context(|| format!("failed to decode '{file}'"))?;
    let re_encoded = encode_with_config(&first.document, table.as_ref(), &config)
        .with_context(|| format!("document from '{file}' cannot be re-encoded"))?;
    let second = decode(&re_encoded, table.as_ref(), &config)
        .context("re-encoded bytes failed to decode")?;

    let document_stable = first.document == second.document;
    let byte_identical = bytes == re_encoded;

    match format {
        Format::Json => {
            let out = serde_json::json!({
                "ok": document_stable,
                "byte_identical": byte_identical,
                "diagnostics": first.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            report_diagnostics(&bytes, file, &first, format);
            if document_stable {
                eprintln!("round trip ok");
            } else {
                eprintln!("round trip FAILED: document changed across re-encode");
            }
            if byte_identical {
                eprintln!("re-encoded bytes are identical to the input");
            } else {
                eprintln!("re-encoded bytes differ from the input (non-canonical source layout)");
            }
        }
    }

    if !document_stable {
        process::exit(1);
    }
    exit_on_errors(&first.diagnostics);
    Ok(())
}

fn cmd_batch(
    inputs: &[String],
    out_dir: &str,
    recursive: bool,
    jobs: Option<usize>,
    schema_path: Option<&str>,
    format: Format,
) -> Result<()> {
    if inputs.is_empty() {
        bail!("no input files or directories given");
    }
    let table = resolve_table(schema_path)?;

    let mut files = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            collect_files(path, recursive, &mut files)
                .with_context(|| format!("failed to list '{input}'"))?;
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            bail!("'{input}' does not exist");
        }
    }
    files.sort();

    fs::create_dir_all(out_dir).with_context(|| format!("failed to create '{out_dir}'"))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.unwrap_or(0))
        .build()
        .context("failed to build worker pool")?;

    // One file per task; a failure is recorded in the tally and never
    // aborts its siblings.
    let results: Vec<(PathBuf, Result<(), String>)> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let result = batch_one(path, out_dir, table.as_ref());
                (path.clone(), result.map_err(|e| format!("{e:#}")))
            })
            .collect()
    });

    let failures: Vec<_> = results.iter().filter(|(_, r)| r.is_err()).collect();
    let succeeded = results.len() - failures.len();

    match format {
        Format::Json => {
            let out = serde_json::json!({
                "processed": results.len(),
                "succeeded": succeeded,
                "failed": failures.len(),
                "failures": failures
                    .iter()
                    .map(|(path, r)| serde_json::json!({
                        "file": path.display().to_string(),
                        "error": r.as_ref().err(),
                    }))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            for (path, result) in &results {
                if let Err(err) = result {
                    eprintln!("failed: {}: {}", path.display(), err);
                }
            }
            eprintln!(
                "processed {} files: {} successful, {} failed",
                results.len(),
                succeeded,
                failures.len()
            );
        }
    }

    if !failures.is_empty() {
        process::exit(1);
    }
    Ok(())
}

/// Decode one batch input to `<out_dir>/<file name>.json`.
fn batch_one(path: &Path, out_dir: &str, table: &SchemaTable) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    let res = decode(&bytes, table, &ScanConfig::default())
        .with_context(|| format!("failed to decode '{}'", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let out_path = Path::new(out_dir).join(format!("{file_name}.json"));
    fs::write(&out_path, document_to_json(&res.document)?)
        .with_context(|| format!("failed to write '{}'", out_path.display()))?;
    Ok(())
}

fn cmd_explain(id: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let text = diag::explain(id);
            let out = serde_json::json!({
                "id": id,
                "explanation": text,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            // Explanation is the expected output — write to stdout, not stderr.
            if let Some(text) = diag::explain(id) {
                use ariadne::Fmt;
                println!("{}: {}", id.fg(ariadne::Color::Cyan), text);
            } else {
                println!("{}: (no explanation available)", id);
            }
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Exit with code 1 if any diagnostic is an error.
/// Warnings and info do not cause a non-zero exit.
fn exit_on_errors(diagnostics: &[Diagnostic]) {
    if diagnostics
        .iter()
        .any(|d| matches!(d.severity, Severity::Error))
    {
        process::exit(1);
    }
}

/// The schema table to decode and encode with: an explicit `--schema` file,
/// or the built-in vocabulary.
enum TableSource {
    Builtin,
    Loaded(SchemaTable),
}

impl TableSource {
    fn as_ref(&self) -> &SchemaTable {
        match self {
            TableSource::Builtin => builtin(),
            TableSource::Loaded(table) => table,
        }
    }
}

fn resolve_table(explicit_path: Option<&str>) -> Result<TableSource> {
    match explicit_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read schema file '{path}'"))?;
            let table = serde_json::from_str(&json)
                .with_context(|| format!("failed to parse schema file '{path}'"))?;
            Ok(TableSource::Loaded(table))
        }
        None => Ok(TableSource::Builtin),
    }
}

fn render_document(document: &Document, doc_format: DocFormat) -> Result<String> {
    Ok(match doc_format {
        DocFormat::Json => document_to_json(document)?,
        DocFormat::Text => emit_text(document),
    })
}

/// Read an encode input, which may be the JSON document export or the text
/// grammar.
fn read_document(
    raw: &[u8],
    file: &str,
    table: &SchemaTable,
    format: Format,
) -> Result<Document> {
    let source = std::str::from_utf8(raw)
        .with_context(|| format!("'{file}' is neither JSON nor UTF-8 text"))?;
    if let Ok(document) = document_from_json(source) {
        return Ok(document);
    }
    let res = reconstruct_text(source, table);
    if res.document.metadata.is_empty() && res.document.steps.is_empty() {
        bail!("'{file}' contains no recognizable document in JSON or text form");
    }
    if format == Format::Pretty {
        render_diagnostics(Some(source), file, &res.diagnostics, format);
    }
    Ok(res.document)
}

/// Render a decode's diagnostics. The text source is only offered to the
/// renderer when the text path was actually taken, so spans line up with
/// what they index.
fn report_diagnostics(bytes: &[u8], file: &str, res: &DecodeOutput, format: Format) {
    if res.diagnostics.is_empty() {
        return;
    }
    let used_text_path = res
        .diagnostics
        .iter()
        .any(|d| d.id == diag::codes::SCAN_EMPTY_TOKEN_STREAM);
    let source = if used_text_path {
        std::str::from_utf8(bytes).ok()
    } else {
        None
    };
    render_diagnostics(source, file, &res.diagnostics, format);
    if format == Format::Pretty {
        print_summary(&res.diagnostics);
    }
}

fn collect_files(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, files)?;
            }
        } else {
            files.push(path);
        }
    }
    Ok(())
}
