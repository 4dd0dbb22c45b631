//! CLI tests for `sft batch`: parallel decoding with per-file failure
//! isolation.

use std::fs;
use std::process::Command;

use assert_cmd::cargo;
use tempfile::TempDir;

fn sft_cmd() -> Command {
    Command::new(cargo::cargo_bin!("sft"))
}

fn cell(value: &str) -> Vec<u8> {
    let mut out = (value.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(value.as_bytes());
    out
}

fn sample_binary(part_number: &str) -> Vec<u8> {
    let mut bytes = vec![
        0x00, 0x00, 0x00, 0x12, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x01, 0x31,
    ];
    for value in ["Part Number", "--", part_number] {
        bytes.extend(cell(value));
    }
    for value in ["<Test Sequence>", "N", "--", "Height", "300", "100"] {
        bytes.extend(cell(value));
    }
    bytes.extend(cell("ZF"));
    bytes.extend(cell("Zero Force"));
    bytes.extend([0u8; 16]);
    bytes
}

#[test]
fn batch_decodes_a_directory_to_json_files() {
    let dir = TempDir::new().unwrap();
    let input_dir = dir.path().join("in");
    let out_dir = dir.path().join("out");
    fs::create_dir(&input_dir).unwrap();
    for name in ["a", "b", "c"] {
        fs::write(input_dir.join(name), sample_binary(&name.to_uppercase())).unwrap();
    }

    let output = sft_cmd()
        .args([
            "batch",
            input_dir.to_str().unwrap(),
            "--out",
            out_dir.to_str().unwrap(),
            "--output",
            "json",
        ])
        .output()
        .expect("run batch");

    assert!(output.status.success(), "{output:?}");
    let tally: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tally["processed"], 3);
    assert_eq!(tally["succeeded"], 3);
    assert_eq!(tally["failed"], 0);

    for name in ["a", "b", "c"] {
        let json = fs::read_to_string(out_dir.join(format!("{name}.json")))
            .expect("per-file output exists");
        let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(doc["metadata"]["Part Number"], name.to_uppercase());
    }
}

#[test]
fn corrupted_file_fails_alone() {
    let dir = TempDir::new().unwrap();
    let input_dir = dir.path().join("in");
    let out_dir = dir.path().join("out");
    fs::create_dir(&input_dir).unwrap();
    for name in ["a", "b", "d", "e"] {
        fs::write(input_dir.join(name), sample_binary(&name.to_uppercase())).unwrap();
    }
    // No recoverable string cells and no text structure either.
    fs::write(input_dir.join("c"), [0xFFu8; 32]).unwrap();

    let output = sft_cmd()
        .args([
            "batch",
            input_dir.to_str().unwrap(),
            "--out",
            out_dir.to_str().unwrap(),
            "--output",
            "json",
        ])
        .output()
        .expect("run batch");

    // The run as a whole reports failure, but only for the bad file.
    assert!(!output.status.success());
    let tally: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tally["processed"], 5);
    assert_eq!(tally["succeeded"], 4);
    assert_eq!(tally["failed"], 1);
    let failures = tally["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0]["file"]
        .as_str()
        .unwrap()
        .ends_with("c"));

    // The siblings decoded exactly as they would have alone.
    for name in ["a", "b", "d", "e"] {
        let batch_out = out_dir.join(format!("{name}.json"));
        assert!(batch_out.exists(), "missing output for {name}");

        let solo = sft_cmd()
            .args([
                "decode",
                input_dir.join(name).to_str().unwrap(),
                "--output",
                "json",
            ])
            .output()
            .expect("run decode");
        assert!(solo.status.success());
        let solo_json: serde_json::Value = serde_json::from_slice(&solo.stdout).unwrap();
        let batch_json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&batch_out).unwrap()).unwrap();
        assert_eq!(batch_json, solo_json["document"]);
    }
    assert!(!out_dir.join("c.json").exists());
}

#[test]
fn explicit_file_arguments_are_accepted() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("out");
    let input = dir.path().join("single");
    fs::write(&input, sample_binary("SOLO")).unwrap();

    let output = sft_cmd()
        .args([
            "batch",
            input.to_str().unwrap(),
            "--out",
            out_dir.to_str().unwrap(),
            "--jobs",
            "2",
            "--output",
            "json",
        ])
        .output()
        .expect("run batch");

    assert!(output.status.success(), "{output:?}");
    assert!(out_dir.join("single.json").exists());
}

#[test]
fn missing_input_is_an_error() {
    let dir = TempDir::new().unwrap();
    let output = sft_cmd()
        .args([
            "batch",
            dir.path().join("nope").to_str().unwrap(),
            "--output",
            "json",
        ])
        .output()
        .expect("run batch");
    assert!(!output.status.success());
}
