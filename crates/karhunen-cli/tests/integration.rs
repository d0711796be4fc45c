//! Integration tests for karhunen-cli.
//!
//! Drives the built binary end to end: signal generation, transform with all
//! three outputs, settings files, and file inspection.

use karhunen_io::{RecordKind, read_iq_wav, read_record_file};
use std::process::Command;
use tempfile::TempDir;

/// Helper to get the path to the `karhunen` binary built by cargo.
fn karhunen_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_karhunen"))
}

fn run_ok(cmd: &mut Command) -> String {
    let output = cmd.output().expect("failed to run karhunen");
    assert!(
        output.status.success(),
        "karhunen failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn help_lists_subcommands() {
    let stdout = run_ok(karhunen_bin().arg("--help"));
    for sub in ["transform", "generate", "info"] {
        assert!(stdout.contains(sub), "help should mention '{sub}'");
    }
}

#[test]
fn generate_tone_writes_iq_wav() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("tone.wav");
    run_ok(karhunen_bin().args([
        "generate",
        "tone",
        wav.to_str().unwrap(),
        "--freq",
        "-250",
        "--duration",
        "0.1",
        "--sample-rate",
        "8000",
    ]));
    let (samples, rate) = read_iq_wav(&wav).unwrap();
    assert_eq!(rate, 8000);
    assert_eq!(samples.len(), 800);
}

#[test]
fn transform_writes_aligned_records() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("chirp.wav");
    run_ok(karhunen_bin().args([
        "generate",
        "chirp",
        wav.to_str().unwrap(),
        "--duration",
        "0.05",
        "--sample-rate",
        "8000",
    ]));

    let eig = dir.path().join("eig.rec");
    let coeff = dir.path().join("coeff.rec");
    let basis = dir.path().join("basis.rec");
    let stdout = run_ok(karhunen_bin().args([
        "transform",
        wav.to_str().unwrap(),
        "--window-length",
        "64",
        "--input-overlap",
        "0.5",
        "--order",
        "8",
        "--num-eigen",
        "3",
        "--window",
        "--normalize",
        "--quiet",
        "--eigenvalues",
        eig.to_str().unwrap(),
        "--coefficients",
        coeff.to_str().unwrap(),
        "--basis",
        basis.to_str().unwrap(),
    ]));
    // 400 samples at stride 32
    assert!(stdout.contains("Transformed 13 block(s)"), "got: {stdout}");

    let eig = read_record_file(&eig).unwrap();
    let coeff = read_record_file(&coeff).unwrap();
    let basis = read_record_file(&basis).unwrap();
    assert_eq!(eig.layout.kind, RecordKind::Eigenvalues);
    assert_eq!(eig.rows.len(), 13);
    assert_eq!(coeff.rows.len(), 13);
    assert_eq!(basis.rows.len(), 13);
    assert_eq!(eig.layout.row_width, 3);
    assert_eq!(basis.layout.row_width, 24);
    // Normalized: the top eigenvalue of each non-degenerate block is 1.
    assert!((eig.rows[0][2] - 1.0).abs() < 1e-6);
}

#[test]
fn settings_file_is_used_and_can_be_saved() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("noise.wav");
    run_ok(karhunen_bin().args([
        "generate",
        "noise",
        wav.to_str().unwrap(),
        "--duration",
        "0.01",
        "--sample-rate",
        "4000",
    ]));

    let config = dir.path().join("klt.toml");
    std::fs::write(&config, "window_length = 10\norder = 4\nnum_eigen = 2\n").unwrap();
    let saved = dir.path().join("out").join("resolved.toml");
    let eig = dir.path().join("eig.rec");
    run_ok(karhunen_bin().args([
        "transform",
        wav.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--fft",
        "--quiet",
        "--eigenvalues",
        eig.to_str().unwrap(),
        "--save-settings",
        saved.to_str().unwrap(),
    ]));

    // 40 samples, no overlap
    assert_eq!(read_record_file(&eig).unwrap().rows.len(), 4);
    let resolved = karhunen_config::KltSettings::load(&saved).unwrap();
    assert_eq!(resolved.window_length, 10);
    assert_eq!(resolved.autocorrelation, karhunen_config::Estimator::Fft);
}

#[test]
fn info_describes_record_and_wav() {
    let dir = TempDir::new().unwrap();
    let wav = dir.path().join("tone.wav");
    run_ok(karhunen_bin().args([
        "generate",
        "tone",
        wav.to_str().unwrap(),
        "--duration",
        "0.02",
        "--sample-rate",
        "1000",
    ]));
    let stdout = run_ok(karhunen_bin().args(["info", wav.to_str().unwrap()]));
    assert!(stdout.contains("Frames: 20"), "got: {stdout}");

    let coeff = dir.path().join("coeff.rec");
    run_ok(karhunen_bin().args([
        "transform",
        wav.to_str().unwrap(),
        "-l",
        "8",
        "-o",
        "4",
        "-q",
        "--coefficients",
        coeff.to_str().unwrap(),
    ]));
    let stdout = run_ok(karhunen_bin().args(["info", coeff.to_str().unwrap()]));
    assert!(stdout.contains("Coefficients record"), "got: {stdout}");
    assert!(stdout.contains("Rows: 3"), "got: {stdout}");
}

#[test]
fn missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let output = karhunen_bin()
        .args(["transform", dir.path().join("absent.wav").to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
