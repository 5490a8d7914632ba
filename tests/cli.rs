//! Exit behaviour of the headless binary.

use std::process::Command;

#[test]
fn missing_model_fails_with_a_single_error_line() {
    let output = Command::new(env!("CARGO_BIN_EXE_drowsiness-monitor"))
        .args(["-p", "/nonexistent/predictor.dat"])
        .args(["--face-detector", "/nonexistent/seeta.bin"])
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let error_lines: Vec<&str> = stderr
        .lines()
        .filter(|line| line.contains("Error") || line.contains("ERROR"))
        .collect();
    assert_eq!(error_lines.len(), 1, "stderr was:\n{stderr}");
    assert!(error_lines[0].starts_with("Error: "));
}
