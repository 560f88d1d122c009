// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::process::Command;

const TRIANGLE: &str = "\
# Points below the main diagonal.
dims 2
seed 0.1 0.1
x0 + x1 <= 1.0
";

fn write_constraints(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("constraints.txt");
    std::fs::write(&path, TRIANGLE).unwrap();
    path
}

fn run_driver(args: &[&str]) -> std::process::Output {
    let exe = env!("CARGO_BIN_EXE_hyperwalk");
    let mut cmd = Command::new(exe);
    cmd.args(args);
    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        cmd.env("RUST_LOG", rust_log);
    }
    let output = cmd.output().expect("hyperwalk should run");
    println!("stdout: {}", String::from_utf8_lossy(&output.stdout));
    println!("stderr: {}", String::from_utf8_lossy(&output.stderr));
    output
}

#[test]
fn test_invoke_driver_generates_and_checks() {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_dir = tempfile::tempdir().unwrap();
    let constraints = write_constraints(temp_dir.path());
    let out_path = temp_dir.path().join("results.txt");

    let output = run_driver(&[
        constraints.to_str().unwrap(),
        out_path.to_str().unwrap(),
        "25",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Generating 25 points"));
    assert!(stdout.contains("Results comprised of 25 vectors written to"));
    assert!(stdout.contains(
        "Final check completed successfully. All points are within the unit hypercube and obey constraints."
    ));

    let contents = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(contents.lines().count(), 25);
}

#[test]
fn test_same_seed_gives_byte_identical_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let constraints = write_constraints(temp_dir.path());
    let out_a = temp_dir.path().join("a.txt");
    let out_b = temp_dir.path().join("b.txt");

    for out in [&out_a, &out_b] {
        let output = run_driver(&[
            constraints.to_str().unwrap(),
            out.to_str().unwrap(),
            "10",
            "-S",
            "42",
        ]);
        assert!(output.status.success());
    }
    let a = std::fs::read(&out_a).unwrap();
    let b = std::fs::read(&out_b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_decrement_reset_mode_runs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let constraints = write_constraints(temp_dir.path());
    let out_path = temp_dir.path().join("results.txt");

    let output = run_driver(&[
        constraints.to_str().unwrap(),
        out_path.to_str().unwrap(),
        "10",
        "-r",
        "decrement",
    ]);
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&out_path).unwrap().lines().count(), 10);
}

#[test]
fn test_bad_format_falls_back_to_default() {
    let temp_dir = tempfile::tempdir().unwrap();
    let constraints = write_constraints(temp_dir.path());
    let out_path = temp_dir.path().join("results.txt");

    let output = run_driver(&[
        constraints.to_str().unwrap(),
        out_path.to_str().unwrap(),
        "5",
        "-f",
        "%10.10q",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Error reading format. Defaulting to standard formatting of %10.10f")
    );
    // The default format carries 10 decimal places.
    let contents = std::fs::read_to_string(&out_path).unwrap();
    let first_cell = contents.split_whitespace().next().unwrap();
    assert_eq!(first_cell.split('.').nth(1).unwrap().len(), 10);
}

#[test]
fn test_infeasible_seed_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("constraints.txt");
    std::fs::write(&path, "dims 2\nseed 0.9 0.9\nx0 + x1 <= 1.0\n").unwrap();
    let out_path = temp_dir.path().join("results.txt");

    let output = run_driver(&[path.to_str().unwrap(), out_path.to_str().unwrap(), "5"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("seed point does not satisfy the declared constraints"));
    assert!(!out_path.exists());
}

#[test]
fn test_stats_out_writes_parseable_json() {
    let temp_dir = tempfile::tempdir().unwrap();
    let constraints = write_constraints(temp_dir.path());
    let out_path = temp_dir.path().join("results.txt");
    let stats_path = temp_dir.path().join("stats.json");

    let output = run_driver(&[
        constraints.to_str().unwrap(),
        out_path.to_str().unwrap(),
        "10",
        "--stats-out",
        stats_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let stats_json = std::fs::read_to_string(&stats_path).unwrap();
    let stats: serde_json::Value = serde_json::from_str(&stats_json).unwrap();
    assert_eq!(stats["accepted"], 10);
    assert!(stats["proposals"].as_u64().unwrap() >= 10);
}

#[test]
fn test_check_samples_passes_then_flags_corruption() {
    let temp_dir = tempfile::tempdir().unwrap();
    let constraints = write_constraints(temp_dir.path());
    let out_path = temp_dir.path().join("results.txt");

    let output = run_driver(&[
        constraints.to_str().unwrap(),
        out_path.to_str().unwrap(),
        "10",
    ]);
    assert!(output.status.success());

    let checker = env!("CARGO_BIN_EXE_check-samples");
    let output = Command::new(checker)
        .arg(&out_path)
        .arg(&constraints)
        .output()
        .expect("check-samples should run");
    println!("stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert!(output.status.success());

    // Append a row violating the constraint; the checker must now fail.
    let mut contents = std::fs::read_to_string(&out_path).unwrap();
    contents.push_str("0.9000000000 0.9000000000\n");
    std::fs::write(&out_path, contents).unwrap();

    let output = Command::new(checker)
        .arg(&out_path)
        .arg(&constraints)
        .output()
        .expect("check-samples should run");
    println!("stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Check failed. Failure at entries: [10]"));
}
