//! CLI Integration Tests
//!
//! These tests run the `thermoview` binary and check its output and exit codes.
//! Tests that need a live sensor are marked with #[ignore].
//!
//! Run offline tests:
//! ```
//! cargo test --package thermoview-cli --test cli_integration
//! ```
//!
//! Run hardware tests:
//! ```
//! THERMOVIEW_DEVICE="ThermalView" cargo test --package thermoview-cli --test cli_integration -- --ignored --nocapture
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run the binary with an isolated config directory.
fn run_thermoview(config_home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_thermoview"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env("NO_COLOR", "1")
        .env_remove("THERMOVIEW_DEVICE")
        .output()
        .expect("Failed to run thermoview binary")
}

fn run(args: &[&str]) -> Output {
    let home = TempDir::new().unwrap();
    run_thermoview(home.path(), args)
}

/// Get device from environment
fn get_device() -> Option<String> {
    env::var("THERMOVIEW_DEVICE").ok().filter(|s| !s.is_empty())
}

/// Config file location the binary resolves under `config_home`.
fn config_file(config_home: &Path) -> PathBuf {
    let output = run_thermoview(config_home, &["config", "path"]);
    assert!(output.status.success());
    PathBuf::from(String::from_utf8_lossy(&output.stdout).trim())
}

fn gradient_payload() -> String {
    (0..64)
        .map(|i| format!("{}.5", 20 + i / 4))
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// Help and Version Tests (no hardware required)
// =============================================================================

#[test]
fn test_help_command() {
    let output = run(&["--help"]);

    assert!(output.status.success(), "Help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("thermal"), "Help should describe the tool");
    for command in ["scan", "watch", "render", "tui", "config", "completions"] {
        assert!(stdout.contains(command), "Help should list {command}");
    }
}

#[test]
fn test_version_command() {
    let output = run(&["--version"]);

    assert!(output.status.success(), "Version should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("thermoview"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_subcommand_help() {
    for command in ["scan", "watch", "render", "config"] {
        let output = run(&[command, "--help"]);
        assert!(output.status.success(), "{command} --help should succeed");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Usage"), "{command} help should show usage");
    }
}

#[test]
fn test_invalid_subcommand() {
    let output = run(&["frobnicate"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("frobnicate"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    let output = run(&["-v", "-q", "config", "path"]);
    assert!(!output.status.success());
}

#[test]
fn test_completions_bash() {
    let output = run(&["completions", "bash"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("thermoview"));
}

// =============================================================================
// Config Tests (no hardware required)
// =============================================================================

#[test]
fn test_config_path() {
    let home = TempDir::new().unwrap();
    let output = run_thermoview(home.path(), &["config", "path"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim().ends_with("config.toml"));
    assert!(stdout.contains("thermoview"));
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();

    let output = run_thermoview(home.path(), &["config", "init"]);
    assert!(output.status.success(), "{:?}", output);
    assert!(config_file(home.path()).exists());

    let output = run_thermoview(home.path(), &["config", "show"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("device_name"));
    assert!(stdout.contains("[render]"));

    // A second init refuses to overwrite.
    let output = run_thermoview(home.path(), &["config", "init"]);
    assert!(!output.status.success());
    let output = run_thermoview(home.path(), &["config", "init", "--force"]);
    assert!(output.status.success());
}

#[test]
fn test_invalid_config_is_rejected() {
    let home = TempDir::new().unwrap();
    let path = config_file(home.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "scan_timeout_secs = 0\n").unwrap();

    let output = run_thermoview(home.path(), &["render", "--payload", "1,2", "-o", "x.png"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("timeout"), "stderr: {stderr}");
}

// =============================================================================
// Render Tests (no hardware required)
// =============================================================================

#[test]
fn test_render_payload_to_png() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("frame.png");
    let payload = gradient_payload();

    let output = run_thermoview(
        home.path(),
        &[
            "render",
            "--payload",
            &payload,
            "--output",
            out.to_str().unwrap(),
            "--size",
            "96",
        ],
    );
    assert!(output.status.success(), "{:?}", output);

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("96x96"));
    assert!(stderr.contains("Grid: min 20.50 °C | max 35.50 °C"));
}

#[test]
fn test_render_from_input_file_quiet() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("grid.txt");
    let out = home.path().join("frame.png");
    std::fs::write(&input, format!("{}\n", gradient_payload())).unwrap();

    let output = run_thermoview(
        home.path(),
        &[
            "-q",
            "render",
            "--input",
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{:?}", output);
    assert!(out.exists());
    assert!(output.stderr.is_empty());
}

#[test]
fn test_render_short_payload_fails() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("frame.png");
    let payload = vec!["1.0"; 63].join(",");

    let output = run_thermoview(
        home.path(),
        &["render", "-p", &payload, "-o", out.to_str().unwrap()],
    );
    assert!(!output.status.success());
    assert!(!out.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid grid payload"), "stderr: {stderr}");
}

#[test]
fn test_render_requires_source() {
    let output = run(&["render", "-o", "frame.png"]);
    assert!(!output.status.success());
}

// =============================================================================
// Hardware Tests (require a BLE adapter and a sensor)
// =============================================================================

#[test]
#[ignore = "requires BLE hardware"]
fn test_scan_json_output() {
    let output = run(&["scan", "--format", "json", "--timeout", "5"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert!(json.get("count").is_some());
    assert!(json["devices"].is_array());
}

#[test]
#[ignore = "requires BLE hardware and device"]
fn test_watch_json_output() {
    let Some(device) = get_device() else {
        eprintln!("THERMOVIEW_DEVICE not set, skipping");
        return;
    };

    let output = run(&["watch", "-d", &device, "--format", "json", "-n", "3", "--compact"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        let json: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
        assert!(json.get("timestamp").is_some());
        assert!(json.get("kind").is_some());
    }
}
