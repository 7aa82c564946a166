//! CLI smoke tests: verify basic binary behavior.

use std::io::Write;
use std::process::{Command, Stdio};

fn cli_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lyra"))
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("chat"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lyra"), "Expected binary name in --version output");
}

#[test]
fn test_missing_config_does_not_panic() {
    let output = cli_bin()
        .arg("--config")
        .arg("/tmp/nonexistent_lyra_config_12345.toml")
        .arg("--help")
        .output()
        .expect("failed to run");
    assert!(output.status.success());
}

#[test]
fn test_chat_with_mock_provider() {
    let mut child = cli_bin()
        .arg("--config")
        .arg("/tmp/nonexistent_lyra_config_12345.toml")
        .arg("chat")
        .env("LLM_PROVIDER", "mock")
        .env("LYRA_EMBEDDER", "hash")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn");

    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"hello lyra\nquit\n")
        .expect("write stdin");

    let output = child.wait_with_output().expect("failed to wait");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    // tenderness lowercases the reply
    assert!(stdout.contains("i received: hello lyra"));
    assert!(stdout.contains("Bye."));
}
