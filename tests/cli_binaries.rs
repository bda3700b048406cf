use std::process::Command;

fn binary_output(args: &[&str]) -> std::process::Output {
    let path = env!("CARGO_BIN_EXE_sitewarden");
    Command::new(path)
        .args(args)
        .env_remove("SITEWARDEN_URL")
        .env_remove("SITEWARDEN_API_KEY")
        .output()
        .unwrap_or_else(|error| panic!("failed to run {path}: {error}"))
}

fn combined_utf8(output: &std::process::Output) -> String {
    let mut data = output.stdout.clone();
    data.extend_from_slice(&output.stderr);
    String::from_utf8(data).expect("binary output should be valid UTF-8")
}

#[test]
fn sitewarden_help_lists_usage() {
    let output = binary_output(&["--help"]);
    assert!(output.status.success(), "--help should succeed");
    assert!(
        output.stderr.is_empty(),
        "help output should not write to stderr"
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("sitewarden"));
}

#[test]
fn sitewarden_version_reports_package_version() {
    let output = binary_output(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn sitewarden_without_arguments_shows_usage() {
    let output = binary_output(&[]);
    assert!(
        !output.status.success(),
        "running without a subcommand should fail so the caller sees the usage"
    );
    assert!(combined_utf8(&output).contains("Usage:"));
}

#[test]
fn sitewarden_requires_a_site_url() {
    let output = binary_output(&["status"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr is UTF-8");
    assert!(stderr.contains("no site URL given"));
}

#[test]
fn sitewarden_rejects_unknown_flag() {
    let output = binary_output(&["--definitely-not-a-flag"]);
    assert!(!output.status.success());
    assert!(combined_utf8(&output).contains("--definitely-not-a-flag"));
}
