use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_fixpulse"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "fixpulse init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".fixpulse.toml");
    assert!(config_path.exists(), ".fixpulse.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[mining]"));
    assert!(content.contains("[fixes]"));
    assert!(content.contains("[dataset]"));

    // The template must parse and validate with every option commented out
    let _raw: toml::Value = toml::from_str(&content).unwrap();
    let config = fixpulse_core::FixPulseConfig::from_toml(&content).unwrap();
    assert_eq!(config.mining.max_files_per_commit, 200);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".fixpulse.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_fixpulse"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".fixpulse.toml")).unwrap();
    assert_eq!(content, "# existing");
}
