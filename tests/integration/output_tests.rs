use clap::Parser;
use dupfind::cli::Cli;
use dupfind::error::ExitCode;
use dupfind::run_app_with_writer;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

use crate::env_guard;

/// Fixture directory with an empty config file so the user's config is not read.
fn setup() -> (TempDir, TempDir) {
    let root = tempdir().unwrap();
    let config_dir = tempdir().unwrap();
    fs::write(config_dir.path().join("config.toml"), "").unwrap();
    (root, config_dir)
}

fn run(root: &Path, config_dir: &Path, extra: &[&str]) -> anyhow::Result<(ExitCode, String)> {
    let config = config_dir.join("config.toml");
    let mut args = vec![
        "dupfind".to_string(),
        root.display().to_string(),
        "-q".to_string(),
        "--sort".to_string(),
        "--config".to_string(),
        config.display().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    let cli = Cli::try_parse_from(args).unwrap();

    let mut buffer = Vec::new();
    let code = run_app_with_writer(cli, &mut buffer)?;
    Ok((code, String::from_utf8(buffer).unwrap()))
}

#[test]
fn test_text_output_hello_world() {
    let _lock = env_guard();
    let (root, config_dir) = setup();
    fs::write(root.path().join("a"), "hello").unwrap();
    fs::write(root.path().join("b"), "hello").unwrap();
    fs::write(root.path().join("c"), "world").unwrap();

    let (code, text) = run(root.path(), config_dir.path(), &[]).unwrap();

    let expected = format!(
        "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d\n\t{}\n\t{}\n\n10 bytes wasted space\n",
        root.path().join("a").display(),
        root.path().join("b").display(),
    );
    assert_eq!(code, ExitCode::Success);
    assert_eq!(text, expected);
}

#[test]
fn test_text_output_verbose_adds_human_size() {
    let _lock = env_guard();
    let (root, config_dir) = setup();
    fs::write(root.path().join("a"), vec![b'z'; 1500]).unwrap();
    fs::write(root.path().join("b"), vec![b'z'; 1500]).unwrap();

    let config = config_dir.path().join("config.toml");
    let cli = Cli::try_parse_from([
        "dupfind",
        root.path().to_str().unwrap(),
        "-v",
        "--config",
        config.to_str().unwrap(),
    ])
    .unwrap();

    let mut buffer = Vec::new();
    run_app_with_writer(cli, &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.ends_with(&format!(
        "\n3000 bytes wasted space ({})\n",
        bytesize::ByteSize::b(3000)
    )));
}

#[test]
fn test_text_output_no_duplicates_is_empty() {
    let _lock = env_guard();
    let (root, config_dir) = setup();
    fs::write(root.path().join("a"), "one").unwrap();
    fs::write(root.path().join("b"), "two").unwrap();

    let (code, text) = run(root.path(), config_dir.path(), &[]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(text.is_empty());
}

#[test]
fn test_text_output_reclaimable() {
    let _lock = env_guard();
    let (root, config_dir) = setup();
    for name in ["a", "b", "c"] {
        fs::write(root.path().join(name), "0123456789").unwrap();
    }

    let (_, text) = run(root.path(), config_dir.path(), &["--wasted", "reclaimable"]).unwrap();
    assert!(text.contains("\n20 bytes wasted space"));

    let (_, text) = run(root.path(), config_dir.path(), &[]).unwrap();
    assert!(text.contains("\n30 bytes wasted space"));
}

#[test]
fn test_json_output() {
    let _lock = env_guard();
    let (root, config_dir) = setup();
    fs::write(root.path().join("a"), "hello").unwrap();
    fs::write(root.path().join("b"), "hello").unwrap();
    fs::write(root.path().join("c"), "world").unwrap();

    let (code, json) = run(
        root.path(),
        config_dir.path(),
        &["-o", "json", "-a", "sha256", "--verify"],
    )
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let duplicates = parsed["duplicates"].as_array().unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(
        duplicates[0]["hash"],
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(duplicates[0]["size"], 5);
    assert_eq!(duplicates[0]["files"].as_array().unwrap().len(), 2);

    let summary = &parsed["summary"];
    assert_eq!(summary["total_files"], 3);
    assert_eq!(summary["wasted_bytes"], 10);
    assert_eq!(summary["algorithm"], "sha256");
    assert_eq!(summary["collisions"], 0);
}

#[test]
fn test_output_format_from_config_file() {
    let _lock = env_guard();
    let (root, config_dir) = setup();
    fs::write(config_dir.path().join("config.toml"), "output = \"json\"\n").unwrap();
    fs::write(root.path().join("a"), "x").unwrap();

    let (_, out) = run(root.path(), config_dir.path(), &[]).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(parsed["duplicates"].as_array().unwrap().is_empty());

    let (_, out) = run(root.path(), config_dir.path(), &["-o", "text"]).unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_missing_root_is_general_error() {
    let _lock = env_guard();
    let (root, config_dir) = setup();
    let missing = root.path().join("missing");

    let err = run(&missing, config_dir.path(), &[]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{:#}", err).contains("Path not found"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let _lock = env_guard();
    let root = tempdir().unwrap();
    let cli = Cli::try_parse_from([
        "dupfind",
        root.path().to_str().unwrap(),
        "-q",
        "--config",
        "/definitely/not/here.toml",
    ])
    .unwrap();

    let mut buffer = Vec::new();
    assert!(run_app_with_writer(cli, &mut buffer).is_err());
    assert!(buffer.is_empty());
}

#[test]
fn test_invalid_size_bounds_are_rejected() {
    let _lock = env_guard();
    let (root, config_dir) = setup();

    let err = run(
        root.path(),
        config_dir.path(),
        &["--min-size", "10KB", "--max-size", "1KB"],
    )
    .unwrap_err();
    assert!(err.to_string().contains("min_size"));
}
