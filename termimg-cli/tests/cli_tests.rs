// ABOUTME: End-to-end tests running the termimg binary
// ABOUTME: Exercises subcommands that need no graphics-capable terminal

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run termimg in an isolated home with no config files and no terminal hints.
fn termimg(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_termimg"))
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("TERMIMG_METHOD")
        .env_remove("TERM_PROGRAM")
        .env_remove("KITTY_WINDOW_ID")
        .env_remove("WEZTERM_EXECUTABLE")
        .env("TERM", "dumb")
        .output()
        .expect("Should run termimg")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_size_reads_header() {
    let home = TempDir::new().unwrap();
    let png = home.path().join("a.png");
    image::RgbImage::new(12, 5).save(&png).unwrap();

    let output = termimg(home.path(), &["size", png.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "12x5");
}

#[test]
fn test_size_rejects_unknown_format() {
    let home = TempDir::new().unwrap();
    let text = home.path().join("notes.txt");
    std::fs::write(&text, "plain text that is long enough to parse").unwrap();

    let output = termimg(home.path(), &["size", text.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not a PNG, GIF or JPEG"));
}

#[test]
fn test_methods_lists_every_backend() {
    let home = TempDir::new().unwrap();
    let output = termimg(home.path(), &["methods"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let listing = stdout(&output);
    for key in [
        "kitty",
        "sixel",
        "iterm2",
        "urxvt",
        "urxvt-full",
        "terminology",
        "w3m",
        "ueberzug",
    ] {
        assert!(listing.contains(key), "missing {}", key);
    }
    assert!(!listing.contains('\x1b'), "piped output is uncolored");
}

#[test]
fn test_info_json_reports_forced_method() {
    let home = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_termimg"))
        .args(["info", "--json"])
        .current_dir(home.path())
        .env("TERMIMG_METHOD", "sixel")
        .output()
        .expect("Should run termimg");
    assert!(output.status.success(), "{}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["method"], "sixel");
    assert_eq!(report["forced"], true);
    assert!(report.get("window").is_some());
}

#[test]
fn test_draw_missing_image() {
    let home = TempDir::new().unwrap();
    let output = termimg(home.path(), &["draw", "missing.png", "--method", "kitty"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Image not found"));
}

#[test]
fn test_clear_unknown_method_prints_help() {
    let home = TempDir::new().unwrap();
    let output = termimg(home.path(), &["clear", "--method", "nyan"]);
    assert!(!output.status.success());

    let err = stderr(&output);
    assert!(err.contains("nyan"));
    assert!(err.contains("Choose another display method"));
}

#[test]
fn test_nothing_detected_asks_for_method() {
    let home = TempDir::new().unwrap();
    let output = termimg(home.path(), &["clear"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--method"));
}

#[test]
fn test_project_config_selects_method() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("termimg.toml"), r#"method = "bogus""#).unwrap();

    let output = termimg(home.path(), &["clear"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid method 'bogus'"));
}

#[test]
fn test_explicit_config_file() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.toml");
    std::fs::write(&path, "[sixel]\ndithering = \"Sierra\"").unwrap();

    let output = termimg(home.path(), &["--config", path.to_str().unwrap(), "methods"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid dithering 'Sierra'"));
}
