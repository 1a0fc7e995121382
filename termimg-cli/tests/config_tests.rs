// ABOUTME: Tests for configuration file loading, validation, and merging
// ABOUTME: Covers TOML parsing, XDG path resolution and conversion into backend settings

use std::time::Duration;
use tempfile::TempDir;
use termimg_cli::config::{Config, ITerm2Config, SixelConfig, UrxvtConfig, W3mConfig};
use termimg_sdk::DisplaySettings;

#[test]
fn test_config_deserialize_complete() {
    let toml_content = r#"
        method = "w3m"

        [sixel]
        dithering = "None"

        [w3m]
        offset = -3
        delay_ms = 100

        [iterm2]
        font_width = 10
        font_height = 22

        [urxvt]
        column_ratios = [1, 1, 2]
    "#;

    let config: Config = toml::from_str(toml_content).expect("Should parse valid TOML");

    assert_eq!(config.method, Some("w3m".to_string()));
    assert_eq!(
        config.sixel,
        Some(SixelConfig {
            dithering: Some("None".to_string())
        })
    );
    assert_eq!(
        config.w3m,
        Some(W3mConfig {
            offset: Some(-3),
            delay_ms: Some(100),
        })
    );
    assert_eq!(
        config.iterm2,
        Some(ITerm2Config {
            font_width: Some(10),
            font_height: Some(22),
        })
    );
    assert_eq!(
        config.urxvt,
        Some(UrxvtConfig {
            column_ratios: Some(vec![1, 1, 2])
        })
    );

    let settings = config.display_settings();
    assert_eq!(settings.sixel_dithering, "None");
    assert_eq!(settings.w3m_offset, -3);
    assert_eq!(settings.w3m_delay, Duration::from_millis(100));
    assert_eq!(settings.iterm2_font_width, 10);
    assert_eq!(settings.iterm2_font_height, 22);
    assert_eq!(settings.column_ratios, vec![1, 1, 2]);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config: Config = toml::from_str("[w3m]\noffset = 4").expect("Should parse");
    let settings = config.display_settings();
    let defaults = DisplaySettings::default();

    assert_eq!(settings.w3m_offset, 4);
    assert_eq!(settings.w3m_delay, defaults.w3m_delay);
    assert_eq!(settings.sixel_dithering, defaults.sixel_dithering);
}

#[test]
fn test_config_validation_errors() {
    assert!(toml::from_str::<Config>(r#"method = "kitty-ish""#).is_err());
    assert!(toml::from_str::<Config>("[sixel]\ndithering = \"riemersma\"").is_err());
    assert!(toml::from_str::<Config>("[w3m]\noffset = \"two\"").is_err());
    assert!(toml::from_str::<Config>("unknown_key = 1").is_err());
}

#[test]
fn test_config_merge_precedence() {
    let base: Config = toml::from_str(
        r#"
        method = "sixel"
        [iterm2]
        font_width = 9
        font_height = 19
    "#,
    )
    .unwrap();
    let over: Config = toml::from_str(
        r#"
        method = "kitty"
        [iterm2]
        font_height = 20
    "#,
    )
    .unwrap();

    let merged = base.merge(over);
    assert_eq!(merged.method, Some("kitty".to_string()));
    assert_eq!(
        merged.iterm2,
        Some(ITerm2Config {
            font_width: Some(9),
            font_height: Some(20),
        })
    );
}

#[test]
fn test_config_load_hierarchy() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let config_dir = temp_dir.path().join(".config").join("termimg");
    std::fs::create_dir_all(&config_dir).expect("Should create config dir");

    let user_config_path = config_dir.join("config.toml");
    std::fs::write(
        &user_config_path,
        r#"
        method = "ueberzug"
        [sixel]
        dithering = "FloydSteinberg"
    "#,
    )
    .expect("Should write user config");

    let project_config_path = temp_dir.path().join("termimg.toml");
    std::fs::write(&project_config_path, r#"method = "sixel""#)
        .expect("Should write project config");

    let missing = temp_dir.path().join("nowhere.toml");
    let config = Config::load_from_paths(&[&user_config_path, &missing, &project_config_path])
        .expect("Should load config hierarchy");

    assert_eq!(config.method(), Some("sixel"));
    assert_eq!(
        config.display_settings().sixel_dithering,
        "FloydSteinberg"
    );
}

#[test]
fn test_broken_file_in_hierarchy_is_reported() {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let path = temp_dir.path().join("termimg.toml");
    std::fs::write(&path, "method = ").expect("Should write config");

    let err = Config::load_from_paths(&[&path]).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse TOML config file"));
}

#[test]
fn test_config_xdg_paths() {
    let paths = Config::get_config_paths();

    // project file comes last so it overrides the user files
    assert!(paths.last().is_some_and(|p| p.ends_with("termimg.toml")));
    assert!(paths
        .iter()
        .any(|p| p.ends_with("termimg/config.toml")));
}

#[test]
fn test_load_from_missing_file() {
    let err = Config::load_from_file("/nonexistent/termimg.toml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
