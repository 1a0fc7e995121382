// ABOUTME: Configuration file loading, validation, and hierarchical merging for termimg
// ABOUTME: Reads TOML files from the user config dir, XDG config home and the project directory

use crate::constants::{config as files, env};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use termimg_sdk::constants::sixel::DITHERING_MODES;
use termimg_sdk::{BackendKind, DisplaySettings};

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, deserialize_with = "validate_method")]
    pub method: Option<String>,
    #[serde(default)]
    pub sixel: Option<SixelConfig>,
    #[serde(default)]
    pub w3m: Option<W3mConfig>,
    #[serde(default)]
    pub iterm2: Option<ITerm2Config>,
    #[serde(default)]
    pub urxvt: Option<UrxvtConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SixelConfig {
    #[serde(default, deserialize_with = "validate_dithering")]
    pub dithering: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct W3mConfig {
    #[serde(default)]
    pub offset: Option<i32>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ITerm2Config {
    #[serde(default)]
    pub font_width: Option<u32>,
    #[serde(default)]
    pub font_height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UrxvtConfig {
    #[serde(default)]
    pub column_ratios: Option<Vec<u32>>,
}

impl Config {
    /// Load configuration from standard XDG-compliant locations
    pub fn load() -> Result<Self> {
        Self::load_from_paths(&Self::get_config_paths())
    }

    /// Load and merge `paths`, lowest precedence first. Missing files are skipped;
    /// a file that exists but does not parse is an error.
    pub fn load_from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut config = Config::default();

        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                continue;
            }
            log::debug!("Loading config from {}", path.display());
            config = config.merge(Self::load_from_file(path)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse TOML config file: {}",
                path.as_ref().display()
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Standard config file paths, lowest precedence first: user config dir,
    /// then XDG config home, then the project file in the current directory.
    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(
                home_dir
                    .join(".config")
                    .join(files::APP_DIR)
                    .join(files::FILE_NAME),
            );
        }

        if let Some(config_home) = std::env::var_os(env::XDG_CONFIG_HOME) {
            let path = PathBuf::from(config_home)
                .join(files::APP_DIR)
                .join(files::FILE_NAME);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }

        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(current_dir.join(files::PROJECT_FILE));
        }

        paths
    }

    /// Merge this config with another, giving precedence to the other config
    pub fn merge(self, other: Config) -> Config {
        Config {
            method: other.method.or(self.method),
            sixel: merge_section(self.sixel, other.sixel, |base, over| SixelConfig {
                dithering: over.dithering.or(base.dithering),
            }),
            w3m: merge_section(self.w3m, other.w3m, |base, over| W3mConfig {
                offset: over.offset.or(base.offset),
                delay_ms: over.delay_ms.or(base.delay_ms),
            }),
            iterm2: merge_section(self.iterm2, other.iterm2, |base, over| ITerm2Config {
                font_width: over.font_width.or(base.font_width),
                font_height: over.font_height.or(base.font_height),
            }),
            urxvt: merge_section(self.urxvt, other.urxvt, |base, over| UrxvtConfig {
                column_ratios: over.column_ratios.or(base.column_ratios),
            }),
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(ratios) = self.urxvt.as_ref().and_then(|u| u.column_ratios.as_ref()) {
            anyhow::ensure!(
                !ratios.is_empty(),
                "urxvt.column_ratios must list at least one column"
            );
        }
        if let Some(iterm2) = &self.iterm2 {
            anyhow::ensure!(
                iterm2.font_width != Some(0) && iterm2.font_height != Some(0),
                "iterm2 font metrics must be positive"
            );
        }
        Ok(())
    }

    /// Configured method, or `None` when detection should decide.
    pub fn method(&self) -> Option<&str> {
        self.method
            .as_deref()
            .filter(|method| *method != files::AUTO_METHOD)
    }

    /// Backend tunables, with SDK defaults for everything left unset.
    pub fn display_settings(&self) -> DisplaySettings {
        let mut settings = DisplaySettings::default();

        if let Some(dithering) = self.sixel.as_ref().and_then(|s| s.dithering.clone()) {
            settings.sixel_dithering = dithering;
        }
        if let Some(w3m) = &self.w3m {
            if let Some(offset) = w3m.offset {
                settings.w3m_offset = offset;
            }
            if let Some(delay_ms) = w3m.delay_ms {
                settings.w3m_delay = Duration::from_millis(delay_ms);
            }
        }
        if let Some(iterm2) = &self.iterm2 {
            if let Some(width) = iterm2.font_width {
                settings.iterm2_font_width = width;
            }
            if let Some(height) = iterm2.font_height {
                settings.iterm2_font_height = height;
            }
        }
        if let Some(ratios) = self.urxvt.as_ref().and_then(|u| u.column_ratios.clone()) {
            settings.column_ratios = ratios;
        }

        settings
    }
}

fn merge_section<T>(
    base: Option<T>,
    over: Option<T>,
    combine: impl FnOnce(T, T) -> T,
) -> Option<T> {
    match (base, over) {
        (Some(base), Some(over)) => Some(combine(base, over)),
        (base, over) => over.or(base),
    }
}

// Custom deserializer for method key validation
fn validate_method<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let Some(method) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if method == files::AUTO_METHOD || method.parse::<BackendKind>().is_ok() {
        return Ok(Some(method));
    }

    let keys: Vec<&str> = BackendKind::ALL.iter().map(|kind| kind.key()).collect();
    Err(D::Error::custom(format!(
        "Invalid method '{}'. Must be one of: {}, {}",
        method,
        files::AUTO_METHOD,
        keys.join(", ")
    )))
}

// Custom deserializer for ImageMagick dithering modes
fn validate_dithering<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<String>::deserialize(deserializer)? {
        Some(mode) if !DITHERING_MODES.contains(&mode.as_str()) => Err(D::Error::custom(format!(
            "Invalid dithering '{}'. Must be one of: {}",
            mode,
            DITHERING_MODES.join(", ")
        ))),
        value => Ok(value),
    }
}
