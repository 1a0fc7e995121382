// ABOUTME: Host-supplied tunables consumed by the display backends
// ABOUTME: Built with typed-builder so hosts only set the knobs they care about

use crate::constants::{env, sixel};
use std::path::PathBuf;
use std::time::Duration;
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct DisplaySettings {
    /// ImageMagick `-dither` mode used by the sixel converter
    #[builder(default = sixel::DEFAULT_DITHERING.to_string(), setter(into))]
    pub sixel_dithering: String,

    /// Pixels added to the w3m draw origin on both axes
    #[builder(default = 0)]
    pub w3m_offset: i32,

    /// Pause after each w3m draw before the companion is restarted
    #[builder(default = Duration::from_millis(20))]
    pub w3m_delay: Duration,

    /// Cell width in pixels assumed when fitting iTerm2 images
    #[builder(default = 8)]
    pub iterm2_font_width: u32,

    /// Cell height in pixels assumed when fitting iTerm2 images
    #[builder(default = 11)]
    pub iterm2_font_height: u32,

    /// Host column layout; urxvt sizes its background from the last column
    #[builder(default = vec![1, 3, 4])]
    pub column_ratios: Vec<u32>,

    /// Working directory for companion processes
    #[builder(default = default_working_dir())]
    pub working_dir: Option<PathBuf>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings::builder().build()
    }
}

fn default_working_dir() -> Option<PathBuf> {
    std::env::var_os(env::XDG_RUNTIME_DIR)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DisplaySettings::default();
        assert_eq!(settings.sixel_dithering, "Riemersma");
        assert_eq!(settings.w3m_offset, 0);
        assert_eq!(settings.w3m_delay, Duration::from_millis(20));
        assert_eq!(settings.iterm2_font_width, 8);
        assert_eq!(settings.iterm2_font_height, 11);
        assert_eq!(settings.column_ratios, vec![1, 3, 4]);
    }

    #[test]
    fn test_builder_overrides() {
        let settings = DisplaySettings::builder()
            .sixel_dithering("FloydSteinberg")
            .w3m_offset(3)
            .working_dir(Some(PathBuf::from("/tmp")))
            .build();
        assert_eq!(settings.sixel_dithering, "FloydSteinberg");
        assert_eq!(settings.w3m_offset, 3);
        assert_eq!(settings.working_dir, Some(PathBuf::from("/tmp")));
    }
}
