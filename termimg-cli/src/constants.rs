// ABOUTME: Centralized constants for the termimg CLI
// ABOUTME: Config file locations, environment variable names and command defaults

/// Configuration file discovery
pub mod config {
    /// Project-local config file, looked up in the current directory
    pub const PROJECT_FILE: &str = "termimg.toml";

    /// Directory name under the XDG/user config home
    pub const APP_DIR: &str = "termimg";

    /// File name inside the config directory
    pub const FILE_NAME: &str = "config.toml";

    /// Method value that defers to terminal detection
    pub const AUTO_METHOD: &str = "auto";
}

/// Environment variables read by the CLI
pub mod env {
    /// Forces a display method, skipping detection
    pub const METHOD_OVERRIDE: &str = "TERMIMG_METHOD";

    pub const TERM: &str = "TERM";
    pub const TERM_PROGRAM: &str = "TERM_PROGRAM";
    pub const KITTY_WINDOW_ID: &str = "KITTY_WINDOW_ID";
    pub const WEZTERM_EXECUTABLE: &str = "WEZTERM_EXECUTABLE";
    pub const XDG_CONFIG_HOME: &str = "XDG_CONFIG_HOME";
    pub const NO_COLOR: &str = "NO_COLOR";
}

/// Defaults for the draw and clear subcommands
pub mod region {
    pub const DEFAULT_WIDTH: u16 = 40;
    pub const DEFAULT_HEIGHT: u16 = 20;
}
