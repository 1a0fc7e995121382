// ABOUTME: Centralized constants for the termimg SDK
// ABOUTME: Contains escape sequence framing, companion binary paths, timeouts and env var names

/// Kitty graphics protocol framing
pub mod kitty {
    /// APC introducer for graphics commands and replies
    pub const PROTOCOL_START: &[u8] = b"\x1b_G";

    /// String terminator closing every graphics command and reply
    pub const PROTOCOL_END: &[u8] = b"\x1b\\";

    /// Maximum payload bytes carried by a single command fragment
    pub const MAX_CHUNK_LEN: usize = 2048;

    /// Primary device attributes query; its reply always arrives last
    pub const DEVICE_ATTRIBUTES_QUERY: &[u8] = b"\x1b[c";

    /// Start of the primary device attributes reply
    pub const DEVICE_ATTRIBUTES_REPLY: &[u8] = b"\x1b[?";

    /// Directory under the system temp dir holding images handed over by path
    pub const SPOOL_DIR_NAME: &str = "tty-graphics-protocol";

    /// Prefix for temporary PNG files placed in the spool directory
    pub const THUMBNAIL_PREFIX: &str = "termimg_thumb_";

    /// Command printing the window size in pixels, used when the tty reports zero
    pub const WINDOW_SIZE_COMMAND: &[&str] = &["kitten", "icat", "--print-window-size"];
}

/// Sixel conversion
pub mod sixel {
    /// ImageMagick 7 entry point
    pub const MAGICK: &str = "magick";

    /// ImageMagick 6 entry point
    pub const CONVERT: &str = "convert";

    /// Dithering used when the host does not configure one
    pub const DEFAULT_DITHERING: &str = "Riemersma";

    /// Dithering modes ImageMagick accepts for `-dither`
    pub const DITHERING_MODES: &[&str] = &["None", "FloydSteinberg", "Riemersma"];
}

/// w3mimgdisplay companion process
pub mod w3m {
    /// Standard install locations, searched after the env override
    pub const BINARY_PATHS: &[&str] = &[
        "/usr/lib/w3m/w3mimgdisplay",
        "/usr/libexec/w3m/w3mimgdisplay",
        "/usr/lib64/w3m/w3mimgdisplay",
        "/usr/libexec64/w3m/w3mimgdisplay",
        "/usr/local/libexec/w3m/w3mimgdisplay",
    ];

    /// Flag asking w3mimgdisplay to print the window size in pixels
    pub const TEST_FLAG: &str = "-test";
}

/// ueberzug companion process
pub mod ueberzug {
    use std::time::Duration;

    pub const PROGRAM: &str = "ueberzug";

    pub const ARGS: &[&str] = &["layer", "--silent"];

    /// Identifier of the single placement ueberzug manages for us
    pub const IMAGE_ID: &str = "preview";

    /// Grace period between SIGTERM and SIGKILL on quit
    pub const KILL_TIMEOUT: Duration = Duration::from_secs(1);
}

/// Geometry probing
pub mod geometry {
    /// Correction added to each axis of a pixel size reported by a fallback command
    pub const FALLBACK_PIXEL_CORRECTION: u32 = 2;
}

/// Environment variables read by the SDK
pub mod env {
    /// Explicit path to the w3mimgdisplay binary
    pub const W3MIMGDISPLAY_PATH: &str = "W3MIMGDISPLAY_PATH";

    /// Terminal type, used to detect tmux/screen passthrough
    pub const TERM: &str = "TERM";

    /// Preferred working directory for companion processes
    pub const XDG_RUNTIME_DIR: &str = "XDG_RUNTIME_DIR";

    /// Set to anything to keep ImageMagick from probing OpenCL devices
    pub const MAGICK_OCL_DEVICE: &str = "MAGICK_OCL_DEVICE";
}
