// ABOUTME: CLI argument definitions for the termimg binary
// ABOUTME: Defines the command-line interface structure using clap derive macros

use crate::completions::Shell;
use crate::constants::region::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use termimg_sdk::CellArea;

#[derive(Parser, Debug)]
#[command(name = "termimg")]
#[command(about = "Draw images inside a terminal cell region", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output for debugging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Read configuration from this file instead of the standard locations
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Cell rectangle shared by draw and clear.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionArgs {
    /// Left column of the region (0-based)
    #[arg(long, default_value_t = 0)]
    pub x: u16,

    /// Top row of the region (0-based)
    #[arg(long, default_value_t = 0)]
    pub y: u16,

    /// Width of the region in cells
    #[arg(long, default_value_t = DEFAULT_WIDTH, value_parser = clap::value_parser!(u16).range(1..))]
    pub width: u16,

    /// Height of the region in cells
    #[arg(long, default_value_t = DEFAULT_HEIGHT, value_parser = clap::value_parser!(u16).range(1..))]
    pub height: u16,
}

impl RegionArgs {
    pub fn area(&self) -> CellArea {
        CellArea::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Draw an image, wait, then erase it
    Draw {
        /// Image file to draw
        path: PathBuf,

        #[command(flatten)]
        region: RegionArgs,

        /// Display method (see `termimg methods`); detected when omitted
        #[arg(long, short)]
        method: Option<String>,

        /// Keep the image up for this many milliseconds instead of waiting for Enter
        #[arg(long)]
        hold_ms: Option<u64>,
    },
    /// Erase a region
    Clear {
        #[command(flatten)]
        region: RegionArgs,

        /// Display method (see `termimg methods`); detected when omitted
        #[arg(long, short)]
        method: Option<String>,
    },
    /// Show terminal geometry and the detected display method
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print image dimensions read from the file header
    Size {
        /// Image file (PNG, GIF or JPEG)
        path: PathBuf,
    },
    /// List the available display methods
    Methods,
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
