// ABOUTME: termimg SDK: draws raster images inside text terminals over their native protocols
// ABOUTME: Kitty, sixel, iTerm2, urxvt, terminology, w3mimgdisplay and ueberzug behind one interface

pub mod constants;
pub mod context;
pub mod displayer;
pub mod error;
pub mod geometry;
pub mod iterm2;
pub mod kitty;
pub mod process;
pub mod registry;
pub mod scaling;
pub mod settings;
pub mod sixel;
pub mod term;
pub mod terminology;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod ueberzug;
pub mod urxvt;
pub mod w3m;
pub mod watchdog;

pub use context::{BackendContext, Host, NullHost};
pub use displayer::{BackendKind, CellArea, DisplayRequest, Displayer, ImageDisplayer};
pub use error::{ImageError, Result};
pub use geometry::{
    terminal_cell_size, CellSize, FixedGeometry, GeometryProvider, TerminalGeometry,
    WindowGeometry,
};
pub use registry::Registry;
pub use settings::DisplaySettings;
pub use term::{StdTerm, TermIo};

/// Construct the backend registered under `key` and draw one image with it.
/// The backend is returned so the caller can clear and quit it later.
pub fn draw_with(registry: &Registry, key: &str, request: &DisplayRequest) -> Result<Displayer> {
    let mut displayer = registry.get(key);
    displayer.draw(request)?;
    Ok(displayer)
}
