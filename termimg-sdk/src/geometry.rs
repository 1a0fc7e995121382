// ABOUTME: Terminal geometry probing: window size in cells and pixels, per-cell font metrics
// ABOUTME: Falls back to a companion program's self-reported pixel size when the tty reports zero

use crate::constants::geometry::FALLBACK_PIXEL_CORRECTION;
use crate::error::{ImageError, Result};
use serde::Serialize;
use std::ffi::OsStr;
use std::io;
use std::process::{Command, Stdio};
use std::sync::Mutex;

/// Size of the terminal window as reported by the tty driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowGeometry {
    pub columns: u16,
    pub rows: u16,
    pub width_px: u32,
    pub height_px: u32,
}

/// Pixel size of one character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CellSize {
    pub width: u32,
    pub height: u32,
}

impl CellSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Convert a box measured in cells to pixels.
    pub fn pixel_box(&self, columns: u16, rows: u16) -> (u32, u32) {
        (
            u32::from(columns) * self.width,
            u32::from(rows) * self.height,
        )
    }
}

impl WindowGeometry {
    pub fn has_pixels(&self) -> bool {
        self.width_px > 0 && self.height_px > 0
    }

    pub fn cell_size(&self) -> CellSize {
        if self.columns == 0 || self.rows == 0 {
            return CellSize::default();
        }
        CellSize {
            width: self.width_px / u32::from(self.columns),
            height: self.height_px / u32::from(self.rows),
        }
    }

    pub fn with_pixels(self, width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
            ..self
        }
    }
}

/// Source of window geometry handed to the backends.
pub trait GeometryProvider: Send + Sync {
    fn window(&self) -> io::Result<WindowGeometry>;

    fn cell_size(&self) -> io::Result<CellSize> {
        Ok(self.window()?.cell_size())
    }
}

/// Queries the controlling terminal once and remembers the answer until
/// [`TerminalGeometry::refresh`] is called (e.g. on SIGWINCH).
#[derive(Debug, Default)]
pub struct TerminalGeometry {
    cached: Mutex<Option<WindowGeometry>>,
}

impl TerminalGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&self) {
        *self.cached.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl GeometryProvider for TerminalGeometry {
    fn window(&self) -> io::Result<WindowGeometry> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(window) = *cached {
            return Ok(window);
        }
        let window = query_window()?;
        log::debug!(
            "Terminal window: {}x{} cells, {}x{} px",
            window.columns,
            window.rows,
            window.width_px,
            window.height_px
        );
        *cached = Some(window);
        Ok(window)
    }
}

/// Constant geometry, for tests and hosts that override font metrics.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeometry(pub WindowGeometry);

impl FixedGeometry {
    pub fn from_cell_size(columns: u16, rows: u16, cell: CellSize) -> Self {
        Self(WindowGeometry {
            columns,
            rows,
            width_px: u32::from(columns) * cell.width,
            height_px: u32::from(rows) * cell.height,
        })
    }
}

impl GeometryProvider for FixedGeometry {
    fn window(&self) -> io::Result<WindowGeometry> {
        Ok(self.0)
    }
}

fn query_window() -> io::Result<WindowGeometry> {
    let size = crossterm::terminal::window_size()?;
    Ok(WindowGeometry {
        columns: size.columns,
        rows: size.rows,
        width_px: u32::from(size.width),
        height_px: u32::from(size.height),
    })
}

/// Character cell size of the controlling terminal in pixels.
pub fn terminal_cell_size() -> io::Result<CellSize> {
    Ok(query_window()?.cell_size())
}

/// Cell size from `geometry`, or from `fallback` when the window reports no
/// pixel dimensions. `fallback` returns the whole window size in pixels.
pub fn cell_size_with_fallback<F>(geometry: &dyn GeometryProvider, fallback: F) -> Result<CellSize>
where
    F: FnOnce() -> Result<(u32, u32)>,
{
    let window = geometry
        .window()
        .map_err(|e| ImageError::display(format!("failed to query terminal size: {}", e)))?;
    if window.has_pixels() {
        return Ok(window.cell_size());
    }

    let (width_px, height_px) = fallback()?;
    log::debug!(
        "Terminal reported no pixel size, fallback command reported {}x{} px",
        width_px,
        height_px
    );
    Ok(window.with_pixels(width_px, height_px).cell_size())
}

/// Run a program that prints the window size in pixels and return it with
/// the fallback correction applied.
pub fn query_pixel_size<S: AsRef<OsStr>>(program: S, args: &[&str]) -> Result<(u32, u32)> {
    let output = Command::new(program.as_ref())
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| {
            ImageError::display(format!(
                "failed to run {}: {}",
                program.as_ref().to_string_lossy(),
                e
            ))
        })?;

    let text = String::from_utf8_lossy(&output.stdout);
    let (width, height) = parse_pixel_pair(&text).ok_or_else(|| {
        ImageError::display(format!("unexpected window size report: {:?}", text.trim()))
    })?;

    Ok((
        width + FALLBACK_PIXEL_CORRECTION,
        height + FALLBACK_PIXEL_CORRECTION,
    ))
}

/// Parse `"<w> <h>"` or `"<w>x<h>"`.
pub fn parse_pixel_pair(text: &str) -> Option<(u32, u32)> {
    let mut numbers = text
        .split(|c: char| c.is_whitespace() || c == 'x')
        .filter(|part| !part.is_empty());
    let width = numbers.next()?.parse().ok()?;
    let height = numbers.next()?.parse().ok()?;
    if numbers.next().is_some() {
        return None;
    }
    Some((width, height))
}
