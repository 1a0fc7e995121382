// ABOUTME: w3mimgdisplay backend speaking its strict request/reply line protocol
// ABOUTME: The companion is restarted after every draw to contain its memory leak

use crate::constants::env::W3MIMGDISPLAY_PATH;
use crate::constants::w3m::{BINARY_PATHS, TEST_FLAG};
use crate::context::{BackendContext, Host};
use crate::displayer::{CellArea, DisplayRequest, ImageDisplayer};
use crate::error::{ImageError, Result};
use crate::geometry::{
    cell_size_with_fallback, parse_pixel_pair, query_pixel_size, CellSize, GeometryProvider,
};
use crate::process::CompanionProcess;
use crate::scaling::fit_clamped;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Locate w3mimgdisplay: `$W3MIMGDISPLAY_PATH` first, then the usual
/// install locations.
pub fn find_w3mimgdisplay() -> Result<PathBuf> {
    let from_env = std::env::var_os(W3MIMGDISPLAY_PATH)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);

    from_env
        .into_iter()
        .chain(BINARY_PATHS.iter().map(PathBuf::from))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| {
            ImageError::unsupported(format!(
                "No w3mimgdisplay executable found. Please set the path manually by \
                 setting the {} environment variable.",
                W3MIMGDISPLAY_PATH
            ))
        })
}

/// Pixel x of a cell column, nudged left to cover the cell border.
fn pixel_x(column: u16, font_width: u32) -> i64 {
    ((f64::from(column) - 0.2) * f64::from(font_width)) as i64
}

/// Size query for `path`.
pub fn size_query(path: &Path) -> String {
    format!("5;{}\n", path.display())
}

/// Draw command for an image of native size `native` into `area`.
pub fn draw_command(
    path: &Path,
    area: CellArea,
    native: (u32, u32),
    cell: CellSize,
    offset: i32,
) -> String {
    let (max_width, max_height) = cell.pixel_box(area.width, area.height);
    let max_height = max_height.saturating_sub(2);
    let (width, height) = fit_clamped(native.0, native.1, max_width, max_height);

    let x = pixel_x(area.x, cell.width) + i64::from(offset);
    let y = i64::from(area.y) * i64::from(cell.height) + i64::from(offset);

    format!(
        "0;1;{};{};{};{};;;;;{}\n4;\n3;\n",
        x,
        y,
        width,
        height,
        path.display()
    )
}

/// Erase command for `area`, slightly larger than the cell box.
pub fn clear_command(area: CellArea, cell: CellSize) -> String {
    let x = pixel_x(area.x, cell.width);
    let y = u32::from(area.y) * cell.height;
    let width = ((f64::from(area.width) + 0.4) * f64::from(cell.width)) as u32;
    let height = u32::from(area.height) * cell.height + 1;
    format!("6;{};{};{};{}\n4;\n3;\n", x, y, width, height)
}

pub struct W3mDisplayer {
    binary: Option<PathBuf>,
    process: Option<CompanionProcess>,
    geometry: Arc<dyn GeometryProvider>,
    host: Arc<dyn Host>,
    offset: i32,
    delay: Duration,
    working_dir: Option<PathBuf>,
}

impl W3mDisplayer {
    pub fn new(ctx: &BackendContext) -> Self {
        Self {
            binary: None,
            process: None,
            geometry: ctx.geometry.clone(),
            host: ctx.host.clone(),
            offset: ctx.settings.w3m_offset,
            delay: ctx.settings.w3m_delay,
            working_dir: ctx.settings.working_dir.clone(),
        }
    }

    /// Use `binary` instead of searching for w3mimgdisplay.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn is_running(&mut self) -> bool {
        self.process
            .as_mut()
            .is_some_and(CompanionProcess::is_running)
    }

    fn binary(&mut self) -> Result<PathBuf> {
        if let Some(binary) = &self.binary {
            return Ok(binary.clone());
        }
        let binary = find_w3mimgdisplay()?;
        log::debug!("Using w3mimgdisplay at {}", binary.display());
        self.binary = Some(binary.clone());
        Ok(binary)
    }

    fn process(&mut self) -> Result<&mut CompanionProcess> {
        let binary = self.binary()?;
        let working_dir = self.working_dir.clone();
        let process = self.process.get_or_insert_with(|| {
            CompanionProcess::new(binary)
                .current_dir(working_dir)
                .with_replies()
        });
        process.ensure_running()?;
        Ok(process)
    }

    /// Cell size from the tty, or from `w3mimgdisplay -test` when the tty
    /// reports no pixels.
    fn cell_size(&mut self) -> Result<CellSize> {
        let binary = self.binary()?;
        cell_size_with_fallback(self.geometry.as_ref(), || {
            query_pixel_size(&binary, &[TEST_FLAG])
        })
    }

    fn query_size(&mut self, path: &Path) -> Result<(u32, u32)> {
        let process = self.process()?;
        process.send(size_query(path).as_bytes())?;
        let reply = process.read_line()?;
        parse_pixel_pair(&reply).ok_or_else(|| {
            ImageError::display(format!("Failed to execute w3mimgdisplay: {:?}", reply))
        })
    }

    /// Kill the companion; the next command starts a fresh one.
    fn restart(&mut self) {
        if let Some(process) = self.process.as_mut() {
            process.kill();
        }
    }
}

impl ImageDisplayer for W3mDisplayer {
    fn draw(&mut self, request: &DisplayRequest) -> Result<()> {
        let cell = self.cell_size()?;
        if cell.is_zero() {
            return Err(ImageError::unsupported(
                "w3mimgdisplay needs the terminal size in pixels",
            ));
        }

        let native = self.query_size(&request.path)?;
        let command = draw_command(&request.path, request.area, native, cell, self.offset);
        log::debug!("w3mimgdisplay: {}", command.lines().next().unwrap_or_default());

        let process = self.process()?;
        process.send(command.as_bytes())?;
        process.read_line()?;

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.restart();
        Ok(())
    }

    fn clear(&mut self, area: CellArea) -> Result<()> {
        let cell = self.cell_size()?;
        let command = clear_command(area, cell);

        self.host.request_redraw();
        let process = self.process()?;
        match process.send(command.as_bytes()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                log::warn!("w3mimgdisplay went away before clear: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        process.read_line()?;
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
        Ok(())
    }
}
