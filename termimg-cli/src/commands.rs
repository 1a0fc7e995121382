// ABOUTME: Subcommand implementations driving the display backends
// ABOUTME: Method resolution, the draw/wait/clear session and the region repaint host

use crate::config::Config;
use crate::detection::Detection;
use anyhow::{anyhow, Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal;
use crossterm::QueueableCommand;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use termimg_sdk::{CellArea, DisplayRequest, Displayer, Host, ImageDisplayer, Registry};

/// Pick the display method: command line, then config, then detection.
pub fn resolve_method(
    requested: Option<&str>,
    config: &Config,
    detection: &Detection,
) -> Result<String> {
    if let Some(method) = requested {
        return Ok(method.to_string());
    }
    if detection.forced {
        if let Some(method) = &detection.method {
            return Ok(method.clone());
        }
    }
    config
        .method()
        .map(str::to_string)
        .or_else(|| detection.method.clone())
        .ok_or_else(|| {
            anyhow!(
                "No image display method detected for terminal {:?}; pass --method",
                detection.terminal
            )
        })
}

/// The CLI has no text UI to repaint, so a redraw request blanks the
/// region the image occupied instead.
#[derive(Debug, Default)]
pub struct RegionHost {
    pending: AtomicBool,
}

impl RegionHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a redraw was requested since the last call.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

impl Host for RegionHost {
    fn request_redraw(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }
}

/// Overwrite every cell of `area` with a space.
pub fn blank_region(out: &mut dyn Write, area: CellArea) -> std::io::Result<()> {
    let blank = " ".repeat(usize::from(area.width));
    for row in area.y..area.y.saturating_add(area.height) {
        out.queue(MoveTo(area.x, row))?;
        out.queue(Print(&blank))?;
    }
    out.flush()
}

/// How long a drawn image stays up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    For(Duration),
    UntilKey,
}

impl From<Option<u64>> for Hold {
    fn from(ms: Option<u64>) -> Self {
        ms.map_or(Hold::UntilKey, |ms| Hold::For(Duration::from_millis(ms)))
    }
}

/// Raw mode for the lifetime of the guard; handshake replies must not be
/// echoed or line-buffered.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable terminal raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

fn wait(hold: Hold) -> Result<()> {
    match hold {
        Hold::For(duration) => std::thread::sleep(duration),
        Hold::UntilKey => loop {
            if let Event::Key(key) = event::read().context("Failed to read terminal input")? {
                if key.kind == KeyEventKind::Press
                    && matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q'))
                {
                    break;
                }
            }
        },
    }
    Ok(())
}

/// Erase `area` and repaint it if the backend asked for a redraw.
fn clear_region(
    displayer: &mut Displayer,
    host: &RegionHost,
    out: &mut dyn Write,
    area: CellArea,
) -> Result<()> {
    displayer.clear(area)?;
    if host.take_pending() {
        blank_region(out, area).context("Failed to repaint cleared region")?;
    }
    Ok(())
}

/// Draw, hold, erase, shut the backend down. The backend is shut down even
/// when drawing fails.
pub fn draw_session(
    registry: &Registry,
    method: &str,
    host: &RegionHost,
    out: &mut dyn Write,
    request: &DisplayRequest,
    hold: Hold,
) -> Result<()> {
    let mut displayer = registry.get(method);
    log::debug!("Drawing {} with {:?}", request.path.display(), displayer);

    let outcome = displayer
        .draw(request)
        .map_err(anyhow::Error::from)
        .and_then(|()| wait(hold))
        .and_then(|()| clear_region(&mut displayer, host, out, request.area));

    let shutdown = displayer.quit();
    if host.take_pending() {
        blank_region(out, request.area).context("Failed to repaint cleared region")?;
    }
    outcome?;
    shutdown?;
    Ok(())
}

pub fn clear_session(
    registry: &Registry,
    method: &str,
    host: &RegionHost,
    out: &mut dyn Write,
    area: CellArea,
) -> Result<()> {
    let mut displayer = registry.get(method);
    let outcome = clear_region(&mut displayer, host, out, area);
    let shutdown = displayer.quit();
    if host.take_pending() {
        blank_region(out, area).context("Failed to repaint cleared region")?;
    }
    outcome?;
    shutdown?;
    Ok(())
}

/// Header-only dimensions, `None` for unrecognised files.
pub fn header_size(path: &Path) -> Result<Option<(u32, u32)>> {
    let (width, height) = termimg_sdk::iterm2::image_dimensions(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;
    Ok((width > 0 && height > 0).then_some((width, height)))
}
