// ABOUTME: Common displayer interface and the closed set of backend variants
// ABOUTME: Every backend draws a file into a cell region, erases a region and shuts down

use crate::error::{ImageError, Result};
use crate::iterm2::ITerm2Displayer;
use crate::kitty::KittyDisplayer;
use crate::sixel::SixelDisplayer;
use crate::terminology::TerminologyDisplayer;
use crate::ueberzug::UeberzugDisplayer;
use crate::urxvt::UrxvtDisplayer;
use crate::w3m::W3mDisplayer;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Rectangle of terminal cells, origin top-left, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CellArea {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl CellArea {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One image to draw; built per call by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRequest {
    pub path: PathBuf,
    pub area: CellArea,
}

impl DisplayRequest {
    pub fn new(path: impl Into<PathBuf>, area: CellArea) -> Self {
        Self {
            path: path.into(),
            area,
        }
    }
}

pub trait ImageDisplayer {
    /// Draw the image at `request.path` inside `request.area`.
    fn draw(&mut self, request: &DisplayRequest) -> Result<()>;

    /// Erase whatever this backend drew in `area`.
    fn clear(&mut self, area: CellArea) -> Result<()>;

    /// Release every resource the backend holds.
    fn quit(&mut self) -> Result<()>;
}

/// Registry keys of the built-in backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Kitty,
    Sixel,
    ITerm2,
    Urxvt,
    UrxvtFullscreen,
    Terminology,
    W3m,
    Ueberzug,
}

impl BackendKind {
    pub const ALL: [BackendKind; 8] = [
        BackendKind::Kitty,
        BackendKind::Sixel,
        BackendKind::ITerm2,
        BackendKind::Urxvt,
        BackendKind::UrxvtFullscreen,
        BackendKind::Terminology,
        BackendKind::W3m,
        BackendKind::Ueberzug,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            BackendKind::Kitty => "kitty",
            BackendKind::Sixel => "sixel",
            BackendKind::ITerm2 => "iterm2",
            BackendKind::Urxvt => "urxvt",
            BackendKind::UrxvtFullscreen => "urxvt-full",
            BackendKind::Terminology => "terminology",
            BackendKind::W3m => "w3m",
            BackendKind::Ueberzug => "ueberzug",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BackendKind {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| unknown_method(s))
    }
}

fn unknown_method(key: &str) -> ImageError {
    ImageError::unsupported(format!(
        "\"{}\" does not appear to be a valid image display method",
        key
    ))
}

/// Stand-in for an unknown registry key. Construction always succeeds so
/// callers can hold it like any other backend; every operation fails.
#[derive(Debug, Clone)]
pub struct UnsupportedDisplayer {
    key: String,
}

impl UnsupportedDisplayer {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl ImageDisplayer for UnsupportedDisplayer {
    fn draw(&mut self, _request: &DisplayRequest) -> Result<()> {
        Err(unknown_method(&self.key))
    }

    fn clear(&mut self, _area: CellArea) -> Result<()> {
        Err(unknown_method(&self.key))
    }

    fn quit(&mut self) -> Result<()> {
        Err(unknown_method(&self.key))
    }
}

pub enum Displayer {
    Kitty(KittyDisplayer),
    Sixel(SixelDisplayer),
    ITerm2(ITerm2Displayer),
    Urxvt(UrxvtDisplayer),
    UrxvtFullscreen(UrxvtDisplayer),
    Terminology(TerminologyDisplayer),
    W3m(W3mDisplayer),
    Ueberzug(UeberzugDisplayer),
    Unsupported(UnsupportedDisplayer),
}

macro_rules! each_variant {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Displayer::Kitty($inner) => $body,
            Displayer::Sixel($inner) => $body,
            Displayer::ITerm2($inner) => $body,
            Displayer::Urxvt($inner) => $body,
            Displayer::UrxvtFullscreen($inner) => $body,
            Displayer::Terminology($inner) => $body,
            Displayer::W3m($inner) => $body,
            Displayer::Ueberzug($inner) => $body,
            Displayer::Unsupported($inner) => $body,
        }
    };
}

impl Displayer {
    /// `None` for the unsupported stand-in.
    pub fn kind(&self) -> Option<BackendKind> {
        match self {
            Displayer::Kitty(_) => Some(BackendKind::Kitty),
            Displayer::Sixel(_) => Some(BackendKind::Sixel),
            Displayer::ITerm2(_) => Some(BackendKind::ITerm2),
            Displayer::Urxvt(_) => Some(BackendKind::Urxvt),
            Displayer::UrxvtFullscreen(_) => Some(BackendKind::UrxvtFullscreen),
            Displayer::Terminology(_) => Some(BackendKind::Terminology),
            Displayer::W3m(_) => Some(BackendKind::W3m),
            Displayer::Ueberzug(_) => Some(BackendKind::Ueberzug),
            Displayer::Unsupported(_) => None,
        }
    }

    /// Forward the host's "source file changed" notification. Only the
    /// sixel backend caches per file; for the rest this does nothing.
    pub fn invalidate_source(&mut self, path: &Path) -> usize {
        match self {
            Displayer::Sixel(sixel) => sixel.invalidate(path),
            _ => 0,
        }
    }
}

impl ImageDisplayer for Displayer {
    fn draw(&mut self, request: &DisplayRequest) -> Result<()> {
        each_variant!(self, inner => inner.draw(request))
    }

    fn clear(&mut self, area: CellArea) -> Result<()> {
        each_variant!(self, inner => inner.clear(area))
    }

    fn quit(&mut self) -> Result<()> {
        each_variant!(self, inner => inner.quit())
    }
}

impl fmt::Debug for Displayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Displayer::Unsupported(inner) => write!(f, "Displayer::Unsupported({:?})", inner.key()),
            other => match other.kind() {
                Some(kind) => write!(f, "Displayer::{}", kind),
                None => f.write_str("Displayer"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keys_round_trip() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.key().parse::<BackendKind>().unwrap(), kind);
        }
        assert_eq!(BackendKind::UrxvtFullscreen.to_string(), "urxvt-full");
        assert!("sixels".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_unsupported_fails_every_operation() {
        let mut displayer = Displayer::Unsupported(UnsupportedDisplayer::new("nope"));
        let request = DisplayRequest::new("/tmp/a.png", CellArea::new(0, 0, 10, 10));

        let err = displayer.draw(&request).unwrap_err();
        assert!(err.is_permanent());
        assert!(err.to_string().contains("\"nope\""));
        assert!(displayer.clear(CellArea::default()).unwrap_err().is_permanent());
        assert!(displayer.quit().unwrap_err().is_permanent());
        assert_eq!(displayer.kind(), None);
    }

    #[test]
    fn test_invalidate_is_noop_for_uncached_backends() {
        let mut displayer = Displayer::Unsupported(UnsupportedDisplayer::new("x"));
        assert_eq!(displayer.invalidate_source(Path::new("/tmp/a.png")), 0);
    }
}
