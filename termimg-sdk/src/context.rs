// ABOUTME: Narrow host capabilities injected into every backend at construction
// ABOUTME: Bundles settings, geometry, repaint callback and a terminal factory

use crate::constants::env;
use crate::geometry::{GeometryProvider, TerminalGeometry};
use crate::settings::DisplaySettings;
use crate::term::{StdTerm, TermIo};
use std::sync::Arc;

/// What a backend may ask of the host application.
pub trait Host: Send + Sync {
    /// Repaint the text UI after an image was erased without graphics support.
    fn request_redraw(&self) {}

    /// Whether a full-screen pager currently covers the preview column.
    fn pager_visible(&self) -> bool {
        false
    }
}

/// Host that ignores every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}

pub type TerminalFactory = Arc<dyn Fn() -> Box<dyn TermIo> + Send + Sync>;

#[derive(Clone)]
pub struct BackendContext {
    pub settings: DisplaySettings,
    pub geometry: Arc<dyn GeometryProvider>,
    pub host: Arc<dyn Host>,
    /// Value of `TERM`, read once when the context is built.
    pub term: String,
    terminal: TerminalFactory,
}

impl BackendContext {
    pub fn new(settings: DisplaySettings) -> Self {
        Self {
            settings,
            geometry: Arc::new(TerminalGeometry::new()),
            host: Arc::new(NullHost),
            term: std::env::var(env::TERM).unwrap_or_default(),
            terminal: Arc::new(|| Box::new(StdTerm::new())),
        }
    }

    pub fn with_geometry(mut self, geometry: Arc<dyn GeometryProvider>) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = host;
        self
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn with_terminal<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TermIo> + Send + Sync + 'static,
    {
        self.terminal = Arc::new(factory);
        self
    }

    /// A fresh handle on the terminal; each backend keeps its own.
    pub fn open_terminal(&self) -> Box<dyn TermIo> {
        (self.terminal)()
    }
}

impl Default for BackendContext {
    fn default() -> Self {
        Self::new(DisplaySettings::default())
    }
}

impl std::fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendContext")
            .field("settings", &self.settings)
            .field("term", &self.term)
            .finish_non_exhaustive()
    }
}
