// ABOUTME: urxvt background-image backend (OSC 20) sized in percent of the window
// ABOUTME: Pane mode pins the image right of the preview column; fullscreen centres it

use crate::context::{BackendContext, Host};
use crate::displayer::{CellArea, DisplayRequest, ImageDisplayer};
use crate::error::Result;
use crate::term::{OscFraming, TermIo};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrxvtLayout {
    /// Image under the preview column, sized from the column ratios.
    Pane,
    /// Whole terminal, centred.
    Fullscreen,
}

/// Size and centre of the image, all in percent of the terminal window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl Placement {
    pub const FULL: Placement = Placement {
        width: 100,
        height: 100,
        x: 50,
        y: 50,
    };

    /// Right-aligned, full height, as wide as the last column's share.
    pub fn pane(column_ratios: &[u32]) -> Self {
        let total: u32 = column_ratios.iter().sum();
        let preview = column_ratios.last().copied().unwrap_or(0);
        let width = if total == 0 { 100 } else { 100 * preview / total };
        Placement {
            width,
            height: 100,
            x: 100,
            y: 2,
        }
    }
}

pub struct UrxvtDisplayer {
    term: Box<dyn TermIo>,
    host: Arc<dyn Host>,
    framing: OscFraming,
    layout: UrxvtLayout,
    column_ratios: Vec<u32>,
}

impl UrxvtDisplayer {
    pub fn new(ctx: &BackendContext, layout: UrxvtLayout) -> Self {
        let mut framing = OscFraming::for_term(&ctx.term);
        framing.open.push_str("]20;");
        Self {
            term: ctx.open_terminal(),
            host: ctx.host.clone(),
            framing,
            layout,
            column_ratios: ctx.settings.column_ratios.clone(),
        }
    }

    pub fn layout(&self) -> UrxvtLayout {
        self.layout
    }

    pub fn placement(&self) -> Placement {
        match self.layout {
            UrxvtLayout::Fullscreen => Placement::FULL,
            UrxvtLayout::Pane if self.host.pager_visible() => Placement::FULL,
            UrxvtLayout::Pane => Placement::pane(&self.column_ratios),
        }
    }

    pub fn format_draw(&self, path: &Path) -> String {
        let p = self.placement();
        format!(
            "{}{};{}x{}+{}+{}:op=keep-aspect{}",
            self.framing.open,
            path.display(),
            p.width,
            p.height,
            p.x,
            p.y,
            self.framing.close
        )
    }

    pub fn format_clear(&self) -> String {
        format!(
            "{};100x100+1000+1000{}",
            self.framing.open, self.framing.close
        )
    }

    fn emit(&mut self, sequence: &str) -> Result<()> {
        let out = self.term.writer();
        out.write_all(sequence.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl ImageDisplayer for UrxvtDisplayer {
    /// Cell coordinates are ignored; urxvt positions by percentage.
    fn draw(&mut self, request: &DisplayRequest) -> Result<()> {
        let sequence = self.format_draw(&request.path);
        self.emit(&sequence)
    }

    fn clear(&mut self, _area: CellArea) -> Result<()> {
        let sequence = self.format_clear();
        self.emit(&sequence)
    }

    fn quit(&mut self) -> Result<()> {
        self.clear(CellArea::default())
    }
}
