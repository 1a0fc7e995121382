// ABOUTME: terminology inline media backend
// ABOUTME: Announces the file, then fills the cell box with placeholder glyphs the terminal replaces

use crate::context::{BackendContext, Host};
use crate::displayer::{CellArea, DisplayRequest, ImageDisplayer};
use crate::error::Result;
use crate::term::{move_cursor, with_cursor_at, TermIo};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

const OPEN: &str = "\x1b";
const CLOSE: &str = "\0";

/// Media intent for a `width`×`height` cell box.
pub fn format_intent(path: &Path, width: u16, height: u16) -> String {
    format!(
        "{}}}ic#{};{};{}{}",
        OPEN,
        width,
        height,
        path.display(),
        CLOSE
    )
}

/// One row of replacement glyphs.
pub fn format_row(width: u16) -> String {
    format!(
        "{}}}ib{}{}{}}}ie{}\n",
        OPEN,
        CLOSE,
        "#".repeat(usize::from(width)),
        OPEN,
        CLOSE
    )
}

pub struct TerminologyDisplayer {
    term: Box<dyn TermIo>,
    host: Arc<dyn Host>,
}

impl TerminologyDisplayer {
    pub fn new(ctx: &BackendContext) -> Self {
        Self {
            term: ctx.open_terminal(),
            host: ctx.host.clone(),
        }
    }
}

impl ImageDisplayer for TerminologyDisplayer {
    fn draw(&mut self, request: &DisplayRequest) -> Result<()> {
        let area = request.area;
        let intent = format_intent(&request.path, area.width, area.height);
        let row = format_row(area.width);

        with_cursor_at(self.term.writer(), area.y, area.x, |out| {
            out.write_all(intent.as_bytes())?;
            for offset in 0..area.height {
                move_cursor(out, area.y + offset, area.x)?;
                out.write_all(row.as_bytes())?;
            }
            Ok(())
        })
    }

    fn clear(&mut self, _area: CellArea) -> Result<()> {
        self.host.request_redraw();
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.clear(CellArea::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{RecordingHost, ScriptedTerm};

    #[test]
    fn test_sequences() {
        assert_eq!(
            format_intent(Path::new("/tmp/a.png"), 3, 2),
            "\x1b}ic#3;2;/tmp/a.png\0"
        );
        assert_eq!(format_row(3), "\x1b}ib\0###\x1b}ie\0\n");
    }

    #[test]
    fn test_draw_fills_every_row() {
        let term = ScriptedTerm::new();
        let host = Arc::new(RecordingHost::new());
        let handle = term.clone();
        let ctx = BackendContext::default()
            .with_host(host.clone())
            .with_terminal(move || Box::new(handle.clone()));
        let mut display = TerminologyDisplayer::new(&ctx);

        display
            .draw(&DisplayRequest::new("/tmp/a.png", CellArea::new(1, 2, 3, 2)))
            .unwrap();
        insta::assert_snapshot!(
            term.output_string().escape_debug().to_string(),
            @r"\u{1b}7\u{1b}[3;2H\u{1b}}ic#3;2;/tmp/a.png\0\u{1b}[3;2H\u{1b}}ib\0###\u{1b}}ie\0\n\u{1b}[4;2H\u{1b}}ib\0###\u{1b}}ie\0\n\u{1b}8"
        );

        display.clear(CellArea::new(1, 2, 3, 2)).unwrap();
        display.quit().unwrap();
        assert_eq!(host.redraws(), 2);
    }
}
