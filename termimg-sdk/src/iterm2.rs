// ABOUTME: iTerm2 inline image backend (OSC 1337 File=) with header-only size sniffing
// ABOUTME: Reads PNG, GIF and JPEG dimensions straight from file bytes, no decoder needed

use crate::context::{BackendContext, Host};
use crate::displayer::{CellArea, DisplayRequest, ImageDisplayer};
use crate::error::Result;
use crate::scaling::fit_width;
use crate::term::{with_cursor_at, OscFraming, TermIo};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

const HEADER_LEN: usize = 24;
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Gif,
    Jpeg,
}

/// Identify the format from the first bytes of a file.
pub fn sniff_format(header: &[u8]) -> Option<ImageFormat> {
    if matches!(header.get(6..10), Some(b"JFIF") | Some(b"Exif"))
        || header.starts_with(b"\xff\xd8\xff\xdb")
    {
        Some(ImageFormat::Jpeg)
    } else if header.starts_with(PNG_SIGNATURE) {
        Some(ImageFormat::Png)
    } else if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else {
        None
    }
}

/// Native `(width, height)` parsed from the file contents. Unknown formats
/// and truncated headers give `(0, 0)`.
pub fn parse_dimensions(data: &[u8]) -> (u32, u32) {
    if data.len() < HEADER_LEN {
        return (0, 0);
    }
    let dims = match sniff_format(data) {
        Some(ImageFormat::Png) => Some((be_u32(data, 16), be_u32(data, 20))),
        Some(ImageFormat::Gif) => Some((
            u32::from(u16::from_le_bytes([data[6], data[7]])),
            u32::from(u16::from_le_bytes([data[8], data[9]])),
        )),
        Some(ImageFormat::Jpeg) => jpeg_dimensions(data),
        None => None,
    };
    dims.unwrap_or((0, 0))
}

/// Read `path` and parse its dimensions.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    Ok(parse_dimensions(&fs::read(path)?))
}

fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes([*data.get(at)?, *data.get(at + 1)?]))
}

/// Walk marker segments to the first start-of-frame and read its size.
fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut pos = 2;
    loop {
        while *data.get(pos)? == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos)?;
        pos += 1;

        let len = usize::from(be_u16(data, pos)?);
        if len < 2 {
            return None;
        }

        // SOF0..SOF15, minus DHT (C4), JPG (C8) and DAC (CC)
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            // length, precision, then height and width
            let height = be_u16(data, pos + 3)?;
            let width = be_u16(data, pos + 5)?;
            return Some((u32::from(width), u32::from(height)));
        }
        pos += len;
    }
}

/// Complete OSC 1337 sequence for `data` shown `width_px` pixels wide.
pub fn format_inline_image(framing: &OscFraming, data: &[u8], width_px: u32) -> String {
    format!(
        "{}]1337;File=inline=1;preserveAspectRatio=0;size={};width={}px:{}{}\n",
        framing.open,
        data.len(),
        width_px,
        STANDARD.encode(data),
        framing.close
    )
}

pub struct ITerm2Displayer {
    term: Box<dyn TermIo>,
    host: Arc<dyn Host>,
    framing: OscFraming,
    font_width: u32,
    font_height: u32,
}

impl ITerm2Displayer {
    pub fn new(ctx: &BackendContext) -> Self {
        Self {
            term: ctx.open_terminal(),
            host: ctx.host.clone(),
            framing: OscFraming::for_term(&ctx.term),
            font_width: ctx.settings.iterm2_font_width,
            font_height: ctx.settings.iterm2_font_height,
        }
    }

    /// The escape sequence for `request`, or `None` when there is nothing to draw.
    fn encode(&self, request: &DisplayRequest) -> Result<Option<String>> {
        let area = request.area;
        if area.width == 0 || area.height == 0 {
            return Ok(None);
        }

        let data = fs::read(&request.path)?;
        let (width, height) = parse_dimensions(&data);
        if width == 0 || height == 0 {
            log::debug!("Unrecognized image header in {}", request.path.display());
            return Ok(None);
        }

        let width_px = fit_width(
            width,
            height,
            u32::from(area.width),
            u32::from(area.height),
            self.font_width,
            self.font_height,
        ) as u32;
        Ok(Some(format_inline_image(&self.framing, &data, width_px)))
    }
}

impl ImageDisplayer for ITerm2Displayer {
    fn draw(&mut self, request: &DisplayRequest) -> Result<()> {
        let Some(sequence) = self.encode(request)? else {
            return Ok(());
        };
        let area = request.area;
        with_cursor_at(self.term.writer(), area.y, area.x, |out| {
            out.write_all(sequence.as_bytes())?;
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
