// ABOUTME: Kitty terminal graphics protocol implementation
// ABOUTME: Negotiates the transfer medium once, then sends chunked, acknowledged images

use crate::constants::kitty::{
    DEVICE_ATTRIBUTES_QUERY, DEVICE_ATTRIBUTES_REPLY, MAX_CHUNK_LEN, PROTOCOL_END, PROTOCOL_START,
    SPOOL_DIR_NAME, THUMBNAIL_PREFIX, WINDOW_SIZE_COMMAND,
};
use crate::context::{BackendContext, Host};
use crate::displayer::{CellArea, DisplayRequest, ImageDisplayer};
use crate::error::{ImageError, Result};
use crate::geometry::{cell_size_with_fallback, query_pixel_size, CellSize, GeometryProvider};
use crate::scaling::ImageScaler;
use crate::term::{with_cursor_at, TermIo};
use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ImageEncoder};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How image data reaches the terminal, fixed by the first negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferMode {
    /// Raw pixels inline in the command payload (no shared filesystem).
    Stream,
    /// PNG files in a spool directory the terminal reads and deletes.
    File { spool_dir: PathBuf },
}

/// What the terminal said to the support query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportReply {
    /// Terminal could read our scratch file.
    SharedFilesystem,
    /// Terminal speaks the protocol but cannot see our files.
    StreamOnly,
}

#[derive(Debug, Clone)]
struct Session {
    mode: TransferMode,
    cell: CellSize,
}

#[derive(Debug, Clone)]
enum KittyState {
    /// Negotiation deferred until the first draw.
    Uninitialized,
    Ready(Session),
    /// Permanent; every later call fails with the stored reason.
    Failed(String),
}

pub struct KittyDisplayer {
    term: Box<dyn TermIo>,
    geometry: Arc<dyn GeometryProvider>,
    host: Arc<dyn Host>,
    state: KittyState,
    image_id: u32,
    spool_parent: PathBuf,
    scaler: ImageScaler,
}

impl KittyDisplayer {
    /// Only stores its collaborators; the terminal is not touched until the
    /// first draw.
    pub fn new(ctx: &BackendContext) -> Self {
        Self {
            term: ctx.open_terminal(),
            geometry: ctx.geometry.clone(),
            host: ctx.host.clone(),
            state: KittyState::Uninitialized,
            image_id: 0,
            spool_parent: std::env::temp_dir(),
            scaler: ImageScaler::new(),
        }
    }

    /// Place the spool directory somewhere other than the system temp dir.
    pub fn with_spool_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.spool_parent = parent.into();
        self
    }

    /// Id of the most recent image still on screen; 0 when none.
    pub fn image_id(&self) -> u32 {
        self.image_id
    }

    /// Negotiated transfer mode, once a draw has happened.
    pub fn transfer_mode(&self) -> Option<&TransferMode> {
        match &self.state {
            KittyState::Ready(session) => Some(&session.mode),
            _ => None,
        }
    }

    fn ensure_ready(&mut self) -> Result<Session> {
        match &self.state {
            KittyState::Ready(session) => return Ok(session.clone()),
            KittyState::Failed(reason) => return Err(ImageError::unsupported(reason.clone())),
            KittyState::Uninitialized => {}
        }

        match self.negotiate() {
            Ok(session) => {
                log::debug!("Kitty graphics negotiated: {:?}", session.mode);
                self.state = KittyState::Ready(session.clone());
                Ok(session)
            }
            Err(ImageError::Unsupported(reason)) => {
                self.state = KittyState::Failed(reason.clone());
                Err(ImageError::Unsupported(reason))
            }
            Err(other) => Err(other),
        }
    }

    fn negotiate(&mut self) -> Result<Session> {
        let response = self.query_support()?;
        let mode = match classify_support_reply(&response)? {
            SupportReply::SharedFilesystem => TransferMode::File {
                spool_dir: create_spool_dir(&self.spool_parent)?,
            },
            SupportReply::StreamOnly => TransferMode::Stream,
        };

        let cell = cell_size_with_fallback(self.geometry.as_ref(), || {
            query_pixel_size(WINDOW_SIZE_COMMAND[0], &WINDOW_SIZE_COMMAND[1..])
        })?;
        if cell.is_zero() {
            return Err(ImageError::unsupported(
                "could not determine the terminal cell size in pixels",
            ));
        }

        Ok(Session { mode, cell })
    }

    /// Ask whether the terminal can read a file we write, followed by a
    /// device attributes query whose reply is guaranteed to come last.
    fn query_support(&mut self) -> Result<Vec<u8>> {
        let mut scratch = tempfile::NamedTempFile::new()?;
        scratch.write_all(&[0xFF; 3])?;
        scratch.flush()?;

        let query = [
            ("a", "q".to_string()),
            ("i", "1".to_string()),
            ("f", "24".to_string()),
            ("t", "f".to_string()),
            ("s", "1".to_string()),
            ("v", "1".to_string()),
            ("S", "3".to_string()),
        ];
        let payload = STANDARD.encode(path_bytes(scratch.path()));

        let out = self.term.writer();
        for frame in format_command(&query, Some(payload.as_bytes())) {
            out.write_all(&frame)?;
        }
        out.flush()?;
        out.write_all(DEVICE_ATTRIBUTES_QUERY)?;
        out.flush()?;

        let mut response = Vec::new();
        while !(contains(&response, DEVICE_ATTRIBUTES_REPLY) && response.last() == Some(&b'c')) {
            response.push(self.term.read_byte()?);
        }
        Ok(response)
    }

    /// Block until a complete graphics reply has arrived.
    fn read_reply(&mut self) -> Result<Vec<u8>> {
        let mut reply = Vec::new();
        while !reply.ends_with(PROTOCOL_END) {
            reply.push(self.term.read_byte()?);
        }
        Ok(reply)
    }

    fn build_transfer(
        &self,
        img: &DynamicImage,
        mode: &TransferMode,
        params: &mut Vec<(&'static str, String)>,
    ) -> Result<String> {
        match mode {
            TransferMode::Stream => {
                let channels = u32::from(img.color().channel_count());
                params.push(("t", "d".to_string()));
                params.push(("f", (channels * 8).to_string()));
                params.push(("s", img.width().to_string()));
                params.push(("v", img.height().to_string()));
                Ok(STANDARD.encode(img.as_bytes()))
            }
            TransferMode::File { spool_dir } => {
                params.push(("t", "t".to_string()));
                params.push(("f", "100".to_string()));
                let path = write_thumbnail(img, spool_dir)?;
                Ok(STANDARD.encode(path_bytes(&path)))
            }
        }
    }
}

impl ImageDisplayer for KittyDisplayer {
    fn draw(&mut self, request: &DisplayRequest) -> Result<()> {
        let session = self.ensure_ready()?;

        self.image_id += 1;
        let mut params = vec![("a", "T".to_string()), ("i", self.image_id.to_string())];

        let img = image::open(&request.path)?;
        let (box_width, box_height) = session
            .cell
            .pixel_box(request.area.width, request.area.height);
        let img = normalize_color(self.scaler.fit(img, box_width, box_height));

        let payload = self.build_transfer(&img, &session.mode, &mut params)?;
        let frames = format_command(&params, Some(payload.as_bytes()));

        let area = request.area;
        with_cursor_at(self.term.writer(), area.y, area.x, |out| {
            for frame in &frames {
                out.write_all(frame)?;
            }
            Ok(())
        })?;

        let reply = self.read_reply()?;
        if !contains(&reply, PROTOCOL_START) {
            let reason = format!(
                "terminal answered with a non-graphics reply: {:?}",
                String::from_utf8_lossy(&reply)
            );
            self.state = KittyState::Failed(reason.clone());
            return Err(ImageError::display(reason));
        }
        if contains(&reply, b"OK") {
            Ok(())
        } else {
            Err(ImageError::display(format!(
                "kitty graphics protocol replied {:?}",
                String::from_utf8_lossy(&reply)
            )))
        }
    }

    /// Deletes the most recent image. The terminal does not acknowledge
    /// deletes, so nothing is read back.
    fn clear(&mut self, _area: CellArea) -> Result<()> {
        if !matches!(self.state, KittyState::Ready(_)) {
            return Ok(());
        }

        let params = [("a", "d".to_string()), ("i", self.image_id.to_string())];
        let out = self.term.writer();
        for frame in format_command(&params, None) {
            out.write_all(&frame)?;
        }
        out.flush()?;

        self.image_id = self.image_id.saturating_sub(1);
        self.host.request_redraw();
        Ok(())
    }

    /// Deletes every image still placed. A backend that never became ready,
    /// or failed mid-session, has nothing it can send; its ids are dropped.
    fn quit(&mut self) -> Result<()> {
        if !matches!(self.state, KittyState::Ready(_)) {
            self.image_id = 0;
            return Ok(());
        }
        while self.image_id >= 1 {
            self.clear(CellArea::default())?;
        }
        Ok(())
    }
}

/// Frame a graphics command as `ESC _G k=v,... ; payload ESC \`, splitting
/// the payload into fragments of at most [`MAX_CHUNK_LEN`] bytes. Every
/// fragment but the last carries `m=1`; the last carries `m=0`.
pub fn format_command(params: &[(&str, String)], payload: Option<&[u8]>) -> Vec<Vec<u8>> {
    let central = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",");

    let frame = |more: Option<bool>, chunk: &[u8]| {
        let mut out = Vec::with_capacity(central.len() + chunk.len() + 12);
        out.extend_from_slice(PROTOCOL_START);
        out.extend_from_slice(central.as_bytes());
        match more {
            Some(true) => out.extend_from_slice(b",m=1"),
            Some(false) => out.extend_from_slice(b",m=0"),
            None => {}
        }
        out.push(b';');
        out.extend_from_slice(chunk);
        out.extend_from_slice(PROTOCOL_END);
        out
    };

    let Some(payload) = payload else {
        return vec![frame(None, &[])];
    };

    let chunks: Vec<&[u8]> = payload.chunks(MAX_CHUNK_LEN).collect();
    if chunks.is_empty() {
        return vec![frame(Some(false), &[])];
    }

    let last = chunks.len() - 1;
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| frame(Some(i != last), chunk))
        .collect()
}

/// Decide the transfer medium from the combined support + device
/// attributes response.
pub fn classify_support_reply(response: &[u8]) -> Result<SupportReply> {
    let Some(start) = find(response, PROTOCOL_START) else {
        return Err(ImageError::unsupported(
            "terminal did not respond to kitty graphics query",
        ));
    };

    let graphics = &response[start..];
    let graphics = match find(graphics, PROTOCOL_END) {
        Some(end) => &graphics[..end + PROTOCOL_END.len()],
        None => graphics,
    };

    if contains(graphics, b"OK") {
        Ok(SupportReply::SharedFilesystem)
    } else if contains(graphics, b"EBADF") {
        Ok(SupportReply::StreamOnly)
    } else {
        Err(ImageError::unsupported(format!(
            "unexpected response from terminal emulator: {:?}",
            String::from_utf8_lossy(graphics)
        )))
    }
}

fn create_spool_dir(parent: &Path) -> Result<PathBuf> {
    let dir = parent.join(SPOOL_DIR_NAME);
    if let Err(e) = fs::create_dir(&dir) {
        if !dir.is_dir() {
            return Err(ImageError::unsupported(format!(
                "could not create temporary directory for previews {}: {}",
                dir.display(),
                e
            )));
        }
    }
    Ok(dir)
}

/// RGB or RGBA, the only raw layouts the protocol accepts.
fn normalize_color(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn write_thumbnail(img: &DynamicImage, spool_dir: &Path) -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix(THUMBNAIL_PREFIX)
        .suffix(".png")
        .tempfile_in(spool_dir)?;

    {
        let mut writer = BufWriter::new(file.as_file());
        let encoder =
            PngEncoder::new_with_quality(&mut writer, CompressionType::Fast, PngFilter::NoFilter);
        encoder.write_image(img.as_bytes(), img.width(), img.height(), img.color().into())?;
        writer.flush()?;
    }

    // the terminal deletes the file once it has read it
    let (_, path) = file
        .keep()
        .map_err(|e| ImageError::display(format!("failed to keep thumbnail: {}", e)))?;
    Ok(path)
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}
