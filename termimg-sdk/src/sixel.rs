// ABOUTME: Sixel backend: converts images with ImageMagick and caches the raster in mmaps
// ABOUTME: Cache entries are keyed by cell box and inode so renames hit and replacements miss

use crate::constants::env::MAGICK_OCL_DEVICE;
use crate::constants::sixel::{CONVERT, MAGICK};
use crate::context::{BackendContext, Host};
use crate::displayer::{CellArea, DisplayRequest, ImageDisplayer};
use crate::error::{ImageError, Result};
use crate::geometry::GeometryProvider;
use crate::process::find_program;
use crate::term::{with_cursor_at, TermIo};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SixelCacheKey {
    pub width: u16,
    pub height: u16,
    pub inode: u64,
}

/// Rendered sixel bytes. The mapping is only valid while `file` stays open.
pub struct SixelCacheEntry {
    mmap: Mmap,
    _file: File,
}

impl SixelCacheEntry {
    fn from_file(file: File) -> Result<Self> {
        if file.metadata()?.len() == 0 {
            return Err(ImageError::display(
                "ImageMagick produced an empty SIXEL image file",
            ));
        }
        // SAFETY: the file is an unlinked temp file private to this process
        let mmap = unsafe { Mmap::map(&file) }?;
        Ok(Self { mmap, _file: file })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }
}

/// Produces sixel data for `source` fitted into `width`×`height` pixels,
/// written to `out`.
pub trait SixelConverter: Send {
    fn convert(
        &self,
        source: &Path,
        width: u32,
        height: u32,
        dithering: &str,
        out: File,
    ) -> Result<()>;
}

/// ImageMagick via `magick` (7+) or the older `convert`.
#[derive(Debug, Clone)]
pub struct MagickConverter {
    program: PathBuf,
}

impl MagickConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn discover() -> Result<Self> {
        find_program(MAGICK)
            .or_else(|| find_program(CONVERT))
            .map(Self::new)
            .ok_or_else(|| ImageError::unsupported("SIXEL image previews require ImageMagick"))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

/// Arguments for one conversion: first frame only, shrink-only geometry.
pub fn converter_args(source: &Path, width: u32, height: u32, dithering: &str) -> Vec<String> {
    vec![
        format!("{}[0]", source.display()),
        "-geometry".to_string(),
        format!("{}x{}>", width, height),
        "-dither".to_string(),
        dithering.to_string(),
        "sixel:-".to_string(),
    ]
}

impl SixelConverter for MagickConverter {
    fn convert(
        &self,
        source: &Path,
        width: u32,
        height: u32,
        dithering: &str,
        out: File,
    ) -> Result<()> {
        let mut command = Command::new(&self.program);
        command
            .args(converter_args(source, width, height, dithering))
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::null());
        if std::env::var_os(MAGICK_OCL_DEVICE).is_none() {
            command.env(MAGICK_OCL_DEVICE, "true");
        }

        let status = command.status().map_err(|e| {
            ImageError::display(format!("failed to run {}: {}", self.program.display(), e))
        })?;
        if !status.success() {
            return Err(ImageError::display(
                "ImageMagick failed processing the SIXEL image",
            ));
        }
        Ok(())
    }
}

pub struct SixelDisplayer {
    term: Box<dyn TermIo>,
    geometry: Arc<dyn GeometryProvider>,
    host: Arc<dyn Host>,
    dithering: String,
    converter: Option<Box<dyn SixelConverter>>,
    cache: HashMap<SixelCacheKey, SixelCacheEntry>,
}

impl SixelDisplayer {
    pub fn new(ctx: &BackendContext) -> Self {
        Self {
            term: ctx.open_terminal(),
            geometry: ctx.geometry.clone(),
            host: ctx.host.clone(),
            dithering: ctx.settings.sixel_dithering.clone(),
            converter: None,
            cache: HashMap::new(),
        }
    }

    /// Use a specific converter instead of looking up ImageMagick on first use.
    pub fn with_converter(mut self, converter: Box<dyn SixelConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Drop every entry whose inode matches the file currently at `path`.
    /// A path that no longer exists evicts nothing.
    pub fn invalidate(&mut self, path: &Path) -> usize {
        let Ok(inode) = inode_of(path) else {
            return 0;
        };
        let before = self.cache.len();
        self.cache.retain(|key, _| key.inode != inode);
        let evicted = before - self.cache.len();
        if evicted > 0 {
            log::debug!("Evicted {} sixel entries for {}", evicted, path.display());
        }
        evicted
    }

    /// Make sure the raster for `path` at this cell box is cached.
    fn ensure_cached(&mut self, path: &Path, area: CellArea) -> Result<SixelCacheKey> {
        let key = SixelCacheKey {
            width: area.width,
            height: area.height,
            inode: inode_of(path)?,
        };

        if !self.cache.contains_key(&key) {
            log::debug!("Sixel cache miss for {:?}", key);
            let entry = self.convert(path, area)?;
            self.cache.insert(key, entry);
        }
        Ok(key)
    }

    fn convert(&mut self, path: &Path, area: CellArea) -> Result<SixelCacheEntry> {
        let cell = self
            .geometry
            .cell_size()
            .map_err(|e| ImageError::display(format!("failed to query terminal size: {}", e)))?;
        let (width, height) = cell.pixel_box(area.width, area.height);

        if self.converter.is_none() {
            self.converter = Some(Box::new(MagickConverter::discover()?));
        }
        let converter = self
            .converter
            .as_ref()
            .ok_or_else(|| ImageError::unsupported("SIXEL image previews require ImageMagick"))?;

        let spool = tempfile::tempfile()?;
        converter.convert(path, width, height, &self.dithering, spool.try_clone()?)?;
        SixelCacheEntry::from_file(spool)
    }
}

impl ImageDisplayer for SixelDisplayer {
    fn draw(&mut self, request: &DisplayRequest) -> Result<()> {
        let area = request.area;
        // convert before touching the cursor so a failed conversion leaves no output
        let key = self.ensure_cached(&request.path, area)?;
        let entry = self
            .cache
            .get(&key)
            .ok_or_else(|| ImageError::display("sixel cache entry vanished"))?;

        with_cursor_at(self.term.writer(), area.y, area.x, |out| {
            out.write_all(entry.bytes())?;
            Ok(())
        })
    }

    fn clear(&mut self, _area: CellArea) -> Result<()> {
        self.host.request_redraw();
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.clear(CellArea::default())?;
        self.cache.clear();
        Ok(())
    }
}

#[cfg(unix)]
fn inode_of(path: &Path) -> Result<u64> {
    use std::os::unix::fs::MetadataExt;
    Ok(std::fs::metadata(path)?.ino())
}

#[cfg(not(unix))]
fn inode_of(path: &Path) -> Result<u64> {
    use std::hash::{Hash, Hasher};
    let canonical = std::fs::canonicalize(path)?;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    canonical.hash(&mut hasher);
    Ok(hasher.finish())
}
