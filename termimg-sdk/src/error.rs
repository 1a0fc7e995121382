// ABOUTME: Error types shared by every image display backend
// ABOUTME: Separates permanent "unsupported" failures from recoverable per-draw failures

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImageError>;

#[derive(Debug, Error)]
pub enum ImageError {
    /// The backend cannot work in this terminal or environment. The caller
    /// should discard the backend and pick another one.
    #[error("Image display method unsupported: {0}")]
    Unsupported(String),

    /// A single draw or clear failed; the backend stays usable.
    #[error("Image display error: {0}")]
    Display(String),
}

impl ImageError {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        ImageError::Unsupported(reason.into())
    }

    pub fn display(reason: impl Into<String>) -> Self {
        ImageError::Display(reason.into())
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, ImageError::Unsupported(_))
    }

    pub fn help_text(&self) -> Option<&'static str> {
        match self {
            ImageError::Unsupported(reason) if reason.contains("w3mimgdisplay") => {
                Some("Install w3m or point W3MIMGDISPLAY_PATH at the w3mimgdisplay binary")
            }
            ImageError::Unsupported(reason) if reason.contains("ImageMagick") => {
                Some("Sixel previews require ImageMagick (`magick` or `convert` on PATH)")
            }
            ImageError::Unsupported(reason) if reason.contains("ueberzug") => {
                Some("Install ueberzug, or choose another method; it needs an X11 session")
            }
            ImageError::Unsupported(_) => {
                Some("Choose another display method for this terminal")
            }
            ImageError::Display(_) => None,
        }
    }
}

impl From<std::io::Error> for ImageError {
    fn from(err: std::io::Error) -> Self {
        ImageError::Display(err.to_string())
    }
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::Display(format!("failed to process image: {}", err))
    }
}

impl From<serde_json::Error> for ImageError {
    fn from(err: serde_json::Error) -> Self {
        ImageError::Display(format!("failed to encode command: {}", err))
    }
}
