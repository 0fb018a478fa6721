pub type StampResult<T> = Result<T, StampError>;

/// Errors produced by the stamping pipeline.
///
/// Absent or unparseable capture metadata is *not* represented here — the
/// extractor falls back to the file modification time instead (see
/// [`crate::exif::extract`]).
#[derive(thiserror::Error, Debug)]
pub enum StampError {
    /// The byte buffer could not be decoded as an image. The pipeline skips
    /// the affected image and reports it; the rest of the batch proceeds.
    #[error("failed to decode image `{name}`: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// Re-encoding the stamped surface failed.
    #[error("failed to encode stamped image: {0}")]
    Encode(#[from] image::ImageError),

    /// Glyph shaping or rasterization failed.
    #[error("render error: {0}")]
    Render(String),

    /// A configured color string could not be parsed as a CSS color.
    #[error("invalid color `{0}`")]
    InvalidColor(String),

    /// The file has no recognized image extension.
    #[error("unsupported image type: `{0}`")]
    Unsupported(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StampError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
