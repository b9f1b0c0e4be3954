use alloc::string::String;

/// Errors from BMP/JPEG conversion.
///
/// Every error is terminal for the conversion that raised it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConvertError {
    #[error("failed to allocate {bytes} bytes")]
    AllocationFailure { bytes: usize },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("jpeg codec failure: {0}")]
    Codec(String),

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

impl ConvertError {
    /// Whether this error came from the OS boundary (open/read/write/seek).
    pub fn is_io(&self) -> bool {
        matches!(self, ConvertError::Io(_))
    }
}

impl From<jpeg_encoder::EncodingError> for ConvertError {
    fn from(e: jpeg_encoder::EncodingError) -> Self {
        ConvertError::Codec(alloc::format!("{e}"))
    }
}

impl From<zune_jpeg::errors::DecodeErrors> for ConvertError {
    fn from(e: zune_jpeg::errors::DecodeErrors) -> Self {
        ConvertError::Codec(alloc::format!("{e:?}"))
    }
}
