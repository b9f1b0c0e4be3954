use crate::error::ConvertError;

/// Image format detected from magic bytes.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Windows bitmap container (`BM`).
    Bmp,
    /// JPEG interchange stream (SOI marker `FF D8 FF`).
    Jpeg,
}

impl ImageFormat {
    /// Sniff the format from the first bytes of a file.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match data {
            [b'B', b'M', ..] => Some(Self::Bmp),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Pixel memory layout.
///
/// `Bgr8` is the container's native true-color order; `Rgb8` and `Gray8`
/// are what the JPEG codec consumes and produces. 8-bit palette indices
/// travel as `Gray8`.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// Single channel, 8-bit grayscale (or raw palette index).
    Gray8,
    /// 3 channels, 8-bit RGB.
    Rgb8,
    /// 3 channels, 8-bit BGR.
    Bgr8,
}

impl PixelLayout {
    /// Bytes per pixel for this layout.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgb8 | Self::Bgr8 => 3,
        }
    }

    /// Number of channels. Identical to bytes per pixel for 8-bit layouts.
    pub fn channels(&self) -> usize {
        self.bytes_per_pixel()
    }

    /// Layout of a codec-side buffer with `components` samples per pixel.
    pub fn from_components(components: usize) -> Result<Self, ConvertError> {
        match components {
            1 => Ok(Self::Gray8),
            3 => Ok(Self::Rgb8),
            other => Err(ConvertError::UnsupportedFormat(alloc::format!(
                "{other} components per pixel (supported: 1, 3)"
            ))),
        }
    }

    /// Layout of a container pixel plane with the given bit depth.
    pub fn from_bits_per_pixel(bits_per_pixel: u16) -> Result<Self, ConvertError> {
        match bits_per_pixel {
            8 => Ok(Self::Gray8),
            24 => Ok(Self::Bgr8),
            other => Err(ConvertError::UnsupportedFormat(alloc::format!(
                "{other} bits per pixel (supported: 8, 24)"
            ))),
        }
    }

    pub fn bits_per_pixel(&self) -> u16 {
        (self.bytes_per_pixel() * 8) as u16
    }

    /// Whether this layout has the same memory representation as `other`.
    pub fn is_memory_compatible(&self, other: PixelLayout) -> bool {
        *self == other
    }
}

/// Typed pixels a [`PackedImage`](crate::PackedImage) can be viewed as.
pub trait PackedPixel: Copy + 'static {
    fn layout() -> PixelLayout;
}

impl PackedPixel for rgb::RGB8 {
    fn layout() -> PixelLayout {
        PixelLayout::Rgb8
    }
}

impl PackedPixel for rgb::Gray<u8> {
    fn layout() -> PixelLayout {
        PixelLayout::Gray8
    }
}
