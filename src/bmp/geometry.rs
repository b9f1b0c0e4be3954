//! Row stride, padding and palette-size arithmetic for the BMP pixel plane.
//!
//! Everything here is derived from `bits_per_pixel` and `width`; the
//! on-disk `image_size` field is never trusted (it may legitimately be 0).

use crate::error::ConvertError;
use crate::pixel::PixelLayout;

/// Size of one palette entry (B, G, R, reserved).
pub const PALETTE_ENTRY_SIZE: usize = 4;
/// Palette entry count implied by `colors_used == 0`.
pub const DEFAULT_PALETTE_ENTRIES: usize = 256;

/// Bytes per row, rounded up to a 32-bit boundary: `ceil(bpp * width / 32) * 4`.
pub fn stride(bits_per_pixel: u16, width: u32) -> usize {
    let bits = u64::from(bits_per_pixel) * u64::from(width);
    (bits.div_ceil(32) * 4) as usize
}

/// Palette size in bytes for a given `colors_used` field.
pub fn color_map_size(colors_used: u32) -> usize {
    let entries = if colors_used == 0 {
        DEFAULT_PALETTE_ENTRIES
    } else {
        colors_used as usize
    };
    entries * PALETTE_ENTRY_SIZE
}

/// Layout of a container pixel plane, fully derived from header fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneGeometry {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    /// Bytes per row including padding.
    pub stride: usize,
}

impl PlaneGeometry {
    /// Geometry for an 8-bit or 24-bit plane.
    ///
    /// Fails with `UnsupportedFormat` for any other depth, before anything
    /// is allocated.
    pub fn new(width: u32, height: u32, bits_per_pixel: u16) -> Result<Self, ConvertError> {
        let layout = PixelLayout::from_bits_per_pixel(bits_per_pixel)?;
        if width == 0 || height == 0 {
            return Err(ConvertError::InvalidFormat(alloc::format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        let geometry = Self {
            width,
            height,
            layout,
            stride: stride(bits_per_pixel, width),
        };
        geometry.plane_len()?;
        Ok(geometry)
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.layout.bytes_per_pixel()
    }

    pub fn bits_per_pixel(&self) -> u16 {
        self.layout.bits_per_pixel()
    }

    /// Pixel bytes per row, excluding padding.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    /// Padding bytes at the end of each row.
    pub fn padding(&self) -> usize {
        self.stride - self.row_bytes()
    }

    /// `stride * height`, checked.
    pub fn plane_len(&self) -> Result<usize, ConvertError> {
        self.stride
            .checked_mul(self.height as usize)
            .ok_or(ConvertError::DimensionsTooLarge {
                width: self.width,
                height: self.height,
            })
    }

    /// `width * height * bytes_per_pixel`, checked.
    pub fn packed_len(&self) -> Result<usize, ConvertError> {
        self.row_bytes()
            .checked_mul(self.height as usize)
            .ok_or(ConvertError::DimensionsTooLarge {
                width: self.width,
                height: self.height,
            })
    }
}
