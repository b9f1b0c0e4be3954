//! Conversion between the container's pixel plane and the codec's packed
//! buffer.
//!
//! The plane is bottom-up, row-padded to 4 bytes and stores B,G,R; the
//! packed buffer is top-down, unpadded and stores R,G,B. 8-bit images carry
//! raw palette indices in both, passed through unchanged: the palette is
//! never consulted here.

use alloc::vec::Vec;

use log::trace;

use crate::bmp::{PixelPlane, PlaneGeometry};
use crate::error::ConvertError;
use crate::limits::{Limits, try_zeroed, try_zeroed_within};
use crate::packed::PackedImage;
use crate::pixel::PixelLayout;

fn check_sample_size(n: usize, what: &str) -> Result<(), ConvertError> {
    if n == 1 || n == 3 {
        Ok(())
    } else {
        Err(ConvertError::UnsupportedFormat(alloc::format!(
            "{n} {what} per pixel (supported: 1, 3)"
        )))
    }
}

/// Copy one row, reversing the three samples of each pixel when `bpp == 3`.
///
/// Reversal is its own inverse, so this serves both directions.
fn copy_row(src: &[u8], dst: &mut [u8], bpp: usize) {
    if bpp == 3 {
        for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(3)) {
            d[0] = s[2];
            d[1] = s[1];
            d[2] = s[0];
        }
    } else {
        dst.copy_from_slice(src);
    }
}

/// Swap B,G,R <-> R,G,B in place for a run of 3-byte pixels.
///
/// Trailing bytes that do not form a whole pixel are left alone.
pub fn swap_channels(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}

/// Reverse the order of `buf`'s rows in place.
pub fn flip_rows(buf: &mut [u8], row_len: usize) {
    if row_len == 0 {
        return;
    }
    let rows = buf.len() / row_len;
    for top in 0..rows / 2 {
        let bottom = rows - 1 - top;
        let (head, tail) = buf.split_at_mut(bottom * row_len);
        head[top * row_len..(top + 1) * row_len].swap_with_slice(&mut tail[..row_len]);
    }
}

/// Plane -> packed: output row `y` comes from container row `height - 1 - y`.
///
/// `bytes_per_pixel` outside {1, 3} fails with `UnsupportedFormat` before
/// anything is allocated.
pub fn to_packed(
    plane: &[u8],
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Result<Vec<u8>, ConvertError> {
    check_sample_size(bytes_per_pixel, "bytes")?;
    let geometry = PlaneGeometry::new(width, height, (bytes_per_pixel * 8) as u16)?;
    let needed = geometry.plane_len()?;
    if plane.len() < needed {
        return Err(ConvertError::BufferTooSmall {
            needed,
            actual: plane.len(),
        });
    }

    let row_bytes = geometry.row_bytes();
    let mut out = try_zeroed(geometry.packed_len()?)?;
    for (y, dst) in out.chunks_exact_mut(row_bytes).enumerate() {
        let src_start = (height as usize - 1 - y) * geometry.stride;
        copy_row(&plane[src_start..src_start + row_bytes], dst, bytes_per_pixel);
    }
    trace!("packed {width}x{height} plane, {bytes_per_pixel} bytes/pixel");
    Ok(out)
}

/// Packed -> plane: container row `r` comes from packed row `height - 1 - r`.
///
/// Row padding is zero-filled. `components` outside {1, 3} fails with
/// `UnsupportedFormat` before anything is allocated.
pub fn to_plane(
    packed: &[u8],
    width: u32,
    height: u32,
    components: usize,
) -> Result<Vec<u8>, ConvertError> {
    to_plane_within(packed, width, height, components, None)
}

fn to_plane_within(
    packed: &[u8],
    width: u32,
    height: u32,
    components: usize,
    limits: Option<&Limits>,
) -> Result<Vec<u8>, ConvertError> {
    check_sample_size(components, "components")?;
    let geometry = PlaneGeometry::new(width, height, (components * 8) as u16)?;
    let needed = geometry.packed_len()?;
    if packed.len() < needed {
        return Err(ConvertError::BufferTooSmall {
            needed,
            actual: packed.len(),
        });
    }
    if let Some(limits) = limits {
        limits.check(width, height)?;
    }

    let row_bytes = geometry.row_bytes();
    let mut out = try_zeroed_within(geometry.plane_len()?, limits)?;
    for (r, dst) in out.chunks_exact_mut(geometry.stride).enumerate() {
        let src_start = (height as usize - 1 - r) * row_bytes;
        copy_row(
            &packed[src_start..src_start + row_bytes],
            &mut dst[..row_bytes],
            components,
        );
    }
    trace!(
        "unpacked {width}x{height} image into plane, stride {}",
        geometry.stride
    );
    Ok(out)
}

impl PixelPlane {
    /// Convert to the top-down RGB/gray buffer the codec consumes.
    pub fn to_packed(&self) -> Result<PackedImage, ConvertError> {
        let layout = match self.layout() {
            PixelLayout::Bgr8 => PixelLayout::Rgb8,
            other => other,
        };
        let pixels = to_packed(
            self.as_bytes(),
            self.width(),
            self.height(),
            self.layout().bytes_per_pixel(),
        )?;
        PackedImage::new(pixels, self.width(), self.height(), layout)
    }
}

impl PackedImage {
    /// Convert to a bottom-up, padded container plane.
    pub fn to_plane(&self, limits: Option<&Limits>) -> Result<PixelPlane, ConvertError> {
        let components = self.components();
        let data = to_plane_within(self.pixels(), self.width(), self.height(), components, limits)?;
        let geometry = PlaneGeometry::new(self.width(), self.height(), (components * 8) as u16)?;
        PixelPlane::from_vec(data, geometry)
    }
}
