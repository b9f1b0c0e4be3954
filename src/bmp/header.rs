//! BMP file header (14 bytes) and BITMAPINFOHEADER (40 bytes).
//!
//! Both records are plain values with an explicit little-endian byte
//! layout; they are never reinterpreted from memory.

use std::io::{Read, Write};

use log::{debug, warn};

use super::geometry::{PlaneGeometry, color_map_size, DEFAULT_PALETTE_ENTRIES};
use crate::error::ConvertError;

/// `BM` read as a little-endian u16.
pub const SIGNATURE: u16 = 0x4D42;
pub const FILE_HEADER_SIZE: usize = 14;
pub const INFO_HEADER_SIZE: usize = 40;
/// Combined size of both header records.
pub const HEADERS_SIZE: usize = FILE_HEADER_SIZE + INFO_HEADER_SIZE;
pub const INCHES_PER_METER: f64 = 39.3701;

/// Convert dots per inch to the header's pixels-per-metre unit.
pub fn dpi_to_pixels_per_meter(dpi: u32) -> i32 {
    (f64::from(dpi) * INCHES_PER_METER).round() as i32
}

/// Convert the header's pixels-per-metre unit back to dots per inch.
pub fn pixels_per_meter_to_dpi(ppm: i32) -> u32 {
    (f64::from(ppm.max(0)) / INCHES_PER_METER).round() as u32
}

fn le_u16(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}

fn le_u32(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

fn le_i32(b: &[u8], off: usize) -> i32 {
    i32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

/// The 14-byte file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub signature: u16,
    /// Total file size in bytes.
    pub file_size: u32,
    pub reserved1: u16,
    pub reserved2: u16,
    /// Offset of the first pixel byte from the start of the file.
    pub pixel_offset: u32,
}

impl FileHeader {
    pub fn from_bytes(b: &[u8; FILE_HEADER_SIZE]) -> Self {
        Self {
            signature: le_u16(b, 0),
            file_size: le_u32(b, 2),
            reserved1: le_u16(b, 6),
            reserved2: le_u16(b, 8),
            pixel_offset: le_u32(b, 10),
        }
    }

    pub fn to_bytes(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut out = [0u8; FILE_HEADER_SIZE];
        out[0..2].copy_from_slice(&self.signature.to_le_bytes());
        out[2..6].copy_from_slice(&self.file_size.to_le_bytes());
        out[6..8].copy_from_slice(&self.reserved1.to_le_bytes());
        out[8..10].copy_from_slice(&self.reserved2.to_le_bytes());
        out[10..14].copy_from_slice(&self.pixel_offset.to_le_bytes());
        out
    }
}

/// The 40-byte BITMAPINFOHEADER.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InfoHeader {
    pub header_size: u32,
    pub width: i32,
    /// Positive: rows are stored bottom-up.
    pub height: i32,
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    /// 0 when uncompressed, otherwise `stride * height`.
    pub image_size: u32,
    pub x_pixels_per_meter: i32,
    pub y_pixels_per_meter: i32,
    /// Palette entry count; 0 means the default of 256.
    pub colors_used: u32,
    pub important_colors: u32,
}

impl InfoHeader {
    pub fn from_bytes(b: &[u8; INFO_HEADER_SIZE]) -> Self {
        Self {
            header_size: le_u32(b, 0),
            width: le_i32(b, 4),
            height: le_i32(b, 8),
            planes: le_u16(b, 12),
            bits_per_pixel: le_u16(b, 14),
            compression: le_u32(b, 16),
            image_size: le_u32(b, 20),
            x_pixels_per_meter: le_i32(b, 24),
            y_pixels_per_meter: le_i32(b, 28),
            colors_used: le_u32(b, 32),
            important_colors: le_u32(b, 36),
        }
    }

    pub fn to_bytes(&self) -> [u8; INFO_HEADER_SIZE] {
        let mut out = [0u8; INFO_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.header_size.to_le_bytes());
        out[4..8].copy_from_slice(&self.width.to_le_bytes());
        out[8..12].copy_from_slice(&self.height.to_le_bytes());
        out[12..14].copy_from_slice(&self.planes.to_le_bytes());
        out[14..16].copy_from_slice(&self.bits_per_pixel.to_le_bytes());
        out[16..20].copy_from_slice(&self.compression.to_le_bytes());
        out[20..24].copy_from_slice(&self.image_size.to_le_bytes());
        out[24..28].copy_from_slice(&self.x_pixels_per_meter.to_le_bytes());
        out[28..32].copy_from_slice(&self.y_pixels_per_meter.to_le_bytes());
        out[32..36].copy_from_slice(&self.colors_used.to_le_bytes());
        out[36..40].copy_from_slice(&self.important_colors.to_le_bytes());
        out
    }
}

/// Both header records of a BMP container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BmpHeaders {
    pub file: FileHeader,
    pub info: InfoHeader,
}

impl BmpHeaders {
    /// Serialize both records (54 bytes).
    pub fn to_bytes(&self) -> [u8; HEADERS_SIZE] {
        let mut out = [0u8; HEADERS_SIZE];
        out[..FILE_HEADER_SIZE].copy_from_slice(&self.file.to_bytes());
        out[FILE_HEADER_SIZE..].copy_from_slice(&self.info.to_bytes());
        out
    }

    pub fn write_to<W: Write>(&self, dest: &mut W) -> Result<(), ConvertError> {
        dest.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Validate the header for reading and derive the pixel-plane geometry.
    ///
    /// Rejects compressed variants, top-down or empty images, short format
    /// headers and unsupported bit depths, all before any allocation.
    pub fn geometry(&self) -> Result<PlaneGeometry, ConvertError> {
        if self.info.compression != 0 {
            return Err(ConvertError::UnsupportedFormat(alloc::format!(
                "compressed bitmap (compression tag {})",
                self.info.compression
            )));
        }
        self.plane_geometry()
    }

    /// Geometry of the pixel plane these headers describe, ignoring the
    /// compression tag. Used when writing, where the tag is carried as-is.
    pub fn plane_geometry(&self) -> Result<PlaneGeometry, ConvertError> {
        let info = &self.info;
        if (info.header_size as usize) < INFO_HEADER_SIZE {
            return Err(ConvertError::UnsupportedFormat(alloc::format!(
                "format header of {} bytes (need at least {INFO_HEADER_SIZE})",
                info.header_size
            )));
        }
        if info.header_size as usize > INFO_HEADER_SIZE {
            warn!(
                "format header is {} bytes, only the first {INFO_HEADER_SIZE} are interpreted",
                info.header_size
            );
        }
        if info.width <= 0 || info.height <= 0 {
            return Err(ConvertError::InvalidFormat(alloc::format!(
                "image dimensions must be positive, got {}x{}",
                info.width,
                info.height
            )));
        }
        let geometry =
            PlaneGeometry::new(info.width as u32, info.height as u32, info.bits_per_pixel)?;
        if info.bits_per_pixel == 8 && info.colors_used as usize > DEFAULT_PALETTE_ENTRIES {
            return Err(ConvertError::InvalidFormat(alloc::format!(
                "palette of {} entries exceeds {DEFAULT_PALETTE_ENTRIES}",
                info.colors_used
            )));
        }
        debug!(
            "bmp geometry {}x{} bpp={} stride={} padding={}",
            geometry.width,
            geometry.height,
            info.bits_per_pixel,
            geometry.stride,
            geometry.padding()
        );
        Ok(geometry)
    }

    /// Palette size in bytes, present only for 8-bit images.
    pub fn color_map_size(&self) -> Option<usize> {
        (self.info.bits_per_pixel == 8).then(|| color_map_size(self.info.colors_used))
    }

    /// Resolution as (horizontal, vertical) dots per inch.
    pub fn dpi(&self) -> (u32, u32) {
        (
            pixels_per_meter_to_dpi(self.info.x_pixels_per_meter),
            pixels_per_meter_to_dpi(self.info.y_pixels_per_meter),
        )
    }

    /// Parameters that rebuild equivalent headers.
    pub fn params(&self) -> HeaderParams {
        HeaderParams {
            width: self.info.width.max(0) as u32,
            height: self.info.height.max(0) as u32,
            bits_per_pixel: self.info.bits_per_pixel,
            compression: self.info.compression,
            x_pixels_per_meter: self.info.x_pixels_per_meter,
            y_pixels_per_meter: self.info.y_pixels_per_meter,
            palette_colors: self.info.colors_used,
            important_colors: self.info.important_colors,
        }
    }
}

/// Inputs to [`build_headers`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderParams {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub x_pixels_per_meter: i32,
    pub y_pixels_per_meter: i32,
    /// 0 means the default 256-entry palette.
    pub palette_colors: u32,
    pub important_colors: u32,
}

impl HeaderParams {
    /// Uncompressed image at 96 DPI with the default palette size.
    pub fn new(width: u32, height: u32, bits_per_pixel: u16) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
            compression: 0,
            x_pixels_per_meter: dpi_to_pixels_per_meter(96),
            y_pixels_per_meter: dpi_to_pixels_per_meter(96),
            palette_colors: 0,
            important_colors: 0,
        }
    }

    /// Set the resolution in dots per inch. Each axis is converted on its own.
    pub fn with_dpi(mut self, horizontal: u32, vertical: u32) -> Self {
        self.x_pixels_per_meter = dpi_to_pixels_per_meter(horizontal);
        self.y_pixels_per_meter = dpi_to_pixels_per_meter(vertical);
        self
    }

    pub fn with_pixels_per_meter(mut self, x: i32, y: i32) -> Self {
        self.x_pixels_per_meter = x;
        self.y_pixels_per_meter = y;
        self
    }

    pub fn with_compression(mut self, compression: u32) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_palette(mut self, palette_colors: u32, important_colors: u32) -> Self {
        self.palette_colors = palette_colors;
        self.important_colors = important_colors;
        self
    }
}

/// Build the file and format headers for an image.
///
/// The pixel-data offset reserves room for the colour map of 8-bit images
/// (1024 bytes for the default 256 entries), and the file size covers the
/// padded pixel plane.
///
/// A nonzero `palette_colors` reserves `palette_colors * 4` bytes instead,
/// so the offset is `54 + 4 * palette_colors` rather than `54 + 1024`.
/// 24-bit images reserve nothing.
pub fn build_headers(params: &HeaderParams) -> Result<BmpHeaders, ConvertError> {
    let geometry = PlaneGeometry::new(params.width, params.height, params.bits_per_pixel)?;
    let width = i32::try_from(params.width).map_err(|_| too_large_err(params))?;
    let height = i32::try_from(params.height).map_err(|_| too_large_err(params))?;

    let palette_bytes = if params.bits_per_pixel == 8 {
        if params.palette_colors as usize > DEFAULT_PALETTE_ENTRIES {
            return Err(ConvertError::InvalidFormat(alloc::format!(
                "palette of {} entries exceeds {DEFAULT_PALETTE_ENTRIES}",
                params.palette_colors
            )));
        }
        color_map_size(params.palette_colors)
    } else {
        0
    };

    let plane_len = geometry.plane_len()?;
    let pixel_offset = HEADERS_SIZE + palette_bytes;
    let file_size = pixel_offset
        .checked_add(plane_len)
        .and_then(|s| u32::try_from(s).ok())
        .ok_or_else(|| too_large_err(params))?;
    let image_size = if params.compression == 0 {
        0
    } else {
        plane_len as u32
    };

    debug!(
        "built bmp headers: offset={pixel_offset} file_size={file_size} stride={}",
        geometry.stride
    );

    Ok(BmpHeaders {
        file: FileHeader {
            signature: SIGNATURE,
            file_size,
            reserved1: 0,
            reserved2: 0,
            pixel_offset: pixel_offset as u32,
        },
        info: InfoHeader {
            header_size: INFO_HEADER_SIZE as u32,
            width,
            height,
            planes: 1,
            bits_per_pixel: params.bits_per_pixel,
            compression: params.compression,
            image_size,
            x_pixels_per_meter: params.x_pixels_per_meter,
            y_pixels_per_meter: params.y_pixels_per_meter,
            colors_used: params.palette_colors,
            important_colors: params.important_colors,
        },
    })
}

fn too_large_err(params: &HeaderParams) -> ConvertError {
    ConvertError::DimensionsTooLarge {
        width: params.width,
        height: params.height,
    }
}

/// Read both header records from the start of `source`.
///
/// The signature is checked before the format header is read.
pub fn read_headers<R: Read>(source: &mut R) -> Result<BmpHeaders, ConvertError> {
    let mut file_bytes = [0u8; FILE_HEADER_SIZE];
    source.read_exact(&mut file_bytes)?;
    let file = FileHeader::from_bytes(&file_bytes);
    if file.signature != SIGNATURE {
        return Err(ConvertError::InvalidFormat(alloc::format!(
            "bad signature {:02x?}, expected \"BM\"",
            &file_bytes[..2]
        )));
    }

    let mut info_bytes = [0u8; INFO_HEADER_SIZE];
    source.read_exact(&mut info_bytes)?;
    let info = InfoHeader::from_bytes(&info_bytes);
    Ok(BmpHeaders { file, info })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn true_color_layout() {
        let h = build_headers(&HeaderParams::new(5, 3, 24)).unwrap();
        assert_eq!(h.file.signature, SIGNATURE);
        assert_eq!(h.file.pixel_offset, 54);
        assert_eq!(h.file.file_size, 54 + 16 * 3);
        assert_eq!(h.info.header_size, 40);
        assert_eq!(h.info.planes, 1);
        assert_eq!(h.info.image_size, 0);
    }

    #[test]
    fn grayscale_reserves_palette() {
        let h = build_headers(&HeaderParams::new(3, 2, 8)).unwrap();
        assert_eq!(h.file.pixel_offset, 54 + 1024);
        assert_eq!(h.file.file_size, 54 + 1024 + 4 * 2);
        assert_eq!(h.color_map_size(), Some(1024));
    }

    #[test]
    fn compressed_tag_sets_image_size() {
        let h = build_headers(&HeaderParams::new(5, 3, 24).with_compression(1)).unwrap();
        assert_eq!(h.info.compression, 1);
        assert_eq!(h.info.image_size, 48);
    }

    #[test]
    fn resolution_axes_are_independent() {
        let h = build_headers(&HeaderParams::new(1, 1, 24).with_dpi(300, 72)).unwrap();
        assert_eq!(h.info.x_pixels_per_meter, 11811);
        assert_eq!(h.info.y_pixels_per_meter, 2835);
        assert_eq!(h.dpi(), (300, 72));
    }

    #[test]
    fn byte_layout_matches_offsets() {
        let h = build_headers(&HeaderParams::new(2, 7, 24)).unwrap();
        let bytes = h.to_bytes();
        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(&bytes[10..14], &54u32.to_le_bytes());
        assert_eq!(&bytes[18..22], &2i32.to_le_bytes());
        assert_eq!(&bytes[22..26], &7i32.to_le_bytes());
        assert_eq!(&bytes[28..30], &24u16.to_le_bytes());
        assert_eq!(&bytes[38..42], &3780i32.to_le_bytes());
    }

    #[test]
    fn read_back() {
        let h = build_headers(&HeaderParams::new(9, 4, 8).with_palette(16, 3)).unwrap();
        let read = read_headers(&mut Cursor::new(h.to_bytes())).unwrap();
        assert_eq!(read, h);
        assert_eq!(read.file.pixel_offset, 54 + 64);
    }

    #[test]
    fn bad_signature() {
        let mut bytes = build_headers(&HeaderParams::new(1, 1, 24))
            .unwrap()
            .to_bytes();
        bytes[0] = b'P';
        assert!(matches!(
            read_headers(&mut Cursor::new(bytes)),
            Err(ConvertError::InvalidFormat(_))
        ));
    }

    #[test]
    fn truncated_header_is_io() {
        let bytes = build_headers(&HeaderParams::new(1, 1, 24))
            .unwrap()
            .to_bytes();
        let err = read_headers(&mut Cursor::new(&bytes[..30])).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn geometry_rejects_compressed_and_top_down() {
        let mut h = build_headers(&HeaderParams::new(4, 4, 24)).unwrap();
        h.info.compression = 1;
        assert!(matches!(
            h.geometry(),
            Err(ConvertError::UnsupportedFormat(_))
        ));
        h.info.compression = 0;
        h.info.height = -4;
        assert!(matches!(h.geometry(), Err(ConvertError::InvalidFormat(_))));
    }

    #[test]
    fn unsupported_depth() {
        assert!(matches!(
            build_headers(&HeaderParams::new(4, 4, 16)),
            Err(ConvertError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn oversized_palette() {
        assert!(matches!(
            build_headers(&HeaderParams::new(4, 4, 8).with_palette(257, 0)),
            Err(ConvertError::InvalidFormat(_))
        ));
    }
}
