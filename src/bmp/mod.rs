//! The BMP container: header codec, pixel-plane I/O and row geometry.
//!
//! Only uncompressed 8-bit (palette index) and 24-bit (BGR) bitmaps with a
//! 40-byte or larger format header are handled.

mod geometry;
mod header;
mod plane;

pub use geometry::{
    DEFAULT_PALETTE_ENTRIES, PALETTE_ENTRY_SIZE, PlaneGeometry, color_map_size, stride,
};
pub use header::{
    BmpHeaders, FILE_HEADER_SIZE, FileHeader, HEADERS_SIZE, HeaderParams, INCHES_PER_METER,
    INFO_HEADER_SIZE, InfoHeader, SIGNATURE, build_headers, dpi_to_pixels_per_meter,
    pixels_per_meter_to_dpi, read_headers,
};
pub use plane::{BmpImage, ColorMap, PixelPlane, encode_bmp, read_bmp, read_plane, write_plane};
