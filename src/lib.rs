//! # zenbmpjpeg
//!
//! Conversion between uncompressed BMP bitmaps and baseline JPEG.
//!
//! The BMP side is handled here: header parsing and construction, pixel-plane
//! reading and writing, and the row geometry that ties them together. JPEG
//! compression is delegated to `zune-jpeg` (decode) and `jpeg-encoder`
//! (encode) behind the [`CompressedCodec`] trait.
//!
//! ## Supported bitmaps
//!
//! - **24-bit** true color, stored B,G,R
//! - **8-bit** palette indices, passed through as grayscale intensities
//!
//! Both must be uncompressed, bottom-up and carry a format header of at
//! least 40 bytes.
//!
//! ## Non-Goals
//!
//! - Palette lookup or color management
//! - Alpha, 16/32-bit, RLE or bitfield bitmaps
//! - Progressive or arithmetic-coded JPEG output
//!
//! ## Usage
//!
//! ```no_run
//! use zenbmpjpeg::{Converter, PalettePolicy};
//!
//! // One-shot with defaults (quality 90, 96 dpi fallback)
//! zenbmpjpeg::bmp_to_jpeg("photo.bmp", "photo.jpg")?;
//!
//! // Configured
//! Converter::new()
//!     .with_quality(75)
//!     .with_palette_policy(PalettePolicy::RequireGrayscale)
//!     .jpeg_to_bmp("scan.jpg", "scan.bmp")?;
//! # Ok::<(), zenbmpjpeg::ConvertError>(())
//! ```
//!
//! The lower layers are public too: [`bmp::read_bmp`] gives the headers,
//! plane and palette of a file, and [`to_packed`]/[`to_plane`] move pixels
//! between the container and codec layouts.

#![forbid(unsafe_code)]

extern crate alloc;

mod convert;
mod error;
mod limits;
mod packed;
mod pixel;

pub mod bmp;
pub mod jpeg;
pub mod transcode;

// Re-exports
pub use convert::{Converter, PalettePolicy, bmp_to_jpeg, jpeg_to_bmp};
pub use error::ConvertError;
pub use jpeg::{CodecImage, CompressedCodec, JpegCodec};
pub use limits::Limits;
pub use packed::PackedImage;
pub use pixel::{ImageFormat, PackedPixel, PixelLayout};
pub use transcode::{to_packed, to_plane};
