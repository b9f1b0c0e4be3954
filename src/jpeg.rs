//! JPEG codec boundary.
//!
//! The DCT codec itself is external: decoding goes through `zune-jpeg`,
//! encoding through `jpeg-encoder`. Each call builds its own decoder or
//! encoder and drops it before returning; nothing is shared between calls.

use alloc::vec::Vec;

use log::{debug, trace};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

use crate::error::ConvertError;
use crate::limits::Limits;
use crate::packed::PackedImage;
use crate::pixel::PixelLayout;

/// Largest dimension a baseline JPEG frame header can express.
pub const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;
pub const DEFAULT_QUALITY: u8 = 90;

/// Output of a compressed-image decode.
#[derive(Clone, Debug)]
pub struct CodecImage {
    pub image: PackedImage,
    /// Resolution in dots per inch, when the stream records one.
    pub dpi: Option<(u32, u32)>,
}

/// Request/response contract with a compressed-image codec.
///
/// Only 1- and 3-component images cross this boundary.
pub trait CompressedCodec {
    /// Decode a complete compressed stream into a packed top-down buffer.
    fn decode(&self, data: &[u8], limits: Option<&Limits>) -> Result<CodecImage, ConvertError>;

    /// Encode a packed top-down buffer. `color_space` is `Rgb8` or `Gray8`
    /// and selects the codec's internal colour transform.
    fn encode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        color_space: PixelLayout,
    ) -> Result<Vec<u8>, ConvertError>;
}

/// Baseline JPEG codec.
#[derive(Clone, Copy, Debug)]
pub struct JpegCodec {
    quality: u8,
    dpi: Option<(u16, u16)>,
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            dpi: None,
        }
    }
}

impl JpegCodec {
    /// Encoder quality, clamped to 1..=100.
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            ..Self::default()
        }
    }

    /// Record a resolution in the JFIF header of encoded streams.
    ///
    /// Zero or values above `u16::MAX` leave the density unset.
    pub fn with_dpi(mut self, horizontal: u32, vertical: u32) -> Self {
        self.dpi = match (u16::try_from(horizontal), u16::try_from(vertical)) {
            (Ok(x), Ok(y)) if x > 0 && y > 0 => Some((x, y)),
            _ => None,
        };
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn dpi(&self) -> Option<(u16, u16)> {
        self.dpi
    }
}

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: u8 = 0xE0;
const SOS: u8 = 0xDA;

/// Density fields `(units, x, y)` of the JFIF APP0 segment, if present
/// before the first scan.
fn jfif_density(data: &[u8]) -> Option<(u8, u16, u16)> {
    if data.get(..2)? != SOI {
        return None;
    }
    let mut pos = 2;
    loop {
        let marker = data.get(pos..pos + 2)?;
        if marker[0] != 0xFF {
            return None;
        }
        // fill bytes
        if marker[1] == 0xFF {
            pos += 1;
            continue;
        }
        if marker[1] == SOS {
            return None;
        }
        let len = data.get(pos + 2..pos + 4)?;
        let len = usize::from(u16::from_be_bytes([len[0], len[1]]));
        if len < 2 {
            return None;
        }
        let payload = data.get(pos + 4..pos + 2 + len)?;
        if marker[1] == APP0 && payload.len() >= 12 && payload.starts_with(b"JFIF\0") {
            let x = u16::from_be_bytes([payload[8], payload[9]]);
            let y = u16::from_be_bytes([payload[10], payload[11]]);
            return Some((payload[7], x, y));
        }
        pos += 2 + len;
    }
}

fn density_to_dpi(units: u8, x: u16, y: u16) -> Option<(u32, u32)> {
    if x == 0 || y == 0 {
        return None;
    }
    match units {
        // dots per inch
        1 => Some((u32::from(x), u32::from(y))),
        // dots per cm
        2 => Some((
            (f64::from(x) * 2.54).round() as u32,
            (f64::from(y) * 2.54).round() as u32,
        )),
        _ => None,
    }
}

impl CompressedCodec for JpegCodec {
    fn decode(&self, data: &[u8], limits: Option<&Limits>) -> Result<CodecImage, ConvertError> {
        let max_width = limits.and_then(|l| l.max_width).map_or(usize::MAX, |w| w as usize);
        let max_height = limits.and_then(|l| l.max_height).map_or(usize::MAX, |h| h as usize);
        let options = || {
            DecoderOptions::default()
                .set_max_width(max_width)
                .set_max_height(max_height)
        };

        let mut probe = JpegDecoder::new_with_options(data, options());
        probe.decode_headers()?;
        let info = probe
            .info()
            .ok_or_else(|| ConvertError::Codec("no frame header in jpeg stream".into()))?;
        let width = u32::from(info.width);
        let height = u32::from(info.height);
        if let Some(limits) = limits {
            limits.check(width, height)?;
        }

        let (out_colorspace, layout) = if info.components == 1 {
            (ColorSpace::Luma, PixelLayout::Gray8)
        } else {
            (ColorSpace::RGB, PixelLayout::Rgb8)
        };
        let out_bytes = width as usize * height as usize * layout.bytes_per_pixel();
        if let Some(limits) = limits {
            limits.check_memory(out_bytes)?;
        }
        debug!(
            "jpeg {width}x{height}, {} input components -> {layout:?}",
            info.components
        );

        let mut decoder =
            JpegDecoder::new_with_options(data, options().jpeg_set_out_colorspace(out_colorspace));
        let pixels = decoder.decode()?;
        if pixels.len() != out_bytes {
            return Err(ConvertError::Codec(alloc::format!(
                "decoder produced {} bytes, expected {out_bytes}",
                pixels.len()
            )));
        }
        trace!("decoded {} jpeg bytes", data.len());

        Ok(CodecImage {
            image: PackedImage::new(pixels, width, height, layout)?,
            dpi: jfif_density(data).and_then(|(units, x, y)| density_to_dpi(units, x, y)),
        })
    }

    fn encode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        color_space: PixelLayout,
    ) -> Result<Vec<u8>, ConvertError> {
        let color_type = match color_space {
            PixelLayout::Rgb8 => jpeg_encoder::ColorType::Rgb,
            PixelLayout::Gray8 => jpeg_encoder::ColorType::Luma,
            other => {
                return Err(ConvertError::UnsupportedFormat(alloc::format!(
                    "cannot encode {other:?} as jpeg (supported: Rgb8, Gray8)"
                )));
            }
        };
        if width > MAX_JPEG_DIMENSION || height > MAX_JPEG_DIMENSION {
            return Err(ConvertError::UnsupportedFormat(alloc::format!(
                "{width}x{height} exceeds the jpeg limit of {MAX_JPEG_DIMENSION}"
            )));
        }
        let expected = width as usize * height as usize * color_space.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(ConvertError::BufferTooSmall {
                needed: expected,
                actual: pixels.len(),
            });
        }

        let mut out = Vec::new();
        let mut encoder = jpeg_encoder::Encoder::new(&mut out, self.quality);
        if let Some((x, y)) = self.dpi {
            encoder.set_density(jpeg_encoder::Density::Inch { x, y });
        }
        encoder.encode(pixels, width as u16, height as u16, color_type)?;
        debug!(
            "encoded {width}x{height} {color_space:?} at quality {} -> {} bytes",
            self.quality,
            out.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, channels: usize) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * channels);
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    pixels.push(((x * 8 + y * 4) as usize + c * 40) as u8);
                }
            }
        }
        pixels
    }

    #[test]
    fn rgb_survives_codec() {
        let codec = JpegCodec::with_quality(95);
        let pixels = gradient(16, 8, 3);
        let jpeg = codec.encode(&pixels, 16, 8, PixelLayout::Rgb8).unwrap();
        assert_eq!(&jpeg[..3], &[0xFF, 0xD8, 0xFF]);

        let decoded = codec.decode(&jpeg, None).unwrap().image;
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
        assert_eq!(decoded.layout(), PixelLayout::Rgb8);
        assert_eq!(decoded.components(), 3);
        let max_err = pixels
            .iter()
            .zip(decoded.pixels())
            .map(|(a, b)| a.abs_diff(*b))
            .max()
            .unwrap();
        assert!(max_err < 40, "lossy error too large: {max_err}");
    }

    #[test]
    fn gray_stays_single_component() {
        let codec = JpegCodec::default();
        let pixels = gradient(9, 5, 1);
        let jpeg = codec.encode(&pixels, 9, 5, PixelLayout::Gray8).unwrap();
        let decoded = codec.decode(&jpeg, None).unwrap().image;
        assert_eq!(decoded.layout(), PixelLayout::Gray8);
        assert_eq!(decoded.pixels().len(), 45);
    }

    #[test]
    fn garbage_is_codec_failure() {
        let err = JpegCodec::default()
            .decode(b"definitely not a jpeg stream", None)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Codec(_)));
    }

    #[test]
    fn bgr_hint_rejected() {
        assert!(matches!(
            JpegCodec::default().encode(&[0; 3], 1, 1, PixelLayout::Bgr8),
            Err(ConvertError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(JpegCodec::with_quality(0).quality(), 1);
        assert_eq!(JpegCodec::with_quality(255).quality(), 100);
    }

    #[test]
    fn density_units() {
        assert_eq!(density_to_dpi(1, 300, 150), Some((300, 150)));
        assert_eq!(density_to_dpi(2, 118, 118), Some((300, 300)));
        assert_eq!(density_to_dpi(0, 1, 1), None);
        assert_eq!(density_to_dpi(1, 0, 72), None);
    }

    #[test]
    fn density_is_written_and_read_back() {
        let pixels = gradient(4, 4, 3);
        let codec = JpegCodec::default().with_dpi(300, 72);
        assert_eq!(codec.dpi(), Some((300, 72)));
        let jpeg = codec.encode(&pixels, 4, 4, PixelLayout::Rgb8).unwrap();
        assert_eq!(jfif_density(&jpeg), Some((1, 300, 72)));
        assert_eq!(codec.decode(&jpeg, None).unwrap().dpi, Some((300, 72)));

        let plain = JpegCodec::default().encode(&pixels, 4, 4, PixelLayout::Rgb8).unwrap();
        assert_eq!(JpegCodec::default().decode(&plain, None).unwrap().dpi, None);
    }

    #[test]
    fn unrepresentable_dpi_is_dropped() {
        assert_eq!(JpegCodec::default().with_dpi(0, 72).dpi(), None);
        assert_eq!(JpegCodec::default().with_dpi(70_000, 72).dpi(), None);
        assert_eq!(JpegCodec::with_quality(50).with_dpi(96, 96).quality(), 50);
    }

    #[test]
    fn jfif_scan_stops_at_bad_input() {
        assert_eq!(jfif_density(b"not a jpeg"), None);
        // SOI then a truncated APP0 length
        assert_eq!(jfif_density(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), None);
        // segment length shorter than its own length field
        assert_eq!(jfif_density(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x01]), None);

        let mut stream = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        stream.extend_from_slice(b"JFIF\0");
        stream.extend_from_slice(&[1, 2, 2, 0x00, 0x76, 0x00, 0x76, 0, 0]);
        assert_eq!(jfif_density(&stream), Some((2, 118, 118)));
    }
}
