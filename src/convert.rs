//! File-to-file conversions between BMP and JPEG.
//!
//! Every conversion is built completely in memory and then published with a
//! write-to-temporary-and-rename, so the destination either receives a
//! complete file or is left as it was.

use alloc::vec::Vec;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::bmp::{BmpImage, ColorMap, HeaderParams, build_headers, encode_bmp, read_bmp};
use crate::error::ConvertError;
use crate::jpeg::{CompressedCodec, DEFAULT_QUALITY, JpegCodec};
use crate::limits::Limits;
use crate::pixel::{ImageFormat, PixelLayout};

/// What to do with an 8-bit image whose palette is not a grayscale ramp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PalettePolicy {
    /// Treat index bytes as intensities regardless of the palette.
    #[default]
    Passthrough,
    /// Refuse to convert unless entry `i` is gray level `i`.
    RequireGrayscale,
}

/// Conversion settings.
///
/// ```no_run
/// use zenbmpjpeg::{Converter, Limits};
///
/// Converter::new()
///     .with_quality(85)
///     .with_limits(Limits { max_pixels: Some(50_000_000), ..Default::default() })
///     .bmp_to_jpeg("in.bmp", "out.jpg")?;
/// # Ok::<(), zenbmpjpeg::ConvertError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Converter {
    quality: u8,
    fallback_dpi: (u32, u32),
    limits: Option<Limits>,
    palette_policy: PalettePolicy,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            fallback_dpi: (96, 96),
            limits: None,
            palette_policy: PalettePolicy::default(),
        }
    }

    /// JPEG quality, 1..=100.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Resolution written to BMPs when the JPEG records none.
    pub fn with_fallback_dpi(mut self, horizontal: u32, vertical: u32) -> Self {
        self.fallback_dpi = (horizontal, vertical);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn with_palette_policy(mut self, policy: PalettePolicy) -> Self {
        self.palette_policy = policy;
        self
    }

    fn codec(&self) -> JpegCodec {
        JpegCodec::with_quality(self.quality)
    }

    fn limits(&self) -> Option<&Limits> {
        self.limits.as_ref()
    }

    /// Convert a BMP file to a JPEG file.
    pub fn bmp_to_jpeg(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
    ) -> Result<(), ConvertError> {
        let (source, dest) = (source.as_ref(), dest.as_ref());
        debug!("bmp -> jpeg: {} -> {}", source.display(), dest.display());
        let image = self.read_bmp_file(source)?;
        let jpeg = self.encode_bmp_image(&image)?;
        write_atomic(dest, &jpeg)
    }

    /// Convert a JPEG file to a BMP file.
    pub fn jpeg_to_bmp(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
    ) -> Result<(), ConvertError> {
        let (source, dest) = (source.as_ref(), dest.as_ref());
        debug!("jpeg -> bmp: {} -> {}", source.display(), dest.display());
        let data = fs::read(source)?;
        let bmp = self.jpeg_bytes_to_bmp(&data)?;
        write_atomic(dest, &bmp)
    }

    /// Re-write a BMP file with freshly built headers and the same pixels,
    /// palette, resolution and palette counts.
    pub fn duplicate_bmp(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
    ) -> Result<(), ConvertError> {
        let (source, dest) = (source.as_ref(), dest.as_ref());
        debug!("bmp copy: {} -> {}", source.display(), dest.display());
        let image = self.read_bmp_file(source)?;
        let headers = build_headers(&image.headers.params())?;
        let bmp = encode_bmp(&headers, &image.plane, image.color_map.as_ref())?;
        write_atomic(dest, &bmp)
    }

    /// Decode a JPEG file and encode it again.
    pub fn duplicate_jpeg(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
    ) -> Result<(), ConvertError> {
        let (source, dest) = (source.as_ref(), dest.as_ref());
        debug!("jpeg copy: {} -> {}", source.display(), dest.display());
        let data = fs::read(source)?;
        let decoded = self.codec().decode(&data, self.limits())?;
        let codec = match decoded.dpi {
            Some((h, v)) => self.codec().with_dpi(h, v),
            None => self.codec(),
        };
        let image = decoded.image;
        let jpeg = codec.encode(image.pixels(), image.width(), image.height(), image.layout())?;
        write_atomic(dest, &jpeg)
    }

    /// Convert to the other format, choosing the direction from the
    /// source's magic bytes.
    pub fn convert(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
    ) -> Result<ImageFormat, ConvertError> {
        let (source, dest) = (source.as_ref(), dest.as_ref());
        let data = fs::read(source)?;
        match ImageFormat::detect(&data) {
            Some(ImageFormat::Bmp) => {
                let jpeg = self.bmp_bytes_to_jpeg(&data)?;
                write_atomic(dest, &jpeg)?;
                Ok(ImageFormat::Jpeg)
            }
            Some(ImageFormat::Jpeg) => {
                let bmp = self.jpeg_bytes_to_bmp(&data)?;
                write_atomic(dest, &bmp)?;
                Ok(ImageFormat::Bmp)
            }
            None => Err(ConvertError::InvalidFormat(alloc::format!(
                "{} is neither a bmp nor a jpeg file",
                source.display()
            ))),
        }
    }

    /// In-memory BMP -> JPEG.
    pub fn bmp_bytes_to_jpeg(&self, data: &[u8]) -> Result<Vec<u8>, ConvertError> {
        let image = read_bmp(&mut io::Cursor::new(data), self.limits())?;
        self.encode_bmp_image(&image)
    }

    /// In-memory JPEG -> BMP.
    pub fn jpeg_bytes_to_bmp(&self, data: &[u8]) -> Result<Vec<u8>, ConvertError> {
        let decoded = self.codec().decode(data, self.limits())?;
        let image = decoded.image;
        let plane = image.to_plane(self.limits())?;

        let (dpi_h, dpi_v) = decoded.dpi.unwrap_or(self.fallback_dpi);
        let params = HeaderParams::new(image.width(), image.height(), plane.layout().bits_per_pixel())
            .with_dpi(dpi_h, dpi_v);
        let headers = build_headers(&params)?;
        let color_map = (plane.layout() == PixelLayout::Gray8).then(ColorMap::grayscale_ramp);
        encode_bmp(&headers, &plane, color_map.as_ref())
    }

    fn read_bmp_file(&self, source: &Path) -> Result<BmpImage, ConvertError> {
        let mut reader = BufReader::new(File::open(source)?);
        read_bmp(&mut reader, self.limits())
    }

    fn encode_bmp_image(&self, image: &BmpImage) -> Result<Vec<u8>, ConvertError> {
        if let Some(map) = &image.color_map {
            self.check_palette(map)?;
        }
        let (dpi_h, dpi_v) = image.headers.dpi();
        debug!("source resolution {dpi_h}x{dpi_v} dpi");
        let codec = self.codec().with_dpi(dpi_h, dpi_v);
        let packed = image.plane.to_packed()?;
        codec.encode(packed.pixels(), packed.width(), packed.height(), packed.layout())
    }

    fn check_palette(&self, map: &ColorMap) -> Result<(), ConvertError> {
        if map.is_grayscale_ramp() {
            return Ok(());
        }
        match self.palette_policy {
            PalettePolicy::Passthrough => {
                warn!(
                    "{}-entry palette is not a grayscale ramp; index bytes are used as intensities",
                    map.len()
                );
                Ok(())
            }
            PalettePolicy::RequireGrayscale => Err(ConvertError::UnsupportedFormat(
                "8-bit palette is not a grayscale ramp".into(),
            )),
        }
    }
}

/// Convert a BMP file to JPEG with default settings.
pub fn bmp_to_jpeg(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<(), ConvertError> {
    Converter::new().bmp_to_jpeg(source, dest)
}

/// Convert a JPEG file to BMP with default settings.
pub fn jpeg_to_bmp(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<(), ConvertError> {
    Converter::new().jpeg_to_bmp(source, dest)
}

/// Publish `bytes` at `dest` only once they are fully on disk.
fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let partial = partial_path(dest)?;
    let result = write_then_rename(&partial, dest, bytes);
    if result.is_err() {
        // Best effort; the original error is the one worth reporting.
        let _ = fs::remove_file(&partial);
    }
    result
}

fn write_then_rename(partial: &Path, dest: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let mut file = File::create(partial)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(partial, dest)?;
    debug!("wrote {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}

fn partial_path(dest: &Path) -> Result<PathBuf, ConvertError> {
    let name = dest.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            alloc::format!("{} does not name a file", dest.display()),
        )
    })?;
    let mut partial = OsString::from(".");
    partial.push(name);
    partial.push(alloc::format!(".partial-{}", std::process::id()));
    Ok(dest.with_file_name(partial))
}
