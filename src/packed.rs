use alloc::vec::Vec;

use rgb::AsPixels as _;

use crate::error::ConvertError;
use crate::pixel::PixelLayout;

/// Codec-native image: `width * height * channels` bytes, no padding,
/// row 0 at the top, R,G,B or single intensity samples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    layout: PixelLayout,
}

impl PackedImage {
    /// Wrap packed pixels. `layout` must be `Rgb8` or `Gray8` and `pixels`
    /// must hold exactly `width * height * channels` bytes.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Self, ConvertError> {
        if !matches!(layout, PixelLayout::Rgb8 | PixelLayout::Gray8) {
            return Err(ConvertError::UnsupportedFormat(alloc::format!(
                "{layout:?} is not a codec-side layout (supported: Rgb8, Gray8)"
            )));
        }
        if width == 0 || height == 0 {
            return Err(ConvertError::InvalidFormat(alloc::format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|wh| wh.checked_mul(layout.bytes_per_pixel()))
            .ok_or(ConvertError::DimensionsTooLarge { width, height })?;
        if pixels.len() != expected {
            return Err(ConvertError::InvalidFormat(alloc::format!(
                "packed buffer holds {} bytes, {width}x{height} {layout:?} needs {expected}",
                pixels.len()
            )));
        }
        Ok(Self {
            pixels,
            width,
            height,
            layout,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `Rgb8` or `Gray8`.
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Access the pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Samples per pixel: 3 for RGB, 1 for grayscale.
    pub fn components(&self) -> usize {
        self.layout.channels()
    }

    /// Packed row `y` (0 = top).
    pub fn row(&self, y: usize) -> &[u8] {
        let row_bytes = self.width as usize * self.components();
        &self.pixels[y * row_bytes..(y + 1) * row_bytes]
    }

    /// Reinterpret pixel data as a typed pixel slice.
    ///
    /// Returns [`ConvertError::UnsupportedFormat`] if the pixel layout doesn't match `P`.
    pub fn as_pixels<P: crate::PackedPixel>(&self) -> Result<&[P], ConvertError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        if !self.layout.is_memory_compatible(P::layout()) {
            return Err(ConvertError::UnsupportedFormat(alloc::format!(
                "pixels are {:?}, requested {:?}",
                self.layout,
                P::layout()
            )));
        }
        Ok(self.pixels().as_pixels())
    }

    /// Zero-copy view as an [`imgref::ImgRef`] of typed pixels.
    #[cfg(feature = "imgref")]
    pub fn as_imgref<P: crate::PackedPixel>(
        &self,
    ) -> Result<imgref::ImgRef<'_, P>, ConvertError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        let pixels: &[P] = self.as_pixels()?;
        Ok(imgref::ImgRef::new(
            pixels,
            self.width as usize,
            self.height as usize,
        ))
    }

    /// Convert to an [`imgref::ImgVec`] of typed pixels.
    #[cfg(feature = "imgref")]
    pub fn to_imgvec<P: crate::PackedPixel>(&self) -> Result<imgref::ImgVec<P>, ConvertError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        let pixels: &[P] = self.as_pixels()?;
        Ok(imgref::ImgVec::new(
            pixels.to_vec(),
            self.width as usize,
            self.height as usize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            PackedImage::new(vec![0; 5], 2, 1, PixelLayout::Rgb8),
            Err(ConvertError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_container_layout() {
        assert!(matches!(
            PackedImage::new(vec![0; 6], 2, 1, PixelLayout::Bgr8),
            Err(ConvertError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn typed_rgb_view() {
        let img = PackedImage::new(vec![1, 2, 3, 4, 5, 6], 2, 1, PixelLayout::Rgb8).unwrap();
        let px: &[rgb::RGB8] = img.as_pixels().unwrap();
        assert_eq!(px, &[rgb::RGB8::new(1, 2, 3), rgb::RGB8::new(4, 5, 6)]);
        assert!(img.as_pixels::<rgb::Gray<u8>>().is_err());
    }

    #[test]
    fn rows_are_top_down() {
        let img = PackedImage::new(vec![1, 2, 3, 4], 2, 2, PixelLayout::Gray8).unwrap();
        assert_eq!(img.row(0), &[1, 2]);
        assert_eq!(img.row(1), &[3, 4]);
    }

    #[test]
    fn accessors_match_constructor() {
        let img = PackedImage::new(vec![0; 12], 2, 2, PixelLayout::Rgb8).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        assert_eq!(img.layout(), PixelLayout::Rgb8);
        assert_eq!(
            img.pixels().len(),
            img.width() as usize * img.height() as usize * img.components()
        );
    }
}
