//! Reading and writing the padded, bottom-up pixel plane and its colour map.

use alloc::vec::Vec;
use std::io::{self, Read, Seek, SeekFrom, Write};

use log::{debug, trace};
use rgb::alt::BGRA8;

use super::geometry::{PALETTE_ENTRY_SIZE, DEFAULT_PALETTE_ENTRIES, PlaneGeometry};
use super::header::{BmpHeaders, HEADERS_SIZE, read_headers};
use crate::error::ConvertError;
use crate::limits::{Limits, try_zeroed_within};
use crate::pixel::PixelLayout;

/// Container-native pixel plane: `stride * height` bytes, row 0 at the
/// bottom of the image, B,G,R samples or one palette index per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelPlane {
    data: Vec<u8>,
    geometry: PlaneGeometry,
}

impl PixelPlane {
    /// A plane with every byte (padding included) set to zero.
    pub fn zeroed(geometry: PlaneGeometry, limits: Option<&Limits>) -> Result<Self, ConvertError> {
        if let Some(limits) = limits {
            limits.check(geometry.width, geometry.height)?;
        }
        let data = try_zeroed_within(geometry.plane_len()?, limits)?;
        Ok(Self { data, geometry })
    }

    /// Wrap an existing buffer. Bytes past `stride * height` are dropped.
    pub fn from_vec(mut data: Vec<u8>, geometry: PlaneGeometry) -> Result<Self, ConvertError> {
        let needed = geometry.plane_len()?;
        if data.len() < needed {
            return Err(ConvertError::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        data.truncate(needed);
        Ok(Self { data, geometry })
    }

    pub fn geometry(&self) -> PlaneGeometry {
        self.geometry
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    pub fn stride(&self) -> usize {
        self.geometry.stride
    }

    pub fn layout(&self) -> PixelLayout {
        self.geometry.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Pixel bytes of container row `r` (0 = bottom), padding excluded.
    pub fn row_pixels(&self, r: usize) -> &[u8] {
        let start = r * self.geometry.stride;
        &self.data[start..start + self.geometry.row_bytes()]
    }

    pub fn row_pixels_mut(&mut self, r: usize) -> &mut [u8] {
        let start = r * self.geometry.stride;
        let row_bytes = self.geometry.row_bytes();
        &mut self.data[start..start + row_bytes]
    }
}

/// Palette of an 8-bit image: 4-byte B,G,R,reserved entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorMap {
    bytes: Vec<u8>,
}

impl ColorMap {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ConvertError> {
        if bytes.len() % PALETTE_ENTRY_SIZE != 0
            || bytes.len() > DEFAULT_PALETTE_ENTRIES * PALETTE_ENTRY_SIZE
        {
            return Err(ConvertError::InvalidFormat(alloc::format!(
                "colour map of {} bytes is not 0..=256 whole entries",
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    /// 256-entry identity ramp: entry `i` is gray level `i`.
    pub fn grayscale_ramp() -> Self {
        let bytes = (0..=255u8).flat_map(|i| [i, i, i, 0]).collect();
        Self { bytes }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.bytes.len() / PALETTE_ENTRY_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn entries(&self) -> impl Iterator<Item = BGRA8> + '_ {
        self.bytes.chunks_exact(PALETTE_ENTRY_SIZE).map(|e| BGRA8 {
            b: e[0],
            g: e[1],
            r: e[2],
            a: e[3],
        })
    }

    /// Whether every entry `i` has B = G = R = `i`, so that index bytes
    /// already are intensities.
    pub fn is_grayscale_ramp(&self) -> bool {
        self.entries()
            .enumerate()
            .all(|(i, e)| usize::from(e.b) == i && e.g == e.b && e.r == e.b)
    }
}

/// A fully read BMP container.
#[derive(Clone, Debug)]
pub struct BmpImage {
    pub headers: BmpHeaders,
    pub plane: PixelPlane,
    pub color_map: Option<ColorMap>,
}

/// Read the pixel plane (and, for 8-bit images, the colour map) described
/// by `headers`.
///
/// Rows are read from the recorded pixel offset; the padding between rows
/// is skipped with a seek and left zeroed in the returned plane. The colour
/// map is read from the bytes immediately before the pixel data.
pub fn read_plane<R: Read + Seek>(
    source: &mut R,
    headers: &BmpHeaders,
    limits: Option<&Limits>,
) -> Result<(PixelPlane, Option<ColorMap>), ConvertError> {
    let geometry = headers.geometry()?;
    if let Some(limits) = limits {
        limits.check(geometry.width, geometry.height)?;
    }
    let offset = u64::from(headers.file.pixel_offset);
    let padding = geometry.padding() as i64;

    // The last row needs no padding after it.
    let needed = (geometry.stride as u64)
        .checked_mul(u64::from(geometry.height.saturating_sub(1)))
        .and_then(|n| n.checked_add(geometry.row_bytes() as u64))
        .and_then(|n| n.checked_add(offset))
        .ok_or(ConvertError::DimensionsTooLarge {
            width: geometry.width,
            height: geometry.height,
        })?;
    let end = source.seek(SeekFrom::End(0))?;
    if end < needed {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            alloc::format!("pixel data needs {needed} bytes, source has {end}"),
        )
        .into());
    }
    let mut plane = PixelPlane::zeroed(geometry, limits)?;

    source.seek(SeekFrom::Start(offset))?;
    for r in 0..geometry.height as usize {
        source.read_exact(plane.row_pixels_mut(r))?;
        if padding > 0 {
            source.seek(SeekFrom::Current(padding))?;
        }
    }
    trace!("read {} rows of {} bytes", geometry.height, geometry.row_bytes());

    let color_map = match headers.color_map_size() {
        Some(size) => {
            let start = offset
                .checked_sub(size as u64)
                .filter(|&s| s >= HEADERS_SIZE as u64)
                .ok_or_else(|| {
                    ConvertError::InvalidFormat(alloc::format!(
                        "pixel offset {offset} leaves no room for a {size}-byte colour map"
                    ))
                })?;
            let mut bytes = try_zeroed_within(size, limits)?;
            source.seek(SeekFrom::Start(start))?;
            source.read_exact(&mut bytes)?;
            debug!("read {}-entry colour map at offset {start}", size / PALETTE_ENTRY_SIZE);
            Some(ColorMap::from_bytes(bytes)?)
        }
        None => None,
    };

    Ok((plane, color_map))
}

/// Read headers, pixel plane and colour map from a seekable source.
pub fn read_bmp<R: Read + Seek>(
    source: &mut R,
    limits: Option<&Limits>,
) -> Result<BmpImage, ConvertError> {
    let headers = read_headers(source)?;
    let (plane, color_map) = read_plane(source, &headers, limits)?;
    Ok(BmpImage {
        headers,
        plane,
        color_map,
    })
}

/// Write headers, colour map and pixel plane.
///
/// Each row's pixel bytes are followed by zero padding regardless of what
/// the plane holds in its padding. Any space between the headers and the
/// pixel offset that the colour map does not fill is zero-filled ahead of
/// the map, so the map always ends at the pixel offset.
pub fn write_plane<W: Write>(
    dest: &mut W,
    headers: &BmpHeaders,
    plane: &PixelPlane,
    color_map: Option<&ColorMap>,
) -> Result<(), ConvertError> {
    let geometry = headers.plane_geometry()?;
    if geometry != plane.geometry() {
        return Err(ConvertError::InvalidFormat(alloc::format!(
            "headers describe {}x{} {:?}, plane is {}x{} {:?}",
            geometry.width,
            geometry.height,
            geometry.layout,
            plane.width(),
            plane.height(),
            plane.layout()
        )));
    }

    let reserved = (headers.file.pixel_offset as usize)
        .checked_sub(HEADERS_SIZE)
        .ok_or_else(|| {
            ConvertError::InvalidFormat(alloc::format!(
                "pixel offset {} lies inside the headers",
                headers.file.pixel_offset
            ))
        })?;
    let map_bytes: &[u8] = match color_map {
        Some(map) => {
            let expected = headers.color_map_size().ok_or_else(|| {
                ConvertError::InvalidFormat("colour map given for a true-color image".into())
            })?;
            if map.as_bytes().len() != expected || expected > reserved {
                return Err(ConvertError::InvalidFormat(alloc::format!(
                    "colour map of {} bytes does not match the {expected} bytes the headers reserve",
                    map.as_bytes().len()
                )));
            }
            map.as_bytes()
        }
        None => &[],
    };

    headers.write_to(dest)?;
    write_zeros(dest, reserved - map_bytes.len())?;
    dest.write_all(map_bytes)?;

    let padding = [0u8; 3];
    let pad = geometry.padding();
    for r in 0..geometry.height as usize {
        dest.write_all(plane.row_pixels(r))?;
        dest.write_all(&padding[..pad])?;
    }
    Ok(())
}

/// Serialize a complete BMP file into memory.
pub fn encode_bmp(
    headers: &BmpHeaders,
    plane: &PixelPlane,
    color_map: Option<&ColorMap>,
) -> Result<Vec<u8>, ConvertError> {
    let mut out = Vec::new();
    out.try_reserve_exact(headers.file.file_size as usize)
        .map_err(|_| ConvertError::AllocationFailure {
            bytes: headers.file.file_size as usize,
        })?;
    write_plane(&mut out, headers, plane, color_map)?;
    Ok(out)
}

fn write_zeros<W: Write>(dest: &mut W, mut n: usize) -> Result<(), ConvertError> {
    let zeros = [0u8; 256];
    while n > 0 {
        let chunk = n.min(zeros.len());
        dest.write_all(&zeros[..chunk])?;
        n -= chunk;
    }
    Ok(())
}
