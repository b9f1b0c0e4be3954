use std::io::Cursor;

use zenbmpjpeg::bmp::{self, ColorMap, HeaderParams, PixelPlane, PlaneGeometry};
use zenbmpjpeg::*;

fn noise_pattern(len: usize, seed: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    let mut state: u32 = seed;
    for b in bytes.iter_mut() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        *b = state as u8;
    }
    bytes
}

/// A plane full of noise with every padding byte zeroed.
fn noise_plane(width: u32, height: u32, bits_per_pixel: u16) -> PixelPlane {
    let geometry = PlaneGeometry::new(width, height, bits_per_pixel).unwrap();
    let mut plane = PixelPlane::zeroed(geometry, None).unwrap();
    let noise = noise_pattern(geometry.row_bytes() * height as usize, width ^ (height << 16));
    for (r, src) in noise.chunks_exact(geometry.row_bytes()).enumerate() {
        plane.row_pixels_mut(r).copy_from_slice(src);
    }
    plane
}

#[test]
fn plane_packed_plane_is_identity() {
    for bits in [8u16, 24] {
        for width in 1..=9u32 {
            for height in [1u32, 2, 5] {
                let plane = noise_plane(width, height, bits);
                let bpp = usize::from(bits / 8);
                let packed = to_packed(plane.as_bytes(), width, height, bpp).unwrap();
                assert_eq!(packed.len(), width as usize * height as usize * bpp);
                let back = to_plane(&packed, width, height, bpp).unwrap();
                assert_eq!(
                    back,
                    plane.as_bytes(),
                    "{width}x{height} at {bits} bpp did not survive"
                );
            }
        }
    }
}

#[test]
fn packed_plane_packed_is_identity() {
    for components in [1usize, 3] {
        for width in 1..=9u32 {
            for height in [1u32, 2, 5] {
                let len = width as usize * height as usize * components;
                let packed = noise_pattern(len, width * 31 + height * 7 + components as u32);
                let plane = to_plane(&packed, width, height, components).unwrap();
                assert_eq!(plane.len(), bmp::stride((components * 8) as u16, width) * height as usize);
                let back = to_packed(&plane, width, height, components).unwrap();
                assert_eq!(back, packed, "{width}x{height} with {components} components did not survive");
            }
        }
    }
}

#[test]
fn typed_round_trip_through_packed_image() {
    let plane = noise_plane(7, 3, 24);
    let packed = plane.to_packed().unwrap();
    assert_eq!(packed.layout(), PixelLayout::Rgb8);
    let px: &[rgb::RGB8] = packed.as_pixels().unwrap();
    assert_eq!(px.len(), 21);

    let back = packed.to_plane(None).unwrap();
    assert_eq!(back, plane);
    assert_eq!(back.layout(), PixelLayout::Bgr8);
}

#[test]
fn two_by_two_true_color() {
    // bottom row first, 2 padding bytes per row
    #[rustfmt::skip]
    let plane = [
        0xB0, 0x60, 0x40, 0xB1, 0x61, 0x41, 0, 0,
        0xB2, 0x62, 0x42, 0xB3, 0x63, 0x43, 0, 0,
    ];
    let packed = to_packed(&plane, 2, 2, 3).unwrap();
    #[rustfmt::skip]
    let expected = [
        0x42, 0x62, 0xB2, 0x43, 0x63, 0xB3,
        0x40, 0x60, 0xB0, 0x41, 0x61, 0xB1,
    ];
    assert_eq!(packed, expected);
    assert_eq!(to_plane(&packed, 2, 2, 3).unwrap(), plane);
}

#[test]
fn sixteen_bit_depth_is_unsupported() {
    assert!(matches!(
        to_packed(&[0u8; 64], 4, 4, 2),
        Err(ConvertError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        PlaneGeometry::new(4, 4, 16),
        Err(ConvertError::UnsupportedFormat(_))
    ));
}

#[test]
fn palette_index_passes_through() {
    let geometry = PlaneGeometry::new(3, 2, 8).unwrap();
    let mut plane = PixelPlane::zeroed(geometry, None).unwrap();
    // logical (0,0) is the top-left pixel, stored in the last container row
    plane.row_pixels_mut(1)[0] = 0x7F;

    let packed = plane.to_packed().unwrap();
    assert_eq!(packed.layout(), PixelLayout::Gray8);
    assert_eq!(packed.pixels()[0], 0x7F);
    assert_eq!(packed.row(0), &[0x7F, 0, 0]);
}

#[test]
fn stride_formula() {
    for bits in [8u16, 24] {
        for width in 1..=64u32 {
            let expected = 4 * (u64::from(bits) * u64::from(width)).div_ceil(32) as usize;
            assert_eq!(bmp::stride(bits, width), expected);
            assert_eq!(bmp::stride(bits, width) % 4, 0);
        }
    }
    assert_eq!(bmp::stride(24, 5), 16);
    assert_eq!(PlaneGeometry::new(5, 1, 24).unwrap().padding(), 1);
}

#[test]
fn headers_survive_serialization() {
    let params = HeaderParams::new(33, 17, 24).with_dpi(300, 72);
    let headers = bmp::build_headers(&params).unwrap();
    let bytes = headers.to_bytes();
    assert_eq!(&bytes[..2], b"BM");

    let parsed = bmp::read_headers(&mut Cursor::new(&bytes[..])).unwrap();
    assert_eq!(parsed, headers);
    assert_eq!(parsed.params(), params);
    assert_eq!(parsed.dpi(), (300, 72));
}

#[test]
fn true_color_file_round_trip() {
    let plane = noise_plane(5, 4, 24);
    let headers = bmp::build_headers(&HeaderParams::new(5, 4, 24)).unwrap();
    let file = bmp::encode_bmp(&headers, &plane, None).unwrap();
    assert_eq!(file.len(), 54 + 16 * 4);
    assert_eq!(file.len(), headers.file.file_size as usize);

    let image = bmp::read_bmp(&mut Cursor::new(&file), None).unwrap();
    assert_eq!(image.headers, headers);
    assert_eq!(image.plane, plane);
    assert!(image.color_map.is_none());
}

#[test]
fn indexed_file_round_trip_with_palette() {
    let plane = noise_plane(6, 3, 8);
    let mut entries = noise_pattern(16 * 4, 7);
    for e in entries.chunks_exact_mut(4) {
        e[3] = 0;
    }
    let map = ColorMap::from_bytes(entries).unwrap();
    let headers = bmp::build_headers(&HeaderParams::new(6, 3, 8).with_palette(16, 16)).unwrap();
    assert_eq!(headers.file.pixel_offset, 54 + 64);

    let file = bmp::encode_bmp(&headers, &plane, Some(&map)).unwrap();
    let image = bmp::read_bmp(&mut Cursor::new(&file), None).unwrap();
    assert_eq!(image.plane, plane);
    assert_eq!(image.color_map.as_ref(), Some(&map));
    assert_eq!(image.color_map.unwrap().len(), 16);
}

#[test]
fn grayscale_ramp_file_round_trip() {
    let plane = noise_plane(4, 4, 8);
    let headers = bmp::build_headers(&HeaderParams::new(4, 4, 8)).unwrap();
    assert_eq!(headers.file.pixel_offset, 54 + 1024);

    let file = bmp::encode_bmp(&headers, &plane, Some(&ColorMap::grayscale_ramp())).unwrap();
    let image = bmp::read_bmp(&mut Cursor::new(&file), None).unwrap();
    let map = image.color_map.unwrap();
    assert!(map.is_grayscale_ramp());
    let entry = map.entries().nth(200).unwrap();
    assert_eq!((entry.b, entry.g, entry.r), (200, 200, 200));
}

#[test]
fn padding_is_written_as_zero() {
    let geometry = PlaneGeometry::new(1, 2, 24).unwrap();
    let dirty = PixelPlane::from_vec(vec![0xAA; 8], geometry).unwrap();
    let headers = bmp::build_headers(&HeaderParams::new(1, 2, 24)).unwrap();
    let file = bmp::encode_bmp(&headers, &dirty, None).unwrap();
    assert_eq!(&file[54..], &[0xAA, 0xAA, 0xAA, 0, 0xAA, 0xAA, 0xAA, 0]);
}

#[test]
fn truncated_pixel_data_is_io_error() {
    let plane = noise_plane(8, 8, 24);
    let headers = bmp::build_headers(&HeaderParams::new(8, 8, 24)).unwrap();
    let mut file = bmp::encode_bmp(&headers, &plane, None).unwrap();
    file.truncate(file.len() - 10);

    let err = bmp::read_bmp(&mut Cursor::new(&file), None).unwrap_err();
    assert!(err.is_io(), "{err:?}");
}
