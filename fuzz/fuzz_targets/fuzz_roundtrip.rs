#![no_main]
use libfuzzer_sys::fuzz_target;
use zenbmpjpeg::{to_packed, to_plane};

fuzz_target!(|data: &[u8]| {
    let [w, h, depth, pixels @ ..] = data else {
        return;
    };
    let width = u32::from(*w % 64) + 1;
    let height = u32::from(*h % 64) + 1;
    let bpp = if depth & 1 == 0 { 1 } else { 3 };

    // Build a plane with zero padding from the fuzz bytes
    let row_bytes = width as usize * bpp;
    let stride = zenbmpjpeg::bmp::stride((bpp * 8) as u16, width);
    let mut plane = vec![0u8; stride * height as usize];
    for (r, row) in plane.chunks_exact_mut(stride).enumerate() {
        for (i, b) in row[..row_bytes].iter_mut().enumerate() {
            *b = pixels.get(r * row_bytes + i).copied().unwrap_or(0);
        }
    }

    let packed = to_packed(&plane, width, height, bpp).expect("valid plane must pack");
    assert_eq!(packed.len(), row_bytes * height as usize);
    let back = to_plane(&packed, width, height, bpp).expect("valid packed must unpack");
    assert_eq!(back, plane, "plane -> packed -> plane mismatch");

    // Any packed buffer survives a trip through the padded layout
    let packed: Vec<u8> = (0..row_bytes * height as usize)
        .map(|i| pixels.get(i).copied().unwrap_or(0))
        .collect();
    let plane = to_plane(&packed, width, height, bpp).expect("valid packed must unpack");
    let again = to_packed(&plane, width, height, bpp).expect("valid plane must pack");
    assert_eq!(again, packed, "packed -> plane -> packed mismatch");
});
