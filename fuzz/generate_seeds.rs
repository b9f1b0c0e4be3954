#!/usr/bin/env -S cargo +nightly -Zscript
//! Generate seed corpus files for fuzzing.
//! Run: cargo +nightly -Zscript fuzz/generate_seeds.rs

fn bmp_header(width: i32, height: i32, bpp: u16, offset: u32, colors: u32, file_size: u32) -> Vec<u8> {
    let mut h = vec![0u8; 54];
    h[0] = b'B';
    h[1] = b'M';
    h[2..6].copy_from_slice(&file_size.to_le_bytes());
    h[10..14].copy_from_slice(&offset.to_le_bytes()); // data offset
    h[14..18].copy_from_slice(&40u32.to_le_bytes()); // format header size
    h[18..22].copy_from_slice(&width.to_le_bytes());
    h[22..26].copy_from_slice(&height.to_le_bytes());
    h[26..28].copy_from_slice(&1u16.to_le_bytes()); // planes
    h[28..30].copy_from_slice(&bpp.to_le_bytes());
    h[38..42].copy_from_slice(&3780i32.to_le_bytes()); // 96 dpi
    h[42..46].copy_from_slice(&3780i32.to_le_bytes());
    h[46..50].copy_from_slice(&colors.to_le_bytes());
    h
}

fn main() {
    use std::fs;
    let dir = "fuzz/corpus/fuzz_read";
    fs::create_dir_all(dir).unwrap();

    // 24-bit 1x1: 3 pixel bytes + 1 padding
    let mut bmp = bmp_header(1, 1, 24, 54, 0, 58);
    bmp.extend_from_slice(&[0xff, 0x00, 0x00, 0x00]);
    fs::write(format!("{dir}/bmp24_1x1.bmp"), bmp).unwrap();

    // 24-bit 5x2: stride 16, 1 padding byte per row
    let mut bmp = bmp_header(5, 2, 24, 54, 0, 54 + 32);
    for i in 0..2u8 {
        bmp.extend((0..15).map(|b| b * 17 + i));
        bmp.push(0);
    }
    fs::write(format!("{dir}/bmp24_5x2.bmp"), bmp).unwrap();

    // 8-bit 3x3 with a 4-entry palette
    let mut bmp = bmp_header(3, 3, 8, 54 + 16, 4, 54 + 16 + 12);
    for i in 0..4u8 {
        bmp.extend_from_slice(&[i * 85, i * 85, i * 85, 0]);
    }
    for r in 0..3u8 {
        bmp.extend_from_slice(&[r, (r + 1) % 4, (r + 2) % 4, 0]);
    }
    fs::write(format!("{dir}/bmp8_3x3.bmp"), bmp).unwrap();

    // Truncated/malformed seeds for edge coverage
    fs::write(format!("{dir}/empty.bin"), b"").unwrap();
    fs::write(format!("{dir}/bm_short.bin"), b"BM\x00\x00").unwrap();
    fs::write(format!("{dir}/soi_only.bin"), b"\xff\xd8\xff").unwrap();
    fs::write(format!("{dir}/bmp16.bin"), bmp_header(2, 2, 16, 54, 0, 62)).unwrap();
    fs::write(format!("{dir}/bmp_topdown.bin"), bmp_header(2, -2, 24, 54, 0, 70)).unwrap();

    println!("Generated seed corpus in {dir}/");
}
