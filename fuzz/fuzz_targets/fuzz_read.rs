#![no_main]
use libfuzzer_sys::fuzz_target;
use zenbmpjpeg::{Converter, Limits};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 22),
        max_memory_bytes: Some(1 << 26),
        ..Default::default()
    };

    // Header and plane parsing must never panic
    let _ = zenbmpjpeg::bmp::read_bmp(&mut std::io::Cursor::new(data), Some(&limits));

    // Nor may either full conversion
    let converter = Converter::new().with_limits(limits);
    let _ = converter.bmp_bytes_to_jpeg(data);
    let _ = converter.jpeg_bytes_to_bmp(data);
});
