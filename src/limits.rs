use alloc::vec::Vec;

use crate::error::ConvertError;

/// Resource limits for conversions.
///
/// All fields default to `None` (no limit).
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum bytes for any single pixel buffer allocation.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Refuse an image whose width, height or pixel count is over its cap.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), ConvertError> {
        if let Some(max_w) = self.max_width {
            if u64::from(width) > max_w {
                return Err(ConvertError::LimitExceeded(alloc::format!(
                    "width {width} exceeds limit {max_w}"
                )));
            }
        }
        if let Some(max_h) = self.max_height {
            if u64::from(height) > max_h {
                return Err(ConvertError::LimitExceeded(alloc::format!(
                    "height {height} exceeds limit {max_h}"
                )));
            }
        }
        if let Some(max_px) = self.max_pixels {
            let pixels = u64::from(width) * u64::from(height);
            if pixels > max_px {
                return Err(ConvertError::LimitExceeded(alloc::format!(
                    "pixel count {pixels} exceeds limit {max_px}"
                )));
            }
        }
        Ok(())
    }

    /// Refuse a single buffer of `bytes` when it is over `max_memory_bytes`.
    pub(crate) fn check_memory(&self, bytes: usize) -> Result<(), ConvertError> {
        if let Some(max_mem) = self.max_memory_bytes {
            if bytes as u64 > max_mem {
                return Err(ConvertError::LimitExceeded(alloc::format!(
                    "allocation {bytes} bytes exceeds memory limit {max_mem}"
                )));
            }
        }
        Ok(())
    }
}

/// Allocate a zero-filled buffer, reporting failure instead of aborting.
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<u8>, ConvertError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ConvertError::AllocationFailure { bytes: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// [`try_zeroed`] after checking `len` against `limits`.
pub(crate) fn try_zeroed_within(
    len: usize,
    limits: Option<&Limits>,
) -> Result<Vec<u8>, ConvertError> {
    if let Some(limits) = limits {
        limits.check_memory(len)?;
    }
    try_zeroed(len)
}
