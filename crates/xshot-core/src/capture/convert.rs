use super::{CaptureError, RawFrame};
use image::RgbImage;

/// The pixel sizes X servers actually hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Bpp16,
    Bpp24,
    Bpp32,
}

impl Depth {
    fn from_bits(bits_per_pixel: u8) -> Result<Self, CaptureError> {
        match bits_per_pixel {
            16 => Ok(Depth::Bpp16),
            24 => Ok(Depth::Bpp24),
            32 => Ok(Depth::Bpp32),
            other => Err(CaptureError::UnsupportedFormat(other)),
        }
    }

    /// Right shifts for the masked red and green channels. Blue sits in the
    /// low bits already.
    fn shifts(self) -> (u32, u32) {
        match self {
            Depth::Bpp16 => (11, 5),
            Depth::Bpp24 | Depth::Bpp32 => (16, 8),
        }
    }
}

/// Convert a server frame to tightly packed 8-bit RGB.
///
/// Each channel is masked before it is shifted so neighbouring channels
/// never bleed into each other.
pub fn convert(frame: RawFrame) -> Result<RgbImage, CaptureError> {
    let (red_shift, green_shift) = Depth::from_bits(frame.format.bits_per_pixel)?.shifts();
    frame.check_bounds()?;

    let len = (frame.width as usize)
        .checked_mul(frame.height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or(CaptureError::Allocation(usize::MAX))?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| CaptureError::Allocation(len))?;

    let format = frame.format;
    for y in 0..frame.height {
        for x in 0..frame.width {
            let pixel = frame.pixel(x, y);
            data.push(((pixel & format.red_mask) >> red_shift) as u8);
            data.push(((pixel & format.green_mask) >> green_shift) as u8);
            data.push((pixel & format.blue_mask) as u8);
        }
    }

    RgbImage::from_raw(frame.width, frame.height, data).ok_or_else(|| {
        CaptureError::Capture("pixel buffer does not match image dimensions".to_string())
    })
}
