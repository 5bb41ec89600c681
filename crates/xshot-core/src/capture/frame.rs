use super::{CaptureError, DisplayConnection, Drawable, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LsbFirst,
    MsbFirst,
}

/// How one pixel is packed in a server image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub byte_order: ByteOrder,
}

/// Pixel data exactly as the server delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per scanline, padding included.
    pub stride: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// A frame with no pixels, for degenerate geometries the server is never
    /// asked about.
    pub fn empty(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            stride: 0,
            format,
            data: Vec::new(),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.format.bits_per_pixel).div_ceil(8)
    }

    /// Check that every `pixel(x, y)` inside the frame is backed by data.
    pub fn check_bounds(&self) -> Result<(), CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        let row = self.width as usize * self.bytes_per_pixel();
        let needed = self.stride.checked_mul(self.height as usize);
        if self.stride < row || needed.is_none_or(|n| self.data.len() < n) {
            return Err(CaptureError::Capture(format!(
                "short image data: {} bytes for {}x{} with {} byte stride",
                self.data.len(),
                self.width,
                self.height,
                self.stride
            )));
        }
        Ok(())
    }

    /// Packed pixel value at (x, y). Callers must have run `check_bounds`.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        let bytes = self.bytes_per_pixel();
        let start = y as usize * self.stride + x as usize * bytes;
        let raw = &self.data[start..start + bytes];
        match self.format.byte_order {
            ByteOrder::LsbFirst => raw
                .iter()
                .rev()
                .fold(0, |acc, &b| (acc << 8) | u32::from(b)),
            ByteOrder::MsbFirst => raw.iter().fold(0, |acc, &b| (acc << 8) | u32::from(b)),
        }
    }
}

/// Scanline length in bytes for `width` pixels, rounded up to the
/// server's scanline pad (in bits).
pub fn padded_stride(width: u32, bits_per_pixel: u8, scanline_pad: u8) -> usize {
    let bits = width as usize * usize::from(bits_per_pixel);
    let pad = usize::from(scanline_pad.max(8));
    bits.div_ceil(pad) * pad / 8
}

/// Read the raw pixels behind `drawable`.
///
/// Windows are re-measured so the server's current size wins over whatever
/// the resolver saw. Selected regions are read from the root window at the
/// selection's offset.
pub fn capture_frame<C: DisplayConnection>(
    conn: &C,
    drawable: &Drawable,
) -> Result<RawFrame, CaptureError> {
    let (window, area) = match *drawable {
        Drawable::Window { id, .. } => {
            let geometry = conn.geometry(id)?;
            (id, Region::new(0, 0, geometry.width, geometry.height))
        }
        Drawable::RootRegion(region) => (conn.root(), region),
    };

    if area.is_empty() {
        return Ok(RawFrame::empty(area.width, area.height, conn.pixel_format()));
    }
    conn.read_pixels(window, area)
}

#[cfg(test)]
mod tests {
    use super::super::testing::FakeConnection;
    use super::*;

    fn format(bits_per_pixel: u8, byte_order: ByteOrder) -> PixelFormat {
        PixelFormat {
            bits_per_pixel,
            red_mask: 0xff0000,
            green_mask: 0x00ff00,
            blue_mask: 0x0000ff,
            byte_order,
        }
    }

    #[test]
    fn stride_rounds_up_to_scanline_pad() {
        assert_eq!(padded_stride(3, 32, 32), 12);
        assert_eq!(padded_stride(3, 24, 32), 12);
        assert_eq!(padded_stride(3, 16, 32), 8);
        assert_eq!(padded_stride(4, 16, 32), 8);
        assert_eq!(padded_stride(5, 24, 8), 15);
    }

    #[test]
    fn pixel_honours_byte_order() {
        let data = vec![0x11, 0x22, 0x33, 0x44];
        let lsb = RawFrame {
            width: 1,
            height: 1,
            stride: 4,
            format: format(32, ByteOrder::LsbFirst),
            data: data.clone(),
        };
        let msb = RawFrame {
            format: format(32, ByteOrder::MsbFirst),
            ..lsb.clone()
        };
        assert_eq!(lsb.pixel(0, 0), 0x4433_2211);
        assert_eq!(msb.pixel(0, 0), 0x1122_3344);
    }

    #[test]
    fn pixel_skips_row_padding() {
        // 1x2 at 24 bpp, rows padded to 4 bytes
        let frame = RawFrame {
            width: 1,
            height: 2,
            stride: 4,
            format: format(24, ByteOrder::LsbFirst),
            data: vec![0x01, 0x02, 0x03, 0xee, 0x04, 0x05, 0x06, 0xee],
        };
        assert_eq!(frame.pixel(0, 0), 0x030201);
        assert_eq!(frame.pixel(0, 1), 0x060504);
    }

    #[test]
    fn short_data_is_rejected() {
        let frame = RawFrame {
            width: 2,
            height: 2,
            stride: 8,
            format: format(32, ByteOrder::LsbFirst),
            data: vec![0; 12],
        };
        assert!(matches!(frame.check_bounds(), Err(CaptureError::Capture(_))));

        let narrow = RawFrame {
            stride: 4,
            data: vec![0; 16],
            ..frame
        };
        assert!(matches!(narrow.check_bounds(), Err(CaptureError::Capture(_))));
    }

    #[test]
    fn window_size_comes_from_the_server() {
        let conn = FakeConnection::new().with_window(0x40, 1, Region::new(5, 5, 12, 9));
        let stale = Drawable::Window {
            id: 0x40,
            geometry: Region::new(5, 5, 800, 600),
        };

        let frame = capture_frame(&conn, &stale).unwrap();

        assert_eq!((frame.width, frame.height), (12, 9));
        assert_eq!(conn.reads(), vec![(0x40, Region::new(0, 0, 12, 9))]);
    }

    #[test]
    fn missing_window_is_a_query_error() {
        let conn = FakeConnection::new();
        let gone = Drawable::Window {
            id: 0x99,
            geometry: Region::new(0, 0, 10, 10),
        };
        assert!(matches!(
            capture_frame(&conn, &gone),
            Err(CaptureError::WindowQuery(_))
        ));
    }

    #[test]
    fn empty_region_skips_the_server() {
        let conn = FakeConnection::new();
        let frame = capture_frame(&conn, &Drawable::RootRegion(Region::new(3, 3, 0, 10))).unwrap();
        assert_eq!((frame.width, frame.height), (0, 10));
        assert!(frame.data.is_empty());
        assert!(conn.reads().is_empty());
    }
}
