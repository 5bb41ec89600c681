use super::frame::padded_stride;
use super::{
    ByteOrder, CaptureError, DisplayConnection, PixelFormat, Point, PointerEvent, RawFrame, Region,
    TreeNode, WindowId,
};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

/// `PointerRoot`, as reported in GetInputFocus replies.
const POINTER_ROOT: Window = 1;

/// Connection to the X server named by `$DISPLAY`.
pub struct X11Connection {
    conn: RustConnection,
    screen_num: usize,
    /// XOR graphics context for the selection outline.
    feedback_gc: Gcontext,
}

impl X11Connection {
    pub fn connect() -> Result<Self, CaptureError> {
        let (conn, screen_num) =
            RustConnection::connect(None).map_err(|e| CaptureError::Connect(e.to_string()))?;
        let screen = &conn.setup().roots[screen_num];

        let feedback_gc = conn
            .generate_id()
            .map_err(|e| CaptureError::X11(format!("generate_id failed: {e}")))?;
        let values = CreateGCAux::new()
            .function(GX::XOR)
            .foreground(screen.white_pixel)
            .background(screen.black_pixel)
            .subwindow_mode(SubwindowMode::INCLUDE_INFERIORS);
        conn.create_gc(feedback_gc, screen.root, &values)
            .map_err(|e| CaptureError::X11(format!("create_gc failed: {e}")))?;

        log::debug!(
            "connected to screen {screen_num}: root {:#x}, {}x{}, depth {}",
            screen.root,
            screen.width_in_pixels,
            screen.height_in_pixels,
            screen.root_depth
        );

        Ok(Self {
            conn,
            screen_num,
            feedback_gc,
        })
    }

    fn screen(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    fn pixmap_format(&self, depth: u8) -> Result<&Format, CaptureError> {
        self.conn
            .setup()
            .pixmap_formats
            .iter()
            .find(|f| f.depth == depth)
            .ok_or_else(|| CaptureError::Capture(format!("no pixmap format for depth {depth}")))
    }

    fn visual_type(&self, visual: Visualid) -> Option<&Visualtype> {
        self.screen()
            .allowed_depths
            .iter()
            .flat_map(|d| &d.visuals)
            .find(|v| v.visual_id == visual)
    }

    fn byte_order(&self) -> ByteOrder {
        if self.conn.setup().image_byte_order == ImageOrder::MSB_FIRST {
            ByteOrder::MsbFirst
        } else {
            ByteOrder::LsbFirst
        }
    }

    /// Layout of an image of `depth` bits using `visual`. Images of windows
    /// without their own visual fall back to the root visual.
    fn format_for(&self, visual: Visualid, depth: u8) -> Result<PixelFormat, CaptureError> {
        let visual = if visual == x11rb::NONE {
            self.screen().root_visual
        } else {
            visual
        };
        let visual_type = self
            .visual_type(visual)
            .ok_or_else(|| CaptureError::Capture(format!("unknown visual {visual:#x}")))?;
        Ok(PixelFormat {
            bits_per_pixel: self.pixmap_format(depth)?.bits_per_pixel,
            red_mask: visual_type.red_mask,
            green_mask: visual_type.green_mask,
            blue_mask: visual_type.blue_mask,
            byte_order: self.byte_order(),
        })
    }
}

impl Drop for X11Connection {
    fn drop(&mut self) {
        let _ = self.conn.free_gc(self.feedback_gc);
        let _ = self.conn.flush();
    }
}

fn coord(value: i32) -> Result<i16, CaptureError> {
    i16::try_from(value)
        .map_err(|_| CaptureError::Capture(format!("coordinate {value} is out of range")))
}

fn extent(value: u32) -> Result<u16, CaptureError> {
    u16::try_from(value)
        .map_err(|_| CaptureError::Capture(format!("size {value} is out of range")))
}

/// Outlines are cosmetic, so out-of-range values are clamped.
fn to_rectangle(rect: Region) -> Rectangle {
    Rectangle {
        x: rect.x.clamp(i16::MIN.into(), i16::MAX.into()) as i16,
        y: rect.y.clamp(i16::MIN.into(), i16::MAX.into()) as i16,
        width: rect.width.min(u16::MAX.into()) as u16,
        height: rect.height.min(u16::MAX.into()) as u16,
    }
}

fn root_point(x: i16, y: i16) -> Point {
    Point::new(x.into(), y.into())
}

impl DisplayConnection for X11Connection {
    fn root(&self) -> WindowId {
        self.screen().root
    }

    fn pixel_format(&self) -> PixelFormat {
        let screen = self.screen();
        self.format_for(screen.root_visual, screen.root_depth)
            .unwrap_or(PixelFormat {
                bits_per_pixel: 32,
                red_mask: 0xff0000,
                green_mask: 0x00ff00,
                blue_mask: 0x0000ff,
                byte_order: self.byte_order(),
            })
    }

    fn geometry(&self, window: WindowId) -> Result<Region, CaptureError> {
        let geo = self
            .conn
            .get_geometry(window)
            .map_err(|e| CaptureError::WindowQuery(format!("get_geometry failed: {e}")))?
            .reply()
            .map_err(|e| CaptureError::WindowQuery(format!("get_geometry reply failed: {e}")))?;
        Ok(Region::new(
            geo.x.into(),
            geo.y.into(),
            geo.width.into(),
            geo.height.into(),
        ))
    }

    fn query_tree(&self, window: WindowId) -> Result<TreeNode, CaptureError> {
        let tree = self
            .conn
            .query_tree(window)
            .map_err(|e| CaptureError::WindowQuery(format!("query_tree failed: {e}")))?
            .reply()
            .map_err(|e| CaptureError::WindowQuery(format!("query_tree reply failed: {e}")))?;
        Ok(TreeNode {
            root: tree.root,
            parent: tree.parent,
        })
    }

    fn input_focus(&self) -> Result<Option<WindowId>, CaptureError> {
        let focus = self
            .conn
            .get_input_focus()
            .map_err(|e| CaptureError::WindowQuery(format!("get_input_focus failed: {e}")))?
            .reply()
            .map_err(|e| CaptureError::WindowQuery(format!("get_input_focus reply failed: {e}")))?
            .focus;
        if focus == x11rb::NONE || focus == POINTER_ROOT {
            return Ok(None);
        }
        Ok(Some(focus))
    }

    fn read_pixels(&self, window: WindowId, area: Region) -> Result<RawFrame, CaptureError> {
        let reply = self
            .conn
            .get_image(
                ImageFormat::Z_PIXMAP,
                window,
                coord(area.x)?,
                coord(area.y)?,
                extent(area.width)?,
                extent(area.height)?,
                !0,
            )
            .map_err(|e| CaptureError::Capture(format!("get_image failed: {e}")))?
            .reply()
            .map_err(|e| CaptureError::Capture(format!("get_image reply failed: {e}")))?;

        let format = self.format_for(reply.visual, reply.depth)?;
        let scanline_pad = self.pixmap_format(reply.depth)?.scanline_pad;
        log::debug!(
            "get_image: depth {}, {} bpp, masks {:#x}/{:#x}/{:#x}",
            reply.depth,
            format.bits_per_pixel,
            format.red_mask,
            format.green_mask,
            format.blue_mask
        );

        Ok(RawFrame {
            width: area.width,
            height: area.height,
            stride: padded_stride(area.width, format.bits_per_pixel, scanline_pad),
            format,
            data: reply.data,
        })
    }

    fn grab_pointer(&self) -> Result<(), CaptureError> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root(),
                EventMask::BUTTON_MOTION | EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                x11rb::CURRENT_TIME,
            )
            .map_err(|e| CaptureError::PointerGrab(format!("grab_pointer failed: {e}")))?
            .reply()
            .map_err(|e| CaptureError::PointerGrab(format!("grab_pointer reply failed: {e}")))?;
        if reply.status != GrabStatus::SUCCESS {
            return Err(CaptureError::PointerGrab(format!("{:?}", reply.status)));
        }
        Ok(())
    }

    fn ungrab_pointer(&self) -> Result<(), CaptureError> {
        self.conn
            .ungrab_pointer(x11rb::CURRENT_TIME)
            .map_err(|e| CaptureError::X11(format!("ungrab_pointer failed: {e}")))?;
        Ok(())
    }

    fn grab_server(&self) -> Result<(), CaptureError> {
        self.conn
            .grab_server()
            .map_err(|e| CaptureError::X11(format!("grab_server failed: {e}")))?;
        Ok(())
    }

    fn ungrab_server(&self) -> Result<(), CaptureError> {
        self.conn
            .ungrab_server()
            .map_err(|e| CaptureError::X11(format!("ungrab_server failed: {e}")))?;
        Ok(())
    }

    fn draw_feedback(&self, rect: Region) -> Result<(), CaptureError> {
        self.conn
            .poly_rectangle(self.root(), self.feedback_gc, &[to_rectangle(rect)])
            .map_err(|e| CaptureError::X11(format!("poly_rectangle failed: {e}")))?;
        Ok(())
    }

    fn flush(&self) -> Result<(), CaptureError> {
        self.conn
            .flush()
            .map_err(|e| CaptureError::X11(format!("flush failed: {e}")))
    }

    fn next_pointer_event(&self) -> Result<PointerEvent, CaptureError> {
        loop {
            let event = self
                .conn
                .wait_for_event()
                .map_err(|e| CaptureError::X11(format!("wait_for_event failed: {e}")))?;
            match event {
                Event::ButtonPress(e) => {
                    return Ok(PointerEvent::Press(root_point(e.root_x, e.root_y)));
                }
                Event::MotionNotify(e) => {
                    return Ok(PointerEvent::Motion(root_point(e.root_x, e.root_y)));
                }
                Event::ButtonRelease(e) => {
                    return Ok(PointerEvent::Release(root_point(e.root_x, e.root_y)));
                }
                Event::Error(e) => log::warn!("X11 error during selection: {e:?}"),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlines_clamp_to_protocol_range() {
        let rect = to_rectangle(Region::new(-40_000, 10, 70_000, 5));
        assert_eq!((rect.x, rect.y), (i16::MIN, 10));
        assert_eq!((rect.width, rect.height), (u16::MAX, 5));
    }

    #[test]
    fn oversized_reads_are_rejected() {
        assert!(coord(40_000).is_err());
        assert!(extent(70_000).is_err());
        assert_eq!(coord(-5).unwrap(), -5);
        assert_eq!(extent(1920).unwrap(), 1920);
    }
}
