pub mod convert;
pub mod frame;
pub mod resolve;
pub mod select;
pub mod x11;

#[cfg(test)]
pub(crate) mod testing;

use image::RgbImage;
use std::fmt;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;

pub use frame::{ByteOrder, PixelFormat, RawFrame};
pub use resolve::Drawable;
pub use x11::X11Connection;

/// Server-side window id.
pub type WindowId = u32;

/// The "no window" id returned by the server.
pub const NO_WINDOW: WindowId = 0;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("cannot connect to display: {0}")]
    Connect(String),
    #[error("no window is being focused")]
    NoFocus,
    #[error("window query failed: {0}")]
    WindowQuery(String),
    #[error("image capture failed: {0}")]
    Capture(String),
    #[error("unsupported bits per pixel: {0}")]
    UnsupportedFormat(u8),
    #[error("failed to allocate {0} bytes for the image buffer")]
    Allocation(usize),
    #[error("pointer grab failed: {0}")]
    PointerGrab(String),
    #[error("X11 error: {0}")]
    X11(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    WholeScreen,
    FocusedWindow,
    Rectangle,
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::WholeScreen => write!(f, "whole screen"),
            CaptureMode::FocusedWindow => write!(f, "focused window"),
            CaptureMode::Rectangle => write!(f, "rectangle selection"),
        }
    }
}

/// What to capture and how. Built once from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureRequest {
    pub mode: CaptureMode,
    pub freeze: bool,
    /// Whole seconds to wait before capturing.
    pub delay: u32,
}

impl CaptureRequest {
    /// Negative delays clamp to zero.
    pub fn new(mode: CaptureMode, freeze: bool, delay: i64) -> Self {
        Self {
            mode,
            freeze,
            delay: delay.clamp(0, i64::from(u32::MAX)) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// A window's place in the tree, as answered by QueryTree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNode {
    pub root: WindowId,
    pub parent: WindowId,
}

/// Pointer events in root window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Press(Point),
    Motion(Point),
    Release(Point),
}

/// The display server handle the pipeline runs against.
///
/// Everything is `&self`: the connection is used sequentially from one
/// thread and request/reply plumbing keeps its own state.
pub trait DisplayConnection {
    /// Root window of the default screen.
    fn root(&self) -> WindowId;

    /// Pixel layout of the root visual.
    fn pixel_format(&self) -> PixelFormat;

    fn geometry(&self, window: WindowId) -> Result<Region, CaptureError>;

    fn query_tree(&self, window: WindowId) -> Result<TreeNode, CaptureError>;

    /// The window holding the input focus, if any.
    fn input_focus(&self) -> Result<Option<WindowId>, CaptureError>;

    /// Z-pixmap dump of `area`, relative to `window`.
    fn read_pixels(&self, window: WindowId, area: Region) -> Result<RawFrame, CaptureError>;

    /// Exclusive press/release/motion input on the root window.
    fn grab_pointer(&self) -> Result<(), CaptureError>;

    fn ungrab_pointer(&self) -> Result<(), CaptureError>;

    /// Suspend every other client until `ungrab_server`.
    fn grab_server(&self) -> Result<(), CaptureError>;

    fn ungrab_server(&self) -> Result<(), CaptureError>;

    /// XOR-draw a rectangle outline on the root window. Drawing the same
    /// rectangle twice restores what was underneath.
    fn draw_feedback(&self, rect: Region) -> Result<(), CaptureError>;

    fn flush(&self) -> Result<(), CaptureError>;

    /// Block until the next pointer event.
    fn next_pointer_event(&self) -> Result<PointerEvent, CaptureError>;
}

/// Run the whole capture: resolve the target, wait out the delay, read the
/// pixels and convert them to packed RGB.
///
/// A rectangle is selected before the countdown; every other mode counts
/// down first so the focus can change in the meantime.
pub fn capture<C: DisplayConnection>(
    conn: &C,
    request: &CaptureRequest,
) -> Result<RgbImage, CaptureError> {
    let drawable = if request.mode == CaptureMode::Rectangle {
        let drawable = resolve::resolve(conn, request.mode, request.freeze)?;
        countdown(request.delay);
        drawable
    } else {
        countdown(request.delay);
        resolve::resolve(conn, request.mode, request.freeze)?
    };

    let frame = frame::capture_frame(conn, &drawable)?;
    log::debug!(
        "read {}x{} at {} bpp",
        frame.width,
        frame.height,
        frame.format.bits_per_pixel
    );

    let image = convert::convert(frame)?;
    log::info!("captured {}x{}", image.width(), image.height());
    Ok(image)
}

/// Print `N... ` to stderr once a second for `seconds` seconds.
pub fn countdown(seconds: u32) {
    countdown_to(&mut std::io::stderr(), seconds, Duration::from_secs(1));
}

fn countdown_to(out: &mut impl Write, seconds: u32, tick: Duration) {
    for remaining in (1..=seconds).rev() {
        let _ = write!(out, "{remaining}... ");
        let _ = out.flush();
        std::thread::sleep(tick);
    }
    if seconds > 0 {
        let _ = writeln!(out);
    }
}
