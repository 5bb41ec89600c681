//! In-memory display server for unit tests.

use super::{
    ByteOrder, CaptureError, DisplayConnection, NO_WINDOW, PixelFormat, PointerEvent, RawFrame,
    Region, TreeNode, WindowId,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// Requests that change server state, in the order they were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    GrabPointer,
    UngrabPointer,
    GrabServer,
    UngrabServer,
    Draw(Region),
    Flush,
}

pub(crate) struct FakeConnection {
    pub root: WindowId,
    focus: Option<WindowId>,
    parents: HashMap<WindowId, WindowId>,
    geometries: HashMap<WindowId, Region>,
    /// 0x00RRGGBB value every read returns.
    fill: u32,
    grab_fails: bool,
    events: RefCell<VecDeque<PointerEvent>>,
    calls: RefCell<Vec<Call>>,
    reads: RefCell<Vec<(WindowId, Region)>>,
}

impl FakeConnection {
    /// A 64x48 screen with root window 1 and nothing else.
    pub fn new() -> Self {
        let root = 1;
        Self {
            root,
            focus: None,
            parents: HashMap::new(),
            geometries: HashMap::from([(root, Region::new(0, 0, 64, 48))]),
            fill: 0,
            grab_fails: false,
            events: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
            reads: RefCell::new(Vec::new()),
        }
    }

    pub fn with_window(mut self, id: WindowId, parent: WindowId, geometry: Region) -> Self {
        self.parents.insert(id, parent);
        self.geometries.insert(id, geometry);
        self
    }

    pub fn with_focus(mut self, id: WindowId) -> Self {
        self.focus = Some(id);
        self
    }

    pub fn with_fill(mut self, rgb: u32) -> Self {
        self.fill = rgb;
        self
    }

    pub fn with_events(self, events: impl IntoIterator<Item = PointerEvent>) -> Self {
        self.events.borrow_mut().extend(events);
        self
    }

    pub fn with_failing_grab(mut self) -> Self {
        self.grab_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn draws(&self) -> Vec<Region> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Draw(rect) => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn reads(&self) -> Vec<(WindowId, Region)> {
        self.reads.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl DisplayConnection for FakeConnection {
    fn root(&self) -> WindowId {
        self.root
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat {
            bits_per_pixel: 32,
            red_mask: 0xff0000,
            green_mask: 0x00ff00,
            blue_mask: 0x0000ff,
            byte_order: ByteOrder::LsbFirst,
        }
    }

    fn geometry(&self, window: WindowId) -> Result<Region, CaptureError> {
        self.geometries
            .get(&window)
            .copied()
            .ok_or_else(|| CaptureError::WindowQuery(format!("BadWindow {window:#x}")))
    }

    fn query_tree(&self, window: WindowId) -> Result<TreeNode, CaptureError> {
        if window == self.root {
            return Ok(TreeNode {
                root: self.root,
                parent: NO_WINDOW,
            });
        }
        self.parents
            .get(&window)
            .map(|&parent| TreeNode {
                root: self.root,
                parent,
            })
            .ok_or_else(|| CaptureError::WindowQuery(format!("BadWindow {window:#x}")))
    }

    fn input_focus(&self) -> Result<Option<WindowId>, CaptureError> {
        Ok(self.focus)
    }

    fn read_pixels(&self, window: WindowId, area: Region) -> Result<RawFrame, CaptureError> {
        self.reads.borrow_mut().push((window, area));
        let pixels = area.width as usize * area.height as usize;
        Ok(RawFrame {
            width: area.width,
            height: area.height,
            stride: area.width as usize * 4,
            format: self.pixel_format(),
            data: self.fill.to_le_bytes().repeat(pixels),
        })
    }

    fn grab_pointer(&self) -> Result<(), CaptureError> {
        self.record(Call::GrabPointer);
        if self.grab_fails {
            return Err(CaptureError::PointerGrab("AlreadyGrabbed".to_string()));
        }
        Ok(())
    }

    fn ungrab_pointer(&self) -> Result<(), CaptureError> {
        self.record(Call::UngrabPointer);
        Ok(())
    }

    fn grab_server(&self) -> Result<(), CaptureError> {
        self.record(Call::GrabServer);
        Ok(())
    }

    fn ungrab_server(&self) -> Result<(), CaptureError> {
        self.record(Call::UngrabServer);
        Ok(())
    }

    fn draw_feedback(&self, rect: Region) -> Result<(), CaptureError> {
        self.record(Call::Draw(rect));
        Ok(())
    }

    fn flush(&self) -> Result<(), CaptureError> {
        self.record(Call::Flush);
        Ok(())
    }

    fn next_pointer_event(&self) -> Result<PointerEvent, CaptureError> {
        self.events
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CaptureError::X11("connection closed".to_string()))
    }
}
