use super::{CaptureError, CaptureMode, DisplayConnection, NO_WINDOW, Region, WindowId, select};
use std::fmt;

/// Hops allowed when climbing from a window to its top-level ancestor.
const MAX_TREE_DEPTH: usize = 1024;

/// What the frame capturer reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drawable {
    /// A real window, with the geometry it had when it was resolved.
    Window { id: WindowId, geometry: Region },
    /// A user-selected area with no backing window, in root coordinates.
    RootRegion(Region),
}

impl Drawable {
    pub fn geometry(&self) -> Region {
        match *self {
            Drawable::Window { geometry, .. } => geometry,
            Drawable::RootRegion(region) => region,
        }
    }
}

impl fmt::Display for Drawable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Drawable::Window { id, geometry } => write!(f, "window {id:#x} ({geometry})"),
            Drawable::RootRegion(region) => write!(f, "root region {region}"),
        }
    }
}

pub fn resolve<C: DisplayConnection>(
    conn: &C,
    mode: CaptureMode,
    freeze: bool,
) -> Result<Drawable, CaptureError> {
    let drawable = match mode {
        CaptureMode::WholeScreen => {
            let root = conn.root();
            Drawable::Window {
                id: root,
                geometry: conn.geometry(root)?,
            }
        }
        CaptureMode::FocusedWindow => {
            let focused = conn.input_focus()?.ok_or(CaptureError::NoFocus)?;
            let toplevel = toplevel_ancestor(conn, focused)?;
            Drawable::Window {
                id: toplevel,
                geometry: conn.geometry(toplevel)?,
            }
        }
        CaptureMode::Rectangle => Drawable::RootRegion(select::select_region(conn, freeze)?),
    };
    log::debug!("resolved {mode} to {drawable}");
    Ok(drawable)
}

/// Climb parent links until reaching the window whose parent is the root.
/// The root itself resolves to itself.
pub fn toplevel_ancestor<C: DisplayConnection>(
    conn: &C,
    window: WindowId,
) -> Result<WindowId, CaptureError> {
    let mut current = window;
    for _ in 0..MAX_TREE_DEPTH {
        let node = conn.query_tree(current)?;
        if current == node.root || node.parent == node.root {
            return Ok(current);
        }
        if node.parent == NO_WINDOW {
            return Err(CaptureError::WindowQuery(format!(
                "window {current:#x} has no parent"
            )));
        }
        current = node.parent;
    }
    Err(CaptureError::WindowQuery(format!(
        "window {window:#x} is nested deeper than {MAX_TREE_DEPTH} levels"
    )))
}
