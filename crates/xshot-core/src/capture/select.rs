//! Interactive rectangle selection.
//!
//! The user presses a button, drags, and releases. While dragging, an XOR
//! outline follows the pointer: each motion erases the previous outline by
//! drawing it again, then draws the new one. There is no cancel gesture.

use super::{CaptureError, DisplayConnection, Point, PointerEvent, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    /// Waiting for the button press.
    Idle,
    /// Button is down, nothing drawn yet.
    Anchored { anchor: Point },
    /// `drawn` is the outline currently on screen.
    Dragging {
        anchor: Point,
        pointer: Point,
        drawn: Region,
    },
    Done(Region),
}

impl SelectionState {
    /// Apply one pointer event, drawing feedback as a side effect.
    pub fn advance<C: DisplayConnection>(
        self,
        conn: &C,
        event: PointerEvent,
    ) -> Result<Self, CaptureError> {
        use SelectionState::*;

        let next = match (self, event) {
            (Idle, PointerEvent::Press(anchor)) => Anchored { anchor },
            (Anchored { anchor }, PointerEvent::Motion(pointer)) => {
                let drawn = feedback_rect(anchor, pointer);
                conn.draw_feedback(drawn)?;
                conn.flush()?;
                Dragging {
                    anchor,
                    pointer,
                    drawn,
                }
            }
            (
                Dragging {
                    anchor,
                    drawn: previous,
                    ..
                },
                PointerEvent::Motion(pointer),
            ) => {
                conn.draw_feedback(previous)?;
                let drawn = feedback_rect(anchor, pointer);
                conn.draw_feedback(drawn)?;
                conn.flush()?;
                Dragging {
                    anchor,
                    pointer,
                    drawn,
                }
            }
            (Anchored { anchor }, PointerEvent::Release(release)) => {
                Done(selection_rect(anchor, release))
            }
            (Dragging { anchor, drawn, .. }, PointerEvent::Release(release)) => {
                conn.draw_feedback(drawn)?;
                Done(selection_rect(anchor, release))
            }
            (state, _) => state,
        };
        Ok(next)
    }
}

/// Flip a possibly negative extent so the origin is the minimum corner.
fn normalize(origin: i32, extent: i32) -> (i32, u32) {
    if extent < 0 {
        (origin + extent, extent.unsigned_abs())
    } else {
        (origin, extent.unsigned_abs())
    }
}

/// Outline drawn while dragging. It sits one pixel outside the selected
/// area on every side.
pub fn feedback_rect(anchor: Point, pointer: Point) -> Region {
    let (x, width) = normalize(anchor.x - 1, pointer.x - anchor.x + 2);
    let (y, height) = normalize(anchor.y - 1, pointer.y - anchor.y + 2);
    Region::new(x, y, width, height)
}

/// The committed selection between press and release.
pub fn selection_rect(anchor: Point, release: Point) -> Region {
    let (x, width) = normalize(anchor.x, release.x - anchor.x);
    let (y, height) = normalize(anchor.y, release.y - anchor.y);
    Region::new(x, y, width, height)
}

/// Held pointer grab; released when dropped.
struct PointerGrab<'a, C: DisplayConnection> {
    conn: &'a C,
}

impl<'a, C: DisplayConnection> PointerGrab<'a, C> {
    fn acquire(conn: &'a C) -> Result<Self, CaptureError> {
        conn.grab_pointer()?;
        Ok(Self { conn })
    }
}

impl<C: DisplayConnection> Drop for PointerGrab<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.ungrab_pointer().and_then(|()| self.conn.flush()) {
            log::warn!("failed to release pointer grab: {e}");
        }
    }
}

/// Held server grab; other clients resume when dropped.
struct ServerFreeze<'a, C: DisplayConnection> {
    conn: &'a C,
}

impl<'a, C: DisplayConnection> ServerFreeze<'a, C> {
    fn acquire(conn: &'a C) -> Result<Self, CaptureError> {
        conn.grab_server()?;
        Ok(Self { conn })
    }
}

impl<C: DisplayConnection> Drop for ServerFreeze<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.ungrab_server().and_then(|()| self.conn.flush()) {
            log::warn!("failed to release server grab: {e}");
        }
    }
}

/// Let the user drag out a rectangle and return it in root coordinates.
///
/// With `freeze`, the server is grabbed from the press until the function
/// returns. Both grabs are released on every return path.
pub fn select_region<C: DisplayConnection>(
    conn: &C,
    freeze: bool,
) -> Result<Region, CaptureError> {
    let grab = PointerGrab::acquire(conn)?;
    let mut frozen = None;
    let mut state = SelectionState::Idle;

    let region = loop {
        let event = conn.next_pointer_event()?;
        if freeze && state == SelectionState::Idle && matches!(event, PointerEvent::Press(_)) {
            frozen = Some(ServerFreeze::acquire(conn)?);
        }
        state = state.advance(conn, event)?;
        if let SelectionState::Done(region) = state {
            break region;
        }
    };

    drop(frozen);
    drop(grab);
    log::debug!("selected {region}");
    Ok(region)
}
