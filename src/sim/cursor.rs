//! Crosshair position

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::layout::Layout;
use crate::platform::RawSample;

/// Record carried on the cursor queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorUpdate {
    pub x: i32,
    pub y: i32,
}

impl CursorUpdate {
    pub fn pos(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }
}

impl From<IVec2> for CursorUpdate {
    fn from(p: IVec2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// Current and previously drawn crosshair position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub pos: IVec2,
    /// Where the crosshair was last drawn, to be erased on the next update
    pub prev: IVec2,
}

impl Cursor {
    pub fn new(start: IVec2) -> Self {
        Self {
            pos: start,
            prev: start,
        }
    }

    /// Move to a new position, remembering the old one
    pub fn advance(&mut self, to: IVec2) {
        self.prev = self.pos;
        self.pos = to;
    }
}

/// Signed axis movement: the distance from the rest reading, shifted down
/// so small deflections do nothing
fn axis_step(raw: u16, origin: u16, shift: u32) -> i32 {
    if raw > origin {
        ((raw - origin) >> shift) as i32
    } else {
        -(((origin - raw) >> shift) as i32)
    }
}

/// Integrate one joystick reading into a cursor position
///
/// Pushing right grows x; pushing up (raw y below rest) grows y. The result
/// is clamped to the playfield.
pub fn update_position(
    pos: IVec2,
    raw: RawSample,
    origin: RawSample,
    shift: u32,
    layout: &Layout,
) -> IVec2 {
    let dx = axis_step(raw.x, origin.x, shift);
    let dy = -axis_step(raw.y, origin.y, shift);
    layout.clamp(pos + IVec2::new(dx, dy))
}
