//! Rendering surface
//!
//! The drawing primitives belong to the display driver. The engine only
//! needs the [`Surface`] contract and one shared [`RenderSurface`] that
//! serializes every draw across actors.

pub mod shapes;

use std::sync::{Mutex, PoisonError};

use glam::IVec2;
use serde::{Deserialize, Serialize};

pub use shapes::{DrawCommand, LogSurface, RecordingSurface};

/// Display palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Black,
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
}

impl Color {
    /// Background; drawing in this color erases
    pub const BACKGROUND: Color = Color::Black;
    /// Live crosshair
    pub const CROSSHAIR: Color = Color::Red;
    /// Colors a cube may be given
    pub const CUBE_PALETTE: [Color; 5] = [
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Cyan,
        Color::Magenta,
    ];
}

/// Drawing primitives of the display
pub trait Surface: Send {
    /// Fill the whole screen
    fn fill(&mut self, color: Color);
    /// Filled square centered at `center`, `2 * half_size + 1` pixels wide
    fn draw_cube(&mut self, center: IVec2, half_size: i32, color: Color);
    fn draw_crosshair(&mut self, center: IVec2, color: Color);
    /// Labeled number at a text row/column on one of the two screen halves
    fn draw_message(&mut self, half: u8, row: u8, col: u8, label: &str, value: i64);
    fn draw_string(&mut self, col: u8, row: u8, text: &str, color: Color);
}

/// The render-serialization token
///
/// At most one thread draws at a time. Erase/redraw pairs go in a single
/// [`RenderSurface::with`] call so no other drawer can interleave.
pub struct RenderSurface {
    inner: Mutex<Box<dyn Surface>>,
}

impl RenderSurface {
    pub fn new(surface: impl Surface + 'static) -> Self {
        Self::from_boxed(Box::new(surface))
    }

    pub fn from_boxed(surface: Box<dyn Surface>) -> Self {
        Self {
            inner: Mutex::new(surface),
        }
    }

    /// Run `f` with exclusive access to the surface
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Surface) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(guard.as_mut())
    }
}

impl std::fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSurface").finish_non_exhaustive()
    }
}
