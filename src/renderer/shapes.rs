//! Draw command capture for headless runs and tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use glam::IVec2;

use super::{Color, Surface};

/// One call made against a [`Surface`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Fill(Color),
    Cube {
        center: IVec2,
        half_size: i32,
        color: Color,
    },
    Crosshair {
        center: IVec2,
        color: Color,
    },
    Message {
        half: u8,
        row: u8,
        col: u8,
        label: String,
        value: i64,
    },
    Text {
        col: u8,
        row: u8,
        text: String,
        color: Color,
    },
}

/// Surface that records every command it receives
///
/// Clones share the same log, so a test can keep one handle while the
/// engine owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<Vec<DrawCommand>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, cmd: DrawCommand) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cmd);
    }

    /// Snapshot of everything drawn so far
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Cubes currently on screen, replaying the log (a background fill or a
    /// background-colored cube erases)
    pub fn visible_cubes(&self) -> HashMap<IVec2, Color> {
        let mut cubes = HashMap::new();
        for cmd in self.commands() {
            match cmd {
                DrawCommand::Fill(_) => cubes.clear(),
                DrawCommand::Cube { center, color, .. } if color == Color::BACKGROUND => {
                    cubes.remove(&center);
                }
                DrawCommand::Cube { center, color, .. } => {
                    cubes.insert(center, color);
                }
                _ => {}
            }
        }
        cubes
    }

    /// Latest value shown for a HUD label
    pub fn last_message(&self, label: &str) -> Option<i64> {
        self.commands().into_iter().rev().find_map(|cmd| match cmd {
            DrawCommand::Message { label: l, value, .. } if l == label => Some(value),
            _ => None,
        })
    }

    /// Whether any text command contained `needle`
    pub fn has_text(&self, needle: &str) -> bool {
        self.commands()
            .iter()
            .any(|cmd| matches!(cmd, DrawCommand::Text { text, .. } if text.contains(needle)))
    }
}

impl Surface for RecordingSurface {
    fn fill(&mut self, color: Color) {
        self.push(DrawCommand::Fill(color));
    }

    fn draw_cube(&mut self, center: IVec2, half_size: i32, color: Color) {
        self.push(DrawCommand::Cube {
            center,
            half_size,
            color,
        });
    }

    fn draw_crosshair(&mut self, center: IVec2, color: Color) {
        self.push(DrawCommand::Crosshair { center, color });
    }

    fn draw_message(&mut self, half: u8, row: u8, col: u8, label: &str, value: i64) {
        self.push(DrawCommand::Message {
            half,
            row,
            col,
            label: label.to_string(),
            value,
        });
    }

    fn draw_string(&mut self, col: u8, row: u8, text: &str, color: Color) {
        self.push(DrawCommand::Text {
            col,
            row,
            text: text.to_string(),
            color,
        });
    }
}

/// Surface that only logs (trace level), for running without a display
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSurface;

impl Surface for LogSurface {
    fn fill(&mut self, color: Color) {
        log::trace!("fill {color:?}");
    }

    fn draw_cube(&mut self, center: IVec2, half_size: i32, color: Color) {
        log::trace!("cube at {center} size {half_size} {color:?}");
    }

    fn draw_crosshair(&mut self, center: IVec2, color: Color) {
        log::trace!("crosshair at {center} {color:?}");
    }

    fn draw_message(&mut self, half: u8, row: u8, col: u8, label: &str, value: i64) {
        log::trace!("[{half}:{row}:{col}] {label} {value}");
    }

    fn draw_string(&mut self, col: u8, row: u8, text: &str, _color: Color) {
        log::debug!("[{col}:{row}] {text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderSurface;

    #[test]
    fn test_recording_tracks_visible_cubes() {
        let recorder = RecordingSurface::new();
        let surface = RenderSurface::new(recorder.clone());
        let a = IVec2::new(21, 8);
        let b = IVec2::new(38, 8);

        surface.with(|s| {
            s.draw_cube(a, 6, Color::Green);
            s.draw_cube(b, 6, Color::Blue);
        });
        surface.with(|s| s.draw_cube(a, 6, Color::BACKGROUND));

        let visible = recorder.visible_cubes();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible.get(&b), Some(&Color::Blue));

        surface.with(|s| s.fill(Color::BACKGROUND));
        assert!(recorder.visible_cubes().is_empty());
    }

    #[test]
    fn test_last_message() {
        let mut recorder = RecordingSurface::new();
        recorder.draw_message(1, 5, 0, "Life:", 3);
        recorder.draw_message(1, 5, 9, "Score:", 1);
        recorder.draw_message(1, 5, 0, "Life:", 2);
        assert_eq!(recorder.last_message("Life:"), Some(2));
        assert_eq!(recorder.last_message("Score:"), Some(1));
        assert_eq!(recorder.last_message("Level:"), None);
    }
}
