//! Cube Strike - a joystick reflex game engine
//!
//! Core modules:
//! - `sim`: Grid locking, target actors, director, session state machine
//! - `runtime`: Thread-backed scheduling of the sim actors
//! - `renderer`: Serialized access to the drawing surface
//! - `platform`: Clock, input driver and button abstractions
//! - `settings`: Data-driven game configuration

pub mod audio;
pub mod diagnostics;
pub mod highscores;
pub mod platform;
pub mod renderer;
pub mod runtime;
pub mod settings;
pub mod sim;

pub use highscores::HighScores;
pub use settings::{DifficultyCurve, Settings};

/// Game configuration constants
pub mod consts {
    /// Grid dimensions (cells)
    pub const GRID_ROWS: u8 = 6;
    pub const GRID_COLS: u8 = 6;
    /// Edge length of one grid cell in pixels (102 px playfield / 6)
    pub const CELL_PX: i32 = 17;
    /// Physical screen width; the playfield is centered horizontally
    pub const SCREEN_WIDTH: i32 = 128;

    /// Crosshair start position after boot and on restart
    pub const CURSOR_START: (i32, i32) = (63, 63);
    /// Raw joystick delta is shifted right by this much per sample
    pub const SENSITIVITY_SHIFT: u32 = 9;
    /// Crosshair arms extend this many pixels from its center
    pub const CROSSHAIR_HALF_SPAN: i32 = 2;

    /// Joystick sampling period (20 Hz)
    pub const SAMPLE_PERIOD_US: u64 = 50_000;
    /// Capacity of the cursor update queue
    pub const CURSOR_QUEUE_CAPACITY: usize = 16;
    /// Number of jitter histogram buckets (overflow lands in the last one)
    pub const JITTER_BUCKETS: usize = 64;

    /// Cube half size: a cube is `2 * size + 1` pixels wide
    pub const CUBE_HALF_SIZE: i32 = 6;
    /// Largest wave the director will spawn
    pub const MAX_WAVE: usize = 5;

    /// Player lives at the start of every round
    pub const INITIAL_LIFE: u32 = 3;
    /// Score interval between level ups
    pub const POINTS_PER_LEVEL: u32 = 10;

    /// Minimum interval between two accepted presses of the same button
    pub const DEBOUNCE_MS: u64 = 20;
}
