//! Platform abstraction layer
//!
//! Handles the board-facing collaborators:
//! - Time/ticks
//! - Joystick samples and button events
//! - Blocking signals between threads

pub mod input;
pub mod sync;
pub mod time;

pub use input::{Button, ButtonEvent, Debouncer, FixedStick, InputDriver, RawSample, ScriptedStick, WanderingStick};
pub use sync::Signal;
pub use time::{Clock, ManualClock, SystemClock, suspend_until};
