//! Joystick and button input
//!
//! The analog driver is an external collaborator; the sim only sees
//! [`RawSample`]s. Buttons arrive as timestamped edge events and are
//! debounced here before the session controller acts on them.

use std::collections::VecDeque;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Center reading of a 12-bit joystick axis
pub const RAW_CENTER: u16 = 2048;
/// Largest value a 12-bit axis can report
pub const RAW_MAX: u16 = 4095;

/// One reading of the two-axis joystick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawSample {
    pub x: u16,
    pub y: u16,
    /// Stick pushed in
    pub select: bool,
}

impl RawSample {
    pub fn new(x: u16, y: u16) -> Self {
        Self {
            x,
            y,
            select: false,
        }
    }

    /// Stick at rest
    pub fn centered() -> Self {
        Self::new(RAW_CENTER, RAW_CENTER)
    }
}

/// Raw analog input driver
pub trait InputDriver: Send {
    fn read(&mut self) -> RawSample;
}

/// Always reports the same reading
#[derive(Debug, Clone, Copy)]
pub struct FixedStick(pub RawSample);

impl InputDriver for FixedStick {
    fn read(&mut self) -> RawSample {
        self.0
    }
}

/// Plays back a list of readings, then repeats the last one
#[derive(Debug, Clone)]
pub struct ScriptedStick {
    samples: VecDeque<RawSample>,
    last: RawSample,
}

impl ScriptedStick {
    pub fn new(samples: impl IntoIterator<Item = RawSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            last: RawSample::centered(),
        }
    }
}

impl InputDriver for ScriptedStick {
    fn read(&mut self) -> RawSample {
        if let Some(sample) = self.samples.pop_front() {
            self.last = sample;
        }
        self.last
    }
}

/// A stick that drifts around randomly, used by the headless demo
#[derive(Debug, Clone)]
pub struct WanderingStick {
    rng: Pcg32,
    x: i32,
    y: i32,
    /// Number of reads before the first deflection, so calibration sees a centered stick
    rest_reads: u32,
}

impl WanderingStick {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            x: RAW_CENTER as i32,
            y: RAW_CENTER as i32,
            rest_reads: 1,
        }
    }
}

impl InputDriver for WanderingStick {
    fn read(&mut self) -> RawSample {
        if self.rest_reads > 0 {
            self.rest_reads -= 1;
            return RawSample::centered();
        }
        // Random walk with a pull back toward center
        let center = RAW_CENTER as i32;
        self.x += self.rng.random_range(-256..=256) - (self.x - center) / 8;
        self.y += self.rng.random_range(-256..=256) - (self.y - center) / 8;
        self.x = self.x.clamp(0, RAW_MAX as i32);
        self.y = self.y.clamp(0, RAW_MAX as i32);
        RawSample::new(self.x as u16, self.y as u16)
    }
}

/// The two push buttons on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    /// S1: start the game
    Start,
    /// S2: restart the game
    Restart,
}

/// A button edge with the time it was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub pressed_at: Duration,
}

impl ButtonEvent {
    pub fn new(button: Button, pressed_at: Duration) -> Self {
        Self { button, pressed_at }
    }
}

/// Drops presses that follow the previous accepted press too closely
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last_start: Option<Duration>,
    last_restart: Option<Duration>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: None,
            last_restart: None,
        }
    }

    /// Returns true if the event should be acted on
    pub fn accept(&mut self, event: &ButtonEvent) -> bool {
        let last = match event.button {
            Button::Start => &mut self.last_start,
            Button::Restart => &mut self.last_restart,
        };
        if let Some(prev) = *last {
            if event.pressed_at.saturating_sub(prev) < self.interval {
                log::debug!("Debounced {:?} press at {:?}", event.button, event.pressed_at);
                return false;
            }
        }
        *last = Some(event.pressed_at);
        true
    }
}
