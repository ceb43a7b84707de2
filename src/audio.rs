//! Audio cues played through the board's buzzer
//!
//! Sound effects are short tone sequences handed to a [`ToneSink`]; the
//! buzzer driver itself lives outside the engine.

use std::sync::{Arc, Mutex, PoisonError};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Crosshair struck a cube
    Hit,
    /// Cube timed out and cost a life
    Expired,
    /// Life reached zero
    GameOver,
    /// Session restarted
    Restart,
}

/// A single note: frequency in Hz and length in beats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub freq_hz: u32,
    pub beats: u32,
}

impl Tone {
    pub const fn new(freq_hz: u32, beats: u32) -> Self {
        Self { freq_hz, beats }
    }
}

const HIT_TONES: [Tone; 2] = [Tone::new(880, 1), Tone::new(1319, 1)];
const EXPIRED_TONES: [Tone; 1] = [Tone::new(220, 2)];
const GAME_OVER_TONES: [Tone; 4] = [
    Tone::new(392, 2),
    Tone::new(330, 2),
    Tone::new(262, 2),
    Tone::new(196, 4),
];
const RESTART_TONES: [Tone; 9] = [
    Tone::new(415, 3),
    Tone::new(415, 3),
    Tone::new(415, 1),
    Tone::new(311, 3),
    Tone::new(311, 3),
    Tone::new(208, 3),
    Tone::new(208, 3),
    Tone::new(233, 2),
    Tone::new(233, 3),
];

impl SoundEffect {
    /// Tone sequence for this effect
    pub fn tones(&self) -> &'static [Tone] {
        match self {
            SoundEffect::Hit => &HIT_TONES,
            SoundEffect::Expired => &EXPIRED_TONES,
            SoundEffect::GameOver => &GAME_OVER_TONES,
            SoundEffect::Restart => &RESTART_TONES,
        }
    }
}

/// Tone playback driver
pub trait ToneSink: Send + Sync {
    /// Play a sequence at the given volume (0.0 - 1.0); must not block for
    /// the length of the tune
    fn play(&self, tones: &[Tone], volume: f32);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl ToneSink for SilentSink {
    fn play(&self, _tones: &[Tone], _volume: f32) {}
}

/// Logs tunes instead of playing them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ToneSink for LogSink {
    fn play(&self, tones: &[Tone], volume: f32) {
        let freqs: Vec<u32> = tones.iter().map(|t| t.freq_hz).collect();
        log::debug!("tone {freqs:?} at volume {volume:.2}");
    }
}

/// Keeps every played sequence; clones share the history
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    played: Arc<Mutex<Vec<Vec<Tone>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<Vec<Tone>> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `effect` has been played
    pub fn count(&self, effect: SoundEffect) -> usize {
        self.played()
            .iter()
            .filter(|t| t.as_slice() == effect.tones())
            .count()
    }
}

impl ToneSink for RecordingSink {
    fn play(&self, tones: &[Tone], _volume: f32) {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tones.to_vec());
    }
}

/// Audio manager for the game
pub struct AudioManager {
    sink: Box<dyn ToneSink>,
    master_volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new(SilentSink)
    }
}

impl AudioManager {
    pub fn new(sink: impl ToneSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            master_volume: 0.8,
            muted: false,
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Get effective volume
    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    /// Play a sound effect
    pub fn play(&self, effect: SoundEffect) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        self.sink.play(effect.tones(), vol);
    }
}

impl std::fmt::Debug for AudioManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioManager")
            .field("master_volume", &self.master_volume)
            .field("muted", &self.muted)
            .finish_non_exhaustive()
    }
}
