//! Shared context handed to every actor
//!
//! Holds the grid, session state, render surface and the other shared
//! resources behind an `Arc`. Nothing in the engine is a global; actors
//! reach shared state only through the arena they were built with.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use glam::IVec2;

use super::cursor::Cursor;
use super::grid::{ActorId, Grid};
use super::layout::Layout;
use super::slots::TargetSlots;
use super::state::SessionState;
use crate::audio::{AudioManager, SilentSink, SoundEffect};
use crate::diagnostics::Diagnostics;
use crate::highscores::{HighScores, unix_millis};
use crate::platform::{Clock, FixedStick, InputDriver, RawSample, SystemClock};
use crate::renderer::{LogSurface, RenderSurface, Surface};
use crate::settings::{Settings, SettingsError};

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Arena {
    pub settings: Settings,
    pub layout: Layout,
    pub grid: Grid,
    pub session: SessionState,
    pub slots: TargetSlots,
    pub surface: RenderSurface,
    pub diagnostics: Diagnostics,
    audio: AudioManager,
    clock: Arc<dyn Clock>,
    cursor: Mutex<Cursor>,
    input: Mutex<Box<dyn InputDriver>>,
    /// Joystick reading at rest, captured once at startup
    origin: RawSample,
    highscores: Mutex<HighScores>,
    next_actor: AtomicU32,
}

impl Arena {
    pub fn builder(settings: Settings) -> ArenaBuilder {
        ArenaBuilder::new(settings)
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn play(&self, effect: SoundEffect) {
        self.audio.play(effect);
    }

    pub fn cursor(&self) -> Cursor {
        *lock(&self.cursor)
    }

    /// Record the crosshair as drawn at `to`; only the cursor consumer calls this
    pub(crate) fn advance_cursor(&self, to: IVec2) -> Cursor {
        let mut cursor = lock(&self.cursor);
        cursor.advance(to);
        *cursor
    }

    pub fn origin(&self) -> RawSample {
        self.origin
    }

    pub fn read_input(&self) -> RawSample {
        lock(&self.input).read()
    }

    pub fn next_actor_id(&self) -> ActorId {
        ActorId(self.next_actor.fetch_add(1, Ordering::Relaxed))
    }

    pub fn high_score(&self) -> u32 {
        lock(&self.highscores).top_score()
    }

    pub fn highscores(&self) -> HighScores {
        lock(&self.highscores).clone()
    }

    /// Enter a finished round on the leaderboard; returns the rank if it placed
    pub fn submit_score(&self, score: u32, level: u32) -> Option<usize> {
        let mut scores = lock(&self.highscores);
        let rank = scores.add_score(score, level, unix_millis())?;
        if let Some(path) = &self.settings.highscores_path {
            if let Err(e) = scores.save(path) {
                log::warn!("{e}");
            }
        }
        Some(rank)
    }

    /// Start-of-round state: session counters, cursor, per-round diagnostics
    ///
    /// Every actor of the previous round must have terminated.
    pub fn reset_session(&self) {
        let stale = self.grid.occupied_cells();
        assert!(stale.is_empty(), "reset with cells still held: {stale:?}");
        assert!(!self.slots.any_alive(), "reset with live targets");

        self.session.reset();
        let start = IVec2::from(self.settings.cursor_start);
        *lock(&self.cursor) = Cursor::new(start);
        self.diagnostics.reset_round();
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("layout", &self.layout)
            .field("session", &self.session.snapshot())
            .field("occupied", &self.grid.occupied())
            .finish_non_exhaustive()
    }
}

/// Assembles an [`Arena`] from its collaborators
pub struct ArenaBuilder {
    settings: Settings,
    surface: Option<Box<dyn Surface>>,
    input: Option<Box<dyn InputDriver>>,
    audio: Option<AudioManager>,
    clock: Option<Arc<dyn Clock>>,
}

impl ArenaBuilder {
    fn new(settings: Settings) -> Self {
        Self {
            settings,
            surface: None,
            input: None,
            audio: None,
            clock: None,
        }
    }

    pub fn surface(mut self, surface: impl Surface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    pub fn input(mut self, input: impl InputDriver + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    pub fn audio(mut self, audio: AudioManager) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Arena, SettingsError> {
        let settings = self.settings;
        settings.validate()?;

        let mut input = self
            .input
            .unwrap_or_else(|| Box::new(FixedStick(RawSample::centered())));
        // The stick is assumed untouched at power-up
        let origin = input.read();

        let mut audio = self.audio.unwrap_or_else(|| AudioManager::new(SilentSink));
        audio.set_master_volume(settings.master_volume);
        audio.set_muted(settings.muted);

        let highscores = settings
            .highscores_path
            .as_deref()
            .map(load_highscores)
            .unwrap_or_default();

        let surface = match self.surface {
            Some(surface) => RenderSurface::from_boxed(surface),
            None => RenderSurface::new(LogSurface),
        };

        Ok(Arena {
            layout: Layout::from_settings(&settings),
            grid: Grid::new(settings.grid_rows, settings.grid_cols),
            session: SessionState::new(&settings),
            slots: TargetSlots::new(settings.max_wave),
            surface,
            diagnostics: Diagnostics::new(),
            audio,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            cursor: Mutex::new(Cursor::new(IVec2::from(settings.cursor_start))),
            input: Mutex::new(input),
            origin,
            highscores: Mutex::new(highscores),
            next_actor: AtomicU32::new(1),
            settings,
        })
    }
}

fn load_highscores(path: &Path) -> HighScores {
    HighScores::load(path).unwrap_or_else(|e| {
        log::warn!("{e}; starting with an empty leaderboard");
        HighScores::new()
    })
}
