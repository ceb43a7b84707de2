//! Session controller
//!
//! Top-level state machine driven by the two debounced buttons:
//!
//! ```text
//! WaitStart --start--> Playing --life 0--> GameOver
//!                         ^                    |
//!                         +--- WaitRestart <---+ restart (also mid-round)
//! ```
//!
//! A restart kills the running round by forcing life to zero, lets the
//! actors wind down, shows a banner, resets the shared state and starts a
//! fresh round with a new director.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::arena::Arena;
use crate::audio::SoundEffect;
use crate::platform::{Button, ButtonEvent, Debouncer, Signal};
use crate::renderer::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    WaitStart,
    Playing,
    GameOver,
    WaitRestart,
}

/// Runs the actors of one round
pub trait RoundRunner {
    /// Launch the sampler, cursor consumer and director of a new round
    fn start_round(&mut self, arena: &Arc<Arena>, restart: Arc<Signal>);

    /// Return once every actor of the current round has terminated
    ///
    /// Called after life has been forced to zero and the restart signal
    /// raised.
    fn stop_round(&mut self);

    /// Let the round's actors run for `duration`
    fn pause(&mut self, duration: Duration);
}

pub struct SessionController<R: RoundRunner> {
    arena: Arc<Arena>,
    runner: R,
    debouncer: Debouncer,
    restart: Arc<Signal>,
    phase: SessionPhase,
    rounds: u32,
}

impl<R: RoundRunner> SessionController<R> {
    pub fn new(arena: Arc<Arena>, runner: R) -> Self {
        let debouncer = Debouncer::new(arena.settings.debounce());
        arena.surface.with(|s| {
            s.fill(Color::BACKGROUND);
            s.draw_string(2, 3, "Press S1", Color::White);
        });
        Self {
            arena,
            runner,
            debouncer,
            restart: Arc::new(Signal::new()),
            phase: SessionPhase::WaitStart,
            rounds: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut R {
        &mut self.runner
    }

    /// Feed a button edge; returns whether it caused a transition
    pub fn handle(&mut self, event: ButtonEvent) -> bool {
        if !self.debouncer.accept(&event) {
            return false;
        }
        match (event.button, self.phase) {
            (Button::Start, SessionPhase::WaitStart) => {
                self.start(event);
                true
            }
            (Button::Restart, SessionPhase::Playing | SessionPhase::GameOver) => {
                self.restart(event);
                true
            }
            (button, phase) => {
                log::debug!("Ignoring {button:?} while {phase:?}");
                false
            }
        }
    }

    /// Observe the end of a round
    pub fn poll(&mut self) -> SessionPhase {
        if self.phase == SessionPhase::Playing && self.arena.session.is_over() {
            log::info!("Game over after round {}", self.rounds);
            self.phase = SessionPhase::GameOver;
        }
        self.phase
    }

    /// Stop the current round for good
    pub fn shutdown(&mut self) {
        if self.rounds == 0 {
            return;
        }
        self.restart.raise();
        self.arena.session.force_game_over();
        self.runner.stop_round();
        self.phase = SessionPhase::GameOver;
    }

    fn start(&mut self, event: ButtonEvent) {
        log::info!("Starting session");
        self.arena.surface.with(|s| s.fill(Color::BACKGROUND));
        self.record_response(event);
        self.begin_round();
    }

    fn restart(&mut self, event: ButtonEvent) {
        log::info!("Restarting (score {})", self.arena.session.score());
        self.phase = SessionPhase::WaitRestart;

        // Raised before life drops so the director abandons the round
        // instead of summarizing it
        self.restart.raise();
        self.arena.session.force_game_over();
        self.runner.pause(self.arena.settings.restart_settle());
        self.runner.stop_round();

        self.arena.surface.with(|s| {
            s.fill(Color::BACKGROUND);
            s.draw_string(3, 5, "Restarting", Color::White);
        });
        self.record_response(event);
        self.runner.pause(self.arena.settings.restart_banner());
        self.arena.surface.with(|s| s.fill(Color::BACKGROUND));

        self.arena.reset_session();
        self.arena.play(SoundEffect::Restart);
        self.begin_round();
    }

    fn begin_round(&mut self) {
        self.rounds += 1;
        self.restart.clear();
        self.runner
            .start_round(&self.arena, Arc::clone(&self.restart));
        self.phase = SessionPhase::Playing;
        log::info!("Round {} started", self.rounds);
    }

    fn record_response(&self, event: ButtonEvent) {
        let latency = self.arena.now().saturating_sub(event.pressed_at);
        self.arena
            .diagnostics
            .record_response(event.button, latency);
    }
}

impl<R: RoundRunner> std::fmt::Debug for SessionController<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase)
            .field("rounds", &self.rounds)
            .finish_non_exhaustive()
    }
}
