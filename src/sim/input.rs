//! Joystick input pipeline
//!
//! A periodic [`Sampler`] integrates raw stick readings into a clamped
//! position and pushes it onto a bounded queue; a [`CursorUpdater`] pulls
//! positions off the queue and redraws the crosshair. The queue is the
//! only channel between the two: the sampler never blocks on it, and an
//! update that does not fit is dropped and counted.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError, sync_channel};
use std::time::Duration;

use glam::IVec2;

use super::arena::Arena;
use super::cursor::{Cursor, CursorUpdate, update_position};
use crate::diagnostics::deviation_us;
pub use crate::diagnostics::JitterStats;
use crate::renderer::Color;

/// Create the bounded cursor queue
pub fn cursor_queue(capacity: usize) -> (SyncSender<CursorUpdate>, Receiver<CursorUpdate>) {
    sync_channel(capacity)
}

/// Result of one sampling period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Position pushed onto the queue
    Queued(CursorUpdate),
    /// Queue full (or consumer gone); the update was dropped
    Dropped(CursorUpdate),
    /// Run length reached; nothing was read
    Finished,
}

/// Producer half of the pipeline, run once per sampling period
pub struct Sampler {
    arena: Arc<Arena>,
    tx: SyncSender<CursorUpdate>,
    pos: IVec2,
    last_sample: Option<Duration>,
}

impl Sampler {
    pub fn new(arena: Arc<Arena>, tx: SyncSender<CursorUpdate>) -> Self {
        let pos = arena.cursor().pos;
        Self {
            arena,
            tx,
            pos,
            last_sample: None,
        }
    }

    /// Position the sampler has integrated so far
    pub fn position(&self) -> IVec2 {
        self.pos
    }

    /// Read the stick once and publish the new position; never blocks
    pub fn sample(&mut self) -> SampleOutcome {
        let arena = &self.arena;
        let diag = &arena.diagnostics;
        let settings = &arena.settings;

        if let Some(limit) = settings.max_samples {
            if diag.num_samples() >= limit {
                return SampleOutcome::Finished;
            }
        }

        let now = arena.now();
        if let Some(prev) = self.last_sample.replace(now) {
            diag.record_jitter(deviation_us(now.saturating_sub(prev), settings.sample_period()));
        }

        let raw = arena.read_input();
        self.pos = update_position(
            self.pos,
            raw,
            arena.origin(),
            settings.sensitivity_shift,
            &arena.layout,
        );
        diag.bump_update_work();
        diag.bump_samples();

        let update = CursorUpdate::from(self.pos);
        match self.tx.try_send(update) {
            Ok(()) => SampleOutcome::Queued(update),
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                let lost = diag.bump_data_lost();
                log::debug!("cursor queue full, dropped {update:?} ({lost} lost)");
                SampleOutcome::Dropped(update)
            }
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("pos", &self.pos)
            .field("last_sample", &self.last_sample)
            .finish_non_exhaustive()
    }
}

/// Result of waiting on the cursor queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Applied(Cursor),
    Empty,
    /// Every sampler handle is gone
    Closed,
}

/// Consumer half of the pipeline; the only writer of the shared cursor
pub struct CursorUpdater {
    arena: Arc<Arena>,
    rx: Receiver<CursorUpdate>,
    /// (life, score, level) last shown on the HUD
    hud: Option<(u32, u32, u32)>,
}

impl CursorUpdater {
    pub fn new(arena: Arc<Arena>, rx: Receiver<CursorUpdate>) -> Self {
        Self {
            arena,
            rx,
            hud: None,
        }
    }

    /// Block until an update arrives
    pub fn pull(&mut self) -> Pull {
        match self.rx.recv() {
            Ok(update) => Pull::Applied(self.apply(update)),
            Err(_) => Pull::Closed,
        }
    }

    pub fn pull_timeout(&mut self, timeout: Duration) -> Pull {
        match self.rx.recv_timeout(timeout) {
            Ok(update) => Pull::Applied(self.apply(update)),
            Err(RecvTimeoutError::Timeout) => Pull::Empty,
            Err(RecvTimeoutError::Disconnected) => Pull::Closed,
        }
    }

    pub fn try_pull(&mut self) -> Pull {
        match self.rx.try_recv() {
            Ok(update) => Pull::Applied(self.apply(update)),
            Err(TryRecvError::Empty) => Pull::Empty,
            Err(TryRecvError::Disconnected) => Pull::Closed,
        }
    }

    /// Move the crosshair: erase the old mark and draw the new one as a
    /// single render critical section, then refresh the HUD
    pub fn apply(&mut self, update: CursorUpdate) -> Cursor {
        let arena = &self.arena;
        let to = arena.layout.clamp(update.pos());
        let cursor = arena.surface.with(|s| {
            let cursor = arena.advance_cursor(to);
            s.draw_crosshair(cursor.prev, Color::BACKGROUND);
            s.draw_crosshair(cursor.pos, Color::CROSSHAIR);
            cursor
        });
        arena.diagnostics.bump_consumer();
        self.refresh_hud();
        cursor
    }

    /// Redraw life, score and level if any of them changed; returns whether
    /// anything was drawn
    pub fn refresh_hud(&mut self) -> bool {
        let snap = self.arena.session.snapshot();
        let shown = (snap.life, snap.score, snap.difficulty.level);
        if self.hud == Some(shown) {
            return false;
        }
        self.hud = Some(shown);
        self.arena.surface.with(|s| {
            s.draw_message(1, 0, 0, "Life:", snap.life as i64);
            s.draw_message(1, 1, 0, "Score:", snap.score as i64);
            s.draw_message(1, 2, 0, "Level:", snap.difficulty.level as i64);
        });
        self.arena.diagnostics.bump_display();
        true
    }
}

impl std::fmt::Debug for CursorUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorUpdater")
            .field("hud", &self.hud)
            .finish_non_exhaustive()
    }
}
