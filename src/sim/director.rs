//! Wave director
//!
//! Spawns a random-sized wave of targets whenever the board is empty, and
//! closes the round once life runs out. Scheduling is left to a
//! [`TargetSpawner`]: a thread per actor in the game, a plain `Vec` when a
//! test steps the actors itself.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::arena::Arena;
use super::target::TargetActor;
use crate::audio::SoundEffect;
use crate::platform::Signal;
use crate::renderer::Color;

/// Hands a freshly created actor to whatever will run it
pub trait TargetSpawner {
    fn spawn(&mut self, actor: TargetActor);
}

impl TargetSpawner for Vec<TargetActor> {
    fn spawn(&mut self, actor: TargetActor) {
        self.push(actor);
    }
}

/// Seed for a round's director: derived from the configured seed so
/// successive rounds differ, or fresh entropy
pub fn round_seed(base: Option<u64>, round: u32) -> u64 {
    match base {
        Some(seed) => seed.wrapping_add((round as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => rand::random(),
    }
}

/// What one [`Director::poll`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorStep {
    /// Started a wave of this many targets
    Spawned(usize),
    /// Targets still alive; suspend until the board clears
    Waiting,
    /// Life ran out; the summary is on screen
    RoundOver,
    /// Summary shown, restart not yet signalled
    AwaitingRestart,
    /// Restart observed, or the round was cancelled by one; the director is finished
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Over,
    Done,
}

pub struct Director {
    arena: Arc<Arena>,
    rng: Pcg32,
    restart: Arc<Signal>,
    phase: Phase,
    waves: u32,
}

impl Director {
    pub fn new(arena: Arc<Arena>, seed: u64, restart: Arc<Signal>) -> Self {
        Self {
            arena,
            rng: Pcg32::seed_from_u64(seed),
            restart,
            phase: Phase::Running,
            waves: 0,
        }
    }

    pub fn waves(&self) -> u32 {
        self.waves
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Advance the round by one decision; never blocks
    pub fn poll(&mut self, spawner: &mut dyn TargetSpawner) -> DirectorStep {
        match self.phase {
            Phase::Running => {
                // Cancelled actors still erase their cubes; let them finish
                // before the summary goes up
                if self.arena.slots.any_alive() {
                    return DirectorStep::Waiting;
                }
                if self.arena.session.is_over() {
                    if self.restart.is_raised() {
                        return self.abandon_round();
                    }
                    return self.end_round();
                }
                self.spawn_wave(spawner)
            }
            Phase::Over => {
                if self.restart.is_raised() {
                    self.phase = Phase::Done;
                    DirectorStep::Terminated
                } else {
                    DirectorStep::AwaitingRestart
                }
            }
            Phase::Done => DirectorStep::Terminated,
        }
    }

    fn spawn_wave(&mut self, spawner: &mut dyn TargetSpawner) -> DirectorStep {
        let count = self.rng.random_range(1..=self.arena.settings.max_wave);
        self.waves += 1;

        let mut spawned = 0;
        for _ in 0..count {
            let Some(slot) = self.arena.slots.claim() else {
                break;
            };
            let seed = self.rng.random();
            spawner.spawn(TargetActor::new(Arc::clone(&self.arena), slot, seed));
            spawned += 1;
        }
        log::info!("Wave {}: {} targets", self.waves, spawned);
        DirectorStep::Spawned(spawned)
    }

    /// Restart cut the round short: no summary and no leaderboard entry
    fn abandon_round(&mut self) -> DirectorStep {
        log::info!("Round abandoned at score {}", self.arena.session.score());
        self.phase = Phase::Done;
        DirectorStep::Terminated
    }

    fn end_round(&mut self) -> DirectorStep {
        let arena = &self.arena;
        let snap = arena.session.snapshot();
        arena.play(SoundEffect::GameOver);

        let rank = arena.submit_score(snap.score, snap.difficulty.level);
        let best = arena.high_score();
        arena.surface.with(|s| {
            s.fill(Color::BACKGROUND);
            s.draw_string(3, 2, "GAME OVER", Color::White);
            s.draw_message(0, 4, 0, "Score:", snap.score as i64);
            s.draw_message(0, 5, 0, "Best:", best as i64);
            s.draw_message(0, 6, 0, "Level:", snap.difficulty.level as i64);
        });

        match rank {
            Some(rank) => log::info!(
                "Round over: score {} at level {} (rank {rank})",
                snap.score,
                snap.difficulty.level
            ),
            None => log::info!(
                "Round over: score {} at level {}",
                snap.score,
                snap.difficulty.level
            ),
        }
        self.phase = Phase::Over;
        DirectorStep::RoundOver
    }
}

impl std::fmt::Debug for Director {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Director")
            .field("phase", &self.phase)
            .field("waves", &self.waves)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::target::tests::{Harness, harness, park_cursor};
    use crate::sim::target::{ActorStep, TargetState};
    use std::time::Duration;

    fn step_all(actors: &mut Vec<TargetActor>) {
        for actor in actors.iter_mut() {
            actor.step();
        }
        actors.retain(|a| !matches!(a.state(), TargetState::Terminated(_)));
    }

    /// Strike every active target by moving the crosshair onto it
    fn strike_all(h: &Harness, actors: &mut Vec<TargetActor>) -> usize {
        let mut hits = 0;
        for actor in actors.iter_mut() {
            if let Some(target) = actor.target().copied() {
                h.arena.advance_cursor(h.arena.layout.cell_center(target.cell));
                if actor.step() == ActorStep::Done(crate::sim::target::Outcome::Hit) {
                    hits += 1;
                }
            }
        }
        park_cursor(&h.arena);
        actors.retain(|a| !matches!(a.state(), TargetState::Terminated(_)));
        hits
    }

    #[test]
    fn test_spawns_wave_only_when_board_empty() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let mut director = Director::new(Arc::clone(&h.arena), 1, Arc::new(Signal::new()));
        let mut actors: Vec<TargetActor> = Vec::new();

        let DirectorStep::Spawned(n) = director.poll(&mut actors) else {
            panic!("expected a wave");
        };
        assert!((1..=5).contains(&n));
        assert_eq!(actors.len(), n);
        assert_eq!(h.arena.slots.live(), n);
        assert_eq!(h.arena.diagnostics.num_created(), n as u64);

        assert_eq!(director.poll(&mut actors), DirectorStep::Waiting);
        assert_eq!(actors.len(), n);
    }

    #[test]
    fn test_wave_size_bounded() {
        for seed in 0..64 {
            let h = harness(Settings {
                max_wave: 3,
                ..Default::default()
            });
            let mut director = Director::new(Arc::clone(&h.arena), seed, Arc::new(Signal::new()));
            let mut actors: Vec<TargetActor> = Vec::new();
            match director.poll(&mut actors) {
                DirectorStep::Spawned(n) => assert!((1..=3).contains(&n), "seed {seed}: {n}"),
                other => panic!("seed {seed}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_next_wave_after_all_hit() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let mut director = Director::new(Arc::clone(&h.arena), 2, Arc::new(Signal::new()));
        let mut actors: Vec<TargetActor> = Vec::new();

        let DirectorStep::Spawned(n) = director.poll(&mut actors) else {
            panic!("expected a wave");
        };
        for _ in 0..10_000 {
            step_all(&mut actors);
            if actors.iter().all(|a| a.target().is_some()) {
                break;
            }
        }
        assert_eq!(strike_all(&h, &mut actors), n);
        assert!(actors.is_empty());
        assert_eq!(h.arena.session.score(), n as u32);

        assert!(matches!(director.poll(&mut actors), DirectorStep::Spawned(_)));
        assert_eq!(director.waves(), 2);
    }

    #[test]
    fn test_round_ends_when_life_runs_out() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let restart = Arc::new(Signal::new());
        let mut director = Director::new(Arc::clone(&h.arena), 3, Arc::clone(&restart));
        let mut actors: Vec<TargetActor> = Vec::new();

        let mut hits = 0;
        let mut step = DirectorStep::Waiting;
        for tick in 0..10_000 {
            h.clock.advance(Duration::from_millis(100));
            step_all(&mut actors);
            // Score a few points on the first wave so the leaderboard fills
            if tick == 1 {
                hits = strike_all(&h, &mut actors);
            }
            step = director.poll(&mut actors);
            if step == DirectorStep::RoundOver {
                break;
            }
        }
        assert_eq!(step, DirectorStep::RoundOver);
        assert!(hits > 0);
        assert!(h.arena.session.is_over());
        assert!(h.arena.grid.is_clear());
        assert!(actors.is_empty());

        assert_eq!(h.sink.count(SoundEffect::GameOver), 1);
        assert!(h.screen.has_text("GAME OVER"));
        assert_eq!(h.screen.last_message("Score:"), Some(hits as i64));
        assert_eq!(h.arena.high_score(), hits as u32);
        assert_eq!(h.screen.last_message("Best:"), Some(hits as i64));

        assert_eq!(director.poll(&mut actors), DirectorStep::AwaitingRestart);
        restart.raise();
        assert_eq!(director.poll(&mut actors), DirectorStep::Terminated);
        assert!(director.is_terminated());
        assert_eq!(director.poll(&mut actors), DirectorStep::Terminated);
    }

    #[test]
    fn test_forced_game_over_waits_for_actors() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let mut director = Director::new(Arc::clone(&h.arena), 5, Arc::new(Signal::new()));
        let mut actors: Vec<TargetActor> = Vec::new();
        director.poll(&mut actors);

        h.arena.session.force_game_over();
        assert_eq!(director.poll(&mut actors), DirectorStep::Waiting);
        step_all(&mut actors);
        assert!(actors.is_empty());
        assert_eq!(director.poll(&mut actors), DirectorStep::RoundOver);
        assert!(h.arena.grid.is_clear());
    }

    #[test]
    fn test_restart_mid_round_skips_summary() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let restart = Arc::new(Signal::new());
        let mut director = Director::new(Arc::clone(&h.arena), 6, Arc::clone(&restart));
        let mut actors: Vec<TargetActor> = Vec::new();
        director.poll(&mut actors);
        h.arena.session.record_hit();

        restart.raise();
        h.arena.session.force_game_over();
        assert_eq!(director.poll(&mut actors), DirectorStep::Waiting);
        step_all(&mut actors);
        assert!(actors.is_empty());

        assert_eq!(director.poll(&mut actors), DirectorStep::Terminated);
        assert!(director.is_terminated());
        assert_eq!(h.sink.count(SoundEffect::GameOver), 0);
        assert!(!h.screen.has_text("GAME OVER"));
        assert_eq!(h.screen.last_message("Score:"), None);
        assert_eq!(h.arena.high_score(), 0);
        assert!(h.arena.highscores().entries.is_empty());
    }

    #[test]
    fn test_round_seed_varies_per_round() {
        assert_eq!(round_seed(Some(9), 0), 9);
        assert_ne!(round_seed(Some(9), 1), round_seed(Some(9), 2));
    }
}
