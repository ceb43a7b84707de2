//! Target actor
//!
//! One actor per live cube. An actor first seeks a free cell, then stays
//! active until the crosshair strikes it, it expires, or the round is
//! cancelled by life reaching zero:
//!
//! ```text
//! Seeking -> Active -> { Hit | Expired | Cancelled } -> Terminated
//! ```
//!
//! [`TargetActor::step`] performs one scheduling opportunity's worth of
//! work and never blocks, so the same state machine runs on its own
//! thread in the game and under a manual clock in tests.

use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::grid::{ActorId, CellPos};
use crate::audio::SoundEffect;
use crate::renderer::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Heading of a moving target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    /// Decode the packed form: bit 0 picks the axis (0 horizontal,
    /// 1 vertical), bit 1 the sign (0 toward larger indices)
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Direction::Right,
            0b01 => Direction::Down,
            0b10 => Direction::Left,
            _ => Direction::Up,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::Right | Direction::Left => Axis::Horizontal,
            Direction::Down | Direction::Up => Axis::Vertical,
        }
    }

    pub fn sign(self) -> i32 {
        match self {
            Direction::Right | Direction::Down => 1,
            Direction::Left | Direction::Up => -1,
        }
    }

    /// Offset as (rows, cols)
    pub fn delta(self) -> (i32, i32) {
        match self.axis() {
            Axis::Horizontal => (0, self.sign()),
            Axis::Vertical => (self.sign(), 0),
        }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::from_bits(rng.random_range(0..4))
    }
}

/// A cube on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub cell: CellPos,
    pub direction: Direction,
    pub spawned_at: Duration,
    pub last_move: Duration,
    pub half_size: i32,
    pub color: Color,
}

/// How an actor ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Struck by the crosshair: +1 score
    Hit,
    /// Outlived the expiration timeout: -1 life
    Expired,
    /// Round ended underneath it: no effect
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Seeking,
    Active(Target),
    Terminated(Outcome),
}

/// What the scheduler should do after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorStep {
    /// Made progress or lost a race; step again right away
    Continue,
    /// Waiting on the move timer; yield before stepping again
    Idle,
    /// Terminated; the actor holds nothing
    Done(Outcome),
}

pub struct TargetActor {
    id: ActorId,
    slot: usize,
    arena: Arc<Arena>,
    rng: Pcg32,
    color: Color,
    state: TargetState,
}

impl TargetActor {
    /// Create an actor for a slot the caller has already claimed
    pub fn new(arena: Arc<Arena>, slot: usize, seed: u64) -> Self {
        debug_assert!(arena.slots.is_alive(slot), "slot {slot} not claimed");
        let id = arena.next_actor_id();
        arena.diagnostics.bump_created();
        let mut rng = Pcg32::seed_from_u64(seed);
        let color = Color::CUBE_PALETTE[rng.random_range(0..Color::CUBE_PALETTE.len())];
        Self {
            id,
            slot,
            arena,
            rng,
            color,
            state: TargetState::Seeking,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    pub fn target(&self) -> Option<&Target> {
        match &self.state {
            TargetState::Active(target) => Some(target),
            _ => None,
        }
    }

    /// Run one scheduling opportunity
    pub fn step(&mut self) -> ActorStep {
        match self.state {
            TargetState::Seeking => self.seek(),
            TargetState::Active(target) => self.act(target),
            TargetState::Terminated(outcome) => ActorStep::Done(outcome),
        }
    }

    /// Try one random cell
    fn seek(&mut self) -> ActorStep {
        let arena = Arc::clone(&self.arena);
        if arena.session.is_over() {
            return self.finish(None, Outcome::Cancelled);
        }

        let cell = CellPos::new(
            self.rng.random_range(0..arena.grid.rows()),
            self.rng.random_range(0..arena.grid.cols()),
        );
        if !arena.grid.try_acquire(cell, self.id) {
            return ActorStep::Continue;
        }

        let now = arena.now();
        let target = Target {
            cell,
            direction: Direction::random(&mut self.rng),
            spawned_at: now,
            last_move: now,
            half_size: arena.layout.cube_half_size,
            color: self.color,
        };
        let center = arena.layout.cell_center(cell);
        arena
            .surface
            .with(|s| s.draw_cube(center, target.half_size, target.color));
        log::debug!("target {} active at {:?}", self.id.0, cell);
        self.state = TargetState::Active(target);
        ActorStep::Continue
    }

    fn act(&mut self, mut target: Target) -> ActorStep {
        let arena = Arc::clone(&self.arena);
        if arena.session.is_over() {
            return self.finish(Some(target), Outcome::Cancelled);
        }
        if arena.layout.is_struck(target.cell, arena.cursor().pos) {
            return self.finish(Some(target), Outcome::Hit);
        }

        let now = arena.now();
        let difficulty = arena.session.difficulty();
        if now.saturating_sub(target.spawned_at) > difficulty.expire_timeout() {
            return self.finish(Some(target), Outcome::Expired);
        }
        if now.saturating_sub(target.last_move) < difficulty.move_interval() {
            return ActorStep::Idle;
        }

        let (d_row, d_col) = target.direction.delta();
        let next = target
            .cell
            .offset(d_row, d_col)
            .filter(|c| arena.grid.contains(*c));
        match next {
            Some(next) if arena.grid.try_acquire(next, self.id) => {
                let from = arena.layout.cell_center(target.cell);
                let to = arena.layout.cell_center(next);
                arena.surface.with(|s| {
                    s.draw_cube(from, target.half_size, Color::BACKGROUND);
                    s.draw_cube(to, target.half_size, target.color);
                });
                // Released only after the erase so a newcomer never gets wiped
                arena.grid.release(target.cell, self.id);
                target.cell = next;
                target.last_move = now;
            }
            // Wall or occupied: turn and try again without waiting
            _ => target.direction = Direction::random(&mut self.rng),
        }
        self.state = TargetState::Active(target);
        ActorStep::Continue
    }

    /// Erase, settle the score, and give back the cell and slot
    fn finish(&mut self, target: Option<Target>, mut outcome: Outcome) -> ActorStep {
        let arena = Arc::clone(&self.arena);
        if let Some(target) = target {
            let center = arena.layout.cell_center(target.cell);
            arena
                .surface
                .with(|s| s.draw_cube(center, target.half_size, Color::BACKGROUND));

            match outcome {
                Outcome::Hit => match arena.session.record_hit() {
                    Some(hit) => {
                        arena.play(SoundEffect::Hit);
                        if let Some(d) = hit.level_up {
                            log::info!(
                                "Level {} (expire {} ms, move {} ms)",
                                d.level,
                                d.expire_ms,
                                d.move_ms
                            );
                        }
                    }
                    // Life ran out between the round check and the strike
                    None => outcome = Outcome::Cancelled,
                },
                Outcome::Expired => {
                    arena.play(SoundEffect::Expired);
                    let life = arena.session.lose_life();
                    log::debug!("target {} expired, {} lives left", self.id.0, life);
                }
                Outcome::Cancelled => {}
            }
            arena.grid.release(target.cell, self.id);
        }

        log::debug!("target {} terminated: {:?}", self.id.0, outcome);
        arena.slots.release(self.slot);
        self.state = TargetState::Terminated(outcome);
        ActorStep::Done(outcome)
    }
}

/// An actor dropped before terminating (its thread failed to start, or its
/// scheduler went away) gives back what it holds without scoring
impl Drop for TargetActor {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        match self.state {
            TargetState::Seeking => {
                self.finish(None, Outcome::Cancelled);
            }
            TargetState::Active(target) => {
                self.finish(Some(target), Outcome::Cancelled);
            }
            TargetState::Terminated(_) => {}
        }
    }
}

impl std::fmt::Debug for TargetActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetActor")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::{AudioManager, RecordingSink};
    use crate::platform::ManualClock;
    use crate::renderer::RecordingSurface;
    use crate::settings::Settings;
    use glam::IVec2;

    pub(crate) const BLOCKER: ActorId = ActorId(u32::MAX);

    pub(crate) struct Harness {
        pub arena: Arc<Arena>,
        pub clock: Arc<ManualClock>,
        pub screen: RecordingSurface,
        pub sink: RecordingSink,
    }

    pub(crate) fn harness(settings: Settings) -> Harness {
        let clock = Arc::new(ManualClock::new());
        let screen = RecordingSurface::new();
        let sink = RecordingSink::new();
        let arena = Arena::builder(settings)
            .surface(screen.clone())
            .audio(AudioManager::new(sink.clone()))
            .clock(clock.clone())
            .build()
            .unwrap();
        Harness {
            arena: Arc::new(arena),
            clock,
            screen,
            sink,
        }
    }

    /// Move the crosshair off the playfield so it strikes nothing
    pub(crate) fn park_cursor(arena: &Arena) {
        arena.advance_cursor(IVec2::new(-100, -100));
    }

    /// Hold every free cell except `keep`
    pub(crate) fn block_all_but(arena: &Arena, keep: &[CellPos]) {
        for row in 0..arena.grid.rows() {
            for col in 0..arena.grid.cols() {
                let cell = CellPos::new(row, col);
                if !keep.contains(&cell) && arena.grid.holder(cell).is_none() {
                    assert!(arena.grid.try_acquire(cell, BLOCKER));
                }
            }
        }
    }

    pub(crate) fn unblock(arena: &Arena) {
        for (cell, holder) in arena.grid.occupied_cells() {
            if holder == BLOCKER {
                arena.grid.release(cell, BLOCKER);
            }
        }
    }

    /// An actor parked on `cell` with nothing else on the board
    pub(crate) fn spawn_at(arena: &Arc<Arena>, cell: CellPos, seed: u64) -> TargetActor {
        block_all_but(arena, &[cell]);
        let slot = arena.slots.claim().unwrap();
        let mut actor = TargetActor::new(Arc::clone(arena), slot, seed);
        for _ in 0..10_000 {
            actor.step();
            if actor.target().is_some() {
                break;
            }
        }
        unblock(arena);
        assert_eq!(actor.target().map(|t| t.cell), Some(cell));
        actor
    }

    #[test]
    fn test_direction_decoding() {
        assert_eq!(Direction::from_bits(0b00).delta(), (0, 1));
        assert_eq!(Direction::from_bits(0b01).delta(), (1, 0));
        assert_eq!(Direction::from_bits(0b10).delta(), (0, -1));
        assert_eq!(Direction::from_bits(0b11).delta(), (-1, 0));
        for d in Direction::ALL {
            assert_eq!(d.sign().abs(), 1);
        }
        assert_eq!(Direction::Up.axis(), Axis::Vertical);
        assert_eq!(Direction::Left.axis(), Axis::Horizontal);
    }

    #[test]
    fn test_seek_claims_cell_and_draws() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let actor = spawn_at(&h.arena, CellPos::new(1, 4), 7);
        let target = *actor.target().unwrap();
        assert_eq!(h.arena.grid.holder(target.cell), Some(actor.id()));
        assert_eq!(h.arena.grid.occupied(), 1);
        let center = h.arena.layout.cell_center(target.cell);
        assert_eq!(h.screen.visible_cubes().get(&center), Some(&target.color));
    }

    #[test]
    fn test_unhit_target_expires_after_timeout() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        // Box the target in so it cannot wander
        let cell = CellPos::new(2, 2);
        let mut actor = spawn_at(&h.arena, cell, 11);
        block_all_but(&h.arena, &[cell]);

        h.clock.advance(Duration::from_millis(5000));
        for _ in 0..50 {
            assert_ne!(actor.step(), ActorStep::Done(Outcome::Expired));
        }
        h.clock.advance(Duration::from_millis(1));
        assert_eq!(actor.step(), ActorStep::Done(Outcome::Expired));

        assert_eq!(h.arena.session.life(), 2);
        assert_eq!(h.arena.session.score(), 0);
        assert_eq!(h.arena.grid.holder(cell), None);
        assert!(!h.arena.slots.any_alive());
        assert_eq!(h.sink.count(SoundEffect::Expired), 1);
        unblock(&h.arena);
        assert!(h.arena.grid.is_clear());
    }

    #[test]
    fn test_crosshair_hit_scores_and_erases() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let cell = CellPos::new(0, 0);
        let mut actor = spawn_at(&h.arena, cell, 3);

        h.arena.advance_cursor(h.arena.layout.cell_center(cell));
        assert_eq!(actor.step(), ActorStep::Done(Outcome::Hit));
        assert_eq!(actor.state(), TargetState::Terminated(Outcome::Hit));

        assert_eq!(h.arena.session.score(), 1);
        assert_eq!(h.arena.session.life(), 3);
        assert!(h.arena.grid.is_clear());
        assert!(h.screen.visible_cubes().is_empty());
        assert_eq!(h.sink.count(SoundEffect::Hit), 1);
        // Further steps are inert
        assert_eq!(actor.step(), ActorStep::Done(Outcome::Hit));
        assert_eq!(h.arena.session.score(), 1);
    }

    #[test]
    fn test_hit_wins_over_expiry() {
        let h = harness(Settings::default());
        let cell = CellPos::new(3, 3);
        park_cursor(&h.arena);
        let mut actor = spawn_at(&h.arena, cell, 5);
        h.clock.advance(Duration::from_secs(60));
        h.arena.advance_cursor(h.arena.layout.cell_center(cell));
        assert_eq!(actor.step(), ActorStep::Done(Outcome::Hit));
        assert_eq!(h.arena.session.life(), 3);
    }

    #[test]
    fn test_waits_for_move_interval() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let mut actor = spawn_at(&h.arena, CellPos::new(2, 2), 9);
        h.clock.advance(Duration::from_millis(999));
        assert_eq!(actor.step(), ActorStep::Idle);
        assert_eq!(actor.target().unwrap().cell, CellPos::new(2, 2));
    }

    #[test]
    fn test_moves_one_cell_after_interval() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let start = CellPos::new(2, 2);
        let mut actor = spawn_at(&h.arena, start, 21);
        h.screen.clear();

        h.clock.advance(Duration::from_millis(1000));
        let mut moved = None;
        for _ in 0..100 {
            assert_eq!(actor.step(), ActorStep::Continue);
            let cell = actor.target().unwrap().cell;
            if cell != start {
                moved = Some(cell);
                break;
            }
        }
        let moved = moved.expect("target never moved");
        let dist = (moved.row as i32 - start.row as i32).abs() + (moved.col as i32 - start.col as i32).abs();
        assert_eq!(dist, 1);
        assert_eq!(h.arena.grid.holder(start), None);
        assert_eq!(h.arena.grid.holder(moved), Some(actor.id()));
        assert_eq!(h.arena.grid.occupied(), 1);
        // Move timer restarted
        assert_eq!(actor.step(), ActorStep::Idle);
        assert_eq!(actor.target().unwrap().last_move, Duration::from_millis(1000));
    }

    #[test]
    fn test_blocked_target_turns_instead_of_moving() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let cell = CellPos::new(4, 1);
        let mut actor = spawn_at(&h.arena, cell, 13);
        block_all_but(&h.arena, &[cell]);
        h.clock.advance(Duration::from_millis(1500));
        for _ in 0..20 {
            assert_eq!(actor.step(), ActorStep::Continue);
            assert_eq!(actor.target().unwrap().cell, cell);
        }
        unblock(&h.arena);
    }

    #[test]
    fn test_forced_game_over_cancels_all_actors() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let mut actors: Vec<_> = [CellPos::new(0, 0), CellPos::new(1, 1), CellPos::new(2, 2)]
            .into_iter()
            .enumerate()
            .map(|(i, cell)| spawn_at(&h.arena, cell, i as u64))
            .collect();
        assert_eq!(h.arena.grid.occupied(), 3);

        h.arena.session.force_game_over();
        for actor in &mut actors {
            assert_eq!(actor.step(), ActorStep::Done(Outcome::Cancelled));
        }
        assert!(h.arena.grid.is_clear());
        assert!(!h.arena.slots.any_alive());
        assert_eq!(h.arena.session.score(), 0);
        assert!(h.screen.visible_cubes().is_empty());
    }

    #[test]
    fn test_strike_after_round_ended_does_not_score() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let cell = CellPos::new(4, 1);
        let mut actor = spawn_at(&h.arena, cell, 13);
        let target = actor.target().copied();

        // Another actor took the last life after this one saw the strike
        h.arena.session.force_game_over();
        assert_eq!(
            actor.finish(target, Outcome::Hit),
            ActorStep::Done(Outcome::Cancelled)
        );
        assert_eq!(actor.state(), TargetState::Terminated(Outcome::Cancelled));
        assert_eq!(h.arena.session.score(), 0);
        assert_eq!(h.sink.count(SoundEffect::Hit), 0);
        assert!(h.arena.grid.is_clear());
        assert!(!h.arena.slots.any_alive());
        assert!(h.screen.visible_cubes().is_empty());
    }

    #[test]
    fn test_seeking_actor_cancels_without_cell() {
        let h = harness(Settings::default());
        let slot = h.arena.slots.claim().unwrap();
        let mut actor = TargetActor::new(Arc::clone(&h.arena), slot, 1);
        h.arena.session.force_game_over();
        assert_eq!(actor.step(), ActorStep::Done(Outcome::Cancelled));
        assert!(h.arena.grid.is_clear());
        assert!(!h.arena.slots.is_alive(slot));
    }

    #[test]
    fn test_dropped_actor_releases_cell_and_slot() {
        let h = harness(Settings::default());
        park_cursor(&h.arena);
        let actor = spawn_at(&h.arena, CellPos::new(1, 2), 4);
        assert_eq!(h.arena.slots.live(), 1);
        drop(actor);
        assert!(h.arena.grid.is_clear());
        assert!(!h.arena.slots.any_alive());
        assert_eq!(h.arena.session.life(), 3);
        assert_eq!(h.arena.session.score(), 0);
    }

    #[test]
    fn test_targets_never_share_a_cell() {
        let h = harness(Settings {
            grid_rows: 2,
            grid_cols: 2,
            max_wave: 4,
            cursor_start: (63, 17),
            ..Default::default()
        });
        park_cursor(&h.arena);
        let mut actors: Vec<_> = (0..4)
            .map(|i| {
                let slot = h.arena.slots.claim().unwrap();
                TargetActor::new(Arc::clone(&h.arena), slot, 100 + i)
            })
            .collect();
        for round in 0..200 {
            h.clock.advance(Duration::from_millis(250));
            for actor in &mut actors {
                actor.step();
            }
            let cells: Vec<_> = actors.iter().filter_map(|a| a.target().map(|t| t.cell)).collect();
            let mut unique = cells.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), cells.len(), "shared cell in round {round}");
            assert_eq!(h.arena.grid.occupied(), cells.len());
        }
    }
}
