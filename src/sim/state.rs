//! Shared session state
//!
//! Life, score and difficulty each sit behind their own lock so a hit and
//! an expiration on different actors never wait on each other. Critical
//! sections are a few instructions long and never touch the render surface.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::settings::{DifficultyCurve, Settings};

/// Current level and the timing parameters derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difficulty {
    pub level: u32,
    pub expire_ms: u64,
    pub move_ms: u64,
}

impl Difficulty {
    pub fn initial(curve: &DifficultyCurve) -> Self {
        Self {
            level: 1,
            expire_ms: curve.expire_ms,
            move_ms: curve.move_ms,
        }
    }

    /// Whether another level up would still make the game harder
    pub fn has_headroom(&self, curve: &DifficultyCurve) -> bool {
        self.expire_ms > curve.expire_floor_ms || self.move_ms > curve.move_floor_ms
    }

    /// Step to the next level; returns false when neither parameter would change
    fn advance(&mut self, curve: &DifficultyCurve) -> bool {
        if !self.has_headroom(curve) {
            return false;
        }
        let expire_ms = self
            .expire_ms
            .saturating_sub(curve.expire_step_ms)
            .max(curve.expire_floor_ms);
        let move_ms = self
            .move_ms
            .saturating_sub(curve.move_step_ms)
            .max(curve.move_floor_ms);
        // A zero step leaves a parameter stuck above its floor
        if expire_ms == self.expire_ms && move_ms == self.move_ms {
            return false;
        }
        self.level += 1;
        self.expire_ms = expire_ms;
        self.move_ms = move_ms;
        true
    }

    pub fn expire_timeout(&self) -> Duration {
        Duration::from_millis(self.expire_ms)
    }

    pub fn move_interval(&self) -> Duration {
        Duration::from_millis(self.move_ms)
    }
}

/// Result of scoring a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    /// Score after the hit
    pub score: u32,
    /// New difficulty if this hit levelled up
    pub level_up: Option<Difficulty>,
}

/// Consistent-enough view for the HUD and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub life: u32,
    pub score: u32,
    pub difficulty: Difficulty,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Life, score and difficulty of the running session
#[derive(Debug)]
pub struct SessionState {
    curve: DifficultyCurve,
    initial_life: u32,
    points_per_level: u32,
    life: Mutex<u32>,
    score: Mutex<u32>,
    difficulty: Mutex<Difficulty>,
}

impl SessionState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            curve: settings.difficulty,
            initial_life: settings.initial_life,
            points_per_level: settings.points_per_level,
            life: Mutex::new(settings.initial_life),
            score: Mutex::new(0),
            difficulty: Mutex::new(Difficulty::initial(&settings.difficulty)),
        }
    }

    pub fn life(&self) -> u32 {
        *lock(&self.life)
    }

    pub fn score(&self) -> u32 {
        *lock(&self.score)
    }

    pub fn difficulty(&self) -> Difficulty {
        *lock(&self.difficulty)
    }

    pub fn level(&self) -> u32 {
        self.difficulty().level
    }

    /// Life is gone; every actor must wind down
    pub fn is_over(&self) -> bool {
        self.life() == 0
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            life: self.life(),
            score: self.score(),
            difficulty: self.difficulty(),
        }
    }

    /// Count one hit, levelling up on every `points_per_level`-th point
    ///
    /// Returns `None` without scoring once life is gone. Life stays locked
    /// until the point is counted, so an expiration that ends the round
    /// lands either before the hit or after it.
    pub fn record_hit(&self) -> Option<HitOutcome> {
        let score = {
            let life = lock(&self.life);
            if *life == 0 {
                return None;
            }
            let mut score = lock(&self.score);
            *score += 1;
            *score
        };
        // Each score value is produced by exactly one caller, so exactly one
        // hit sees the multiple.
        let level_up = if score % self.points_per_level == 0 {
            self.advance_difficulty()
        } else {
            None
        };
        Some(HitOutcome { score, level_up })
    }

    /// Move to the next level if the curve has room; returns the new difficulty
    pub fn advance_difficulty(&self) -> Option<Difficulty> {
        let mut difficulty = lock(&self.difficulty);
        difficulty.advance(&self.curve).then_some(*difficulty)
    }

    /// Take one life, never going below zero; returns the remaining life
    pub fn lose_life(&self) -> u32 {
        let mut life = lock(&self.life);
        *life = life.saturating_sub(1);
        *life
    }

    /// Drive life to zero, which cancels every live actor
    pub fn force_game_over(&self) {
        *lock(&self.life) = 0;
    }

    /// Back to the start-of-round values
    pub fn reset(&self) {
        *lock(&self.life) = self.initial_life;
        *lock(&self.score) = 0;
        *lock(&self.difficulty) = Difficulty::initial(&self.curve);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SessionState {
        SessionState::new(&Settings::default())
    }

    #[test]
    fn test_initial_values() {
        let s = state();
        assert_eq!(s.life(), 3);
        assert_eq!(s.score(), 0);
        assert_eq!(s.level(), 1);
        assert_eq!(s.difficulty().expire_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_ten_hits_level_up_once() {
        let s = state();
        let before = s.difficulty();
        let level_ups: Vec<_> = (0..10).filter_map(|_| s.record_hit()?.level_up).collect();
        assert_eq!(s.score(), 10);
        assert_eq!(level_ups.len(), 1);
        let after = s.difficulty();
        assert_eq!(after.level, before.level + 1);
        assert!(after.expire_ms < before.expire_ms);
        assert!(after.move_ms < before.move_ms);
    }

    #[test]
    fn test_difficulty_never_crosses_floor() {
        let s = state();
        let curve = DifficultyCurve::default();
        let mut prev = s.difficulty();
        for _ in 0..1000 {
            s.record_hit();
            let d = s.difficulty();
            assert!(d.expire_ms <= prev.expire_ms && d.move_ms <= prev.move_ms);
            assert!(d.expire_ms >= curve.expire_floor_ms);
            assert!(d.move_ms >= curve.move_floor_ms);
            prev = d;
        }
        // Level stops once both floors are reached
        assert!(!prev.has_headroom(&curve));
        let level = prev.level;
        assert_eq!(s.advance_difficulty(), None);
        assert_eq!(s.level(), level);
    }

    #[test]
    fn test_level_stops_at_floor() {
        let s = state();
        // expire: 5000 -> 2000 in 6 steps, move: 1000 -> 250 in 6 steps
        for _ in 0..6 {
            assert!(s.advance_difficulty().is_some());
        }
        assert_eq!(s.level(), 7);
        assert_eq!(s.advance_difficulty(), None);
        assert_eq!(s.level(), 7);
    }

    #[test]
    fn test_zero_step_never_levels_up() {
        let settings = Settings {
            difficulty: DifficultyCurve {
                expire_step_ms: 0,
                move_step_ms: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let s = SessionState::new(&settings);
        for _ in 0..1000 {
            assert_eq!(s.record_hit().and_then(|hit| hit.level_up), None);
        }
        let d = s.difficulty();
        assert_eq!(d.level, 1);
        assert_eq!(d.expire_ms, 5000);
        assert_eq!(d.move_ms, 1000);
    }

    #[test]
    fn test_one_moving_parameter_still_levels_up() {
        let settings = Settings {
            difficulty: DifficultyCurve {
                expire_step_ms: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let s = SessionState::new(&settings);
        // move: 1000 -> 250 in 6 steps, expire never moves
        for _ in 0..6 {
            assert!(s.advance_difficulty().is_some());
        }
        assert_eq!(s.advance_difficulty(), None);
        assert_eq!(s.level(), 7);
        assert_eq!(s.difficulty().expire_ms, 5000);
    }

    #[test]
    fn test_no_score_after_game_over() {
        let s = state();
        s.record_hit();
        s.force_game_over();
        assert_eq!(s.record_hit(), None);
        assert_eq!(s.score(), 1);
        s.reset();
        assert_eq!(s.record_hit().map(|hit| hit.score), Some(1));
    }

    #[test]
    fn test_life_floors_at_zero() {
        let s = state();
        assert_eq!(s.lose_life(), 2);
        assert_eq!(s.lose_life(), 1);
        assert_eq!(s.lose_life(), 0);
        assert_eq!(s.lose_life(), 0);
        assert!(s.is_over());
    }

    #[test]
    fn test_reset_restores_everything() {
        let s = state();
        for _ in 0..25 {
            s.record_hit();
        }
        s.force_game_over();
        s.reset();
        let snap = s.snapshot();
        assert_eq!(snap.life, 3);
        assert_eq!(snap.score, 0);
        assert_eq!(snap.difficulty, Difficulty::initial(&DifficultyCurve::default()));
    }

    #[test]
    fn test_concurrent_hits_count_exactly() {
        use std::sync::Arc;
        let s = Arc::new(state());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    (0..25).filter(|_| s.record_hit().and_then(|hit| hit.level_up).is_some()).count()
                })
            })
            .collect();
        let level_ups: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(s.score(), 100);
        assert_eq!(level_ups, 6, "10 multiples of 10, but only 6 steps of headroom");
    }
}
