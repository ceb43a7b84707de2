//! Target slot arena
//!
//! One slot per potentially live target. A slot is claimed by the director
//! when it creates an actor and freed by that actor as its very last act,
//! after its cell is back in the grid.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug)]
pub struct TargetSlots {
    alive: Vec<AtomicBool>,
    live: Mutex<usize>,
    cleared: Condvar,
}

impl TargetSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            alive: (0..capacity).map(|_| AtomicBool::new(false)).collect(),
            live: Mutex::new(0),
            cleared: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.alive.len()
    }

    /// Reserve a free slot
    pub fn claim(&self) -> Option<usize> {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = self.alive.iter().position(|a| !a.load(Ordering::Acquire))?;
        self.alive[slot].store(true, Ordering::Release);
        *live += 1;
        Some(slot)
    }

    /// Mark a slot dead and wake anyone waiting for the wave to clear
    ///
    /// # Panics
    /// If the slot was not alive.
    pub fn release(&self, slot: usize) {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        let was_alive = self.alive[slot].swap(false, Ordering::AcqRel);
        assert!(was_alive, "target slot {slot} released twice");
        *live -= 1;
        if *live == 0 {
            self.cleared.notify_all();
        }
    }

    pub fn is_alive(&self, slot: usize) -> bool {
        self.alive[slot].load(Ordering::Acquire)
    }

    /// Number of live targets
    pub fn live(&self) -> usize {
        *self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn any_alive(&self) -> bool {
        self.alive.iter().any(|a| a.load(Ordering::Acquire))
    }

    /// Block until no target is alive or the timeout passes
    pub fn wait_clear(&self, timeout: Duration) -> bool {
        let live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        let (live, _) = self
            .cleared
            .wait_timeout_while(live, timeout, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *live == 0
    }
}
