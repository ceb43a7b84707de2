//! Game engine
//!
//! Everything the actors of a round share lives in an [`Arena`]:
//! - Grid of lockable cells, one target per cell
//! - Session state (life, score, difficulty), each behind its own lock
//! - Target slots the director waits on
//! - The render surface, drawn to by one thread at a time
//!
//! Actors are step functions that never block, so the same code runs on
//! threads (`runtime::ThreadRunner`) or in lock-step under a manual clock.

pub mod arena;
pub mod cursor;
pub mod director;
pub mod grid;
pub mod input;
pub mod layout;
pub mod session;
pub mod slots;
pub mod state;
pub mod target;

pub use arena::{Arena, ArenaBuilder};
pub use cursor::{Cursor, CursorUpdate, update_position};
pub use director::{Director, DirectorStep, TargetSpawner};
pub use grid::{ActorId, CellPos, Grid};
pub use input::{CursorUpdater, Pull, SampleOutcome, Sampler, cursor_queue};
pub use layout::Layout;
pub use session::{RoundRunner, SessionController, SessionPhase};
pub use slots::TargetSlots;
pub use state::{Difficulty, HitOutcome, SessionSnapshot, SessionState};
pub use target::{ActorStep, Direction, Outcome, Target, TargetActor, TargetState};
