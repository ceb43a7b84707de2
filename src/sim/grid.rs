//! Spatial occupancy grid
//!
//! Every cell carries one lock word: `FREE` or the id of the actor holding
//! it. Acquisition is non-blocking only; callers that lose the race pick
//! another cell.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Identity of a target actor, unique for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

const FREE: u32 = 0;

/// A cell address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub row: u8,
    pub col: u8,
}

impl CellPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Neighbour at a signed offset, if it has non-negative coordinates
    pub fn offset(self, d_row: i32, d_col: i32) -> Option<CellPos> {
        let row = u8::try_from(self.row as i32 + d_row).ok()?;
        let col = u8::try_from(self.col as i32 + d_col).ok()?;
        Some(CellPos { row, col })
    }
}

/// Fixed rows x cols matrix of lockable cells
#[derive(Debug)]
pub struct Grid {
    rows: u8,
    cols: u8,
    cells: Vec<AtomicU32>,
}

impl Grid {
    pub fn new(rows: u8, cols: u8) -> Self {
        assert!(rows > 0 && cols > 0, "grid must not be empty");
        let cells = (0..rows as usize * cols as usize)
            .map(|_| AtomicU32::new(FREE))
            .collect();
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    /// Total number of cells
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, cell: CellPos) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    fn slot(&self, cell: CellPos) -> &AtomicU32 {
        assert!(self.contains(cell), "cell {cell:?} outside {}x{} grid", self.rows, self.cols);
        &self.cells[cell.row as usize * self.cols as usize + cell.col as usize]
    }

    /// Take the cell if it is free. Never blocks.
    pub fn try_acquire(&self, cell: CellPos, owner: ActorId) -> bool {
        debug_assert_ne!(owner.0, FREE, "actor id 0 is reserved");
        self.slot(cell)
            .compare_exchange(FREE, owner.0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Give the cell back
    ///
    /// # Panics
    /// If `owner` does not hold the cell.
    pub fn release(&self, cell: CellPos, owner: ActorId) {
        if let Err(actual) =
            self.slot(cell)
                .compare_exchange(owner.0, FREE, Ordering::AcqRel, Ordering::Acquire)
        {
            panic!(
                "actor {} released cell {cell:?} held by {}",
                owner.0,
                if actual == FREE { "nobody".to_string() } else { actual.to_string() }
            );
        }
    }

    /// Current holder of a cell
    pub fn holder(&self, cell: CellPos) -> Option<ActorId> {
        match self.slot(cell).load(Ordering::Acquire) {
            FREE => None,
            id => Some(ActorId(id)),
        }
    }

    /// Number of held cells
    pub fn occupied(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.load(Ordering::Acquire) != FREE)
            .count()
    }

    pub fn is_clear(&self) -> bool {
        self.occupied() == 0
    }

    /// Held cells with their holders, in row-major order
    pub fn occupied_cells(&self) -> Vec<(CellPos, ActorId)> {
        (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| CellPos::new(row, col)))
            .filter_map(|cell| self.holder(cell).map(|id| (cell, id)))
            .collect()
    }
}
