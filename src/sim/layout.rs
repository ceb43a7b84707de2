//! Pixel geometry of the playfield
//!
//! The grid is drawn as square cells, centered horizontally on the screen
//! and flush with the top edge. The crosshair can travel anywhere inside
//! the playfield.

use glam::IVec2;

use super::grid::CellPos;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub rows: u8,
    pub cols: u8,
    pub cell_px: i32,
    /// Inclusive playfield bounds
    pub min: IVec2,
    pub max: IVec2,
    /// Crosshair arm length
    pub half_span: i32,
    pub cube_half_size: i32,
}

impl Layout {
    pub fn from_settings(settings: &Settings) -> Self {
        let width = settings.cell_px * settings.grid_cols as i32;
        let height = settings.cell_px * settings.grid_rows as i32;
        let left = (settings.screen_width - width) / 2;
        Self {
            rows: settings.grid_rows,
            cols: settings.grid_cols,
            cell_px: settings.cell_px,
            min: IVec2::new(left, 0),
            max: IVec2::new(settings.screen_width - 1 - left, height - 1),
            half_span: settings.crosshair_half_span,
            cube_half_size: settings.cube_half_size,
        }
    }

    /// Pull a point back inside the playfield
    pub fn clamp(&self, p: IVec2) -> IVec2 {
        p.clamp(self.min, self.max)
    }

    pub fn contains(&self, p: IVec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Cell under a pixel
    pub fn cell_at(&self, p: IVec2) -> Option<CellPos> {
        if !self.contains(p) {
            return None;
        }
        let rel = (p - self.min) / self.cell_px;
        // Odd screen/playfield widths leave one extra pixel column on the right
        if rel.x >= self.cols as i32 || rel.y >= self.rows as i32 {
            return None;
        }
        Some(CellPos::new(rel.y as u8, rel.x as u8))
    }

    /// Pixel center of a cell, where its cube is drawn
    pub fn cell_center(&self, cell: CellPos) -> IVec2 {
        self.min
            + IVec2::new(cell.col as i32, cell.row as i32) * self.cell_px
            + IVec2::splat(self.cell_px / 2)
    }

    /// Cells covered by the crosshair: its center and the tips of its four arms
    pub fn hitbox(&self, cursor: IVec2) -> impl Iterator<Item = CellPos> + '_ {
        let s = self.half_span;
        [
            IVec2::ZERO,
            IVec2::new(-s, 0),
            IVec2::new(s, 0),
            IVec2::new(0, -s),
            IVec2::new(0, s),
        ]
        .into_iter()
        .filter_map(move |d| self.cell_at(cursor + d))
    }

    /// Whether the crosshair at `cursor` strikes `cell`
    pub fn is_struck(&self, cell: CellPos, cursor: IVec2) -> bool {
        self.hitbox(cursor).any(|c| c == cell)
    }
}
