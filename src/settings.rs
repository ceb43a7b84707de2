//! Game settings and tuning
//!
//! Loaded from a JSON file; missing fields fall back to the board defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors from reading or validating a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Expiration timeout and move interval as a function of level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyCurve {
    /// Time a target may stay alive before it costs a life
    pub expire_ms: u64,
    pub expire_step_ms: u64,
    pub expire_floor_ms: u64,
    /// Time between two target moves
    pub move_ms: u64,
    pub move_step_ms: u64,
    pub move_floor_ms: u64,
}

impl Default for DifficultyCurve {
    fn default() -> Self {
        Self {
            expire_ms: 5000,
            expire_step_ms: 500,
            expire_floor_ms: 2000,
            move_ms: 1000,
            move_step_ms: 125,
            move_floor_ms: 250,
        }
    }
}

/// Game settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Playfield ===
    pub grid_rows: u8,
    pub grid_cols: u8,
    pub cell_px: i32,
    pub screen_width: i32,

    // === Input ===
    pub cursor_start: (i32, i32),
    pub sensitivity_shift: u32,
    pub crosshair_half_span: i32,
    /// Sampling period in microseconds
    pub sample_period_us: u64,
    pub queue_capacity: usize,
    /// Stop sampling after this many samples in a round (None = never)
    pub max_samples: Option<u64>,

    // === Gameplay ===
    pub cube_half_size: i32,
    pub max_wave: usize,
    pub initial_life: u32,
    pub points_per_level: u32,
    pub difficulty: DifficultyCurve,

    // === Buttons / restart ===
    pub debounce_ms: u64,
    /// Time given to in-flight actors to wind down before a reset
    pub restart_settle_ms: u64,
    /// How long the "Restarting" banner stays up
    pub restart_banner_ms: u64,

    // === Audio ===
    pub master_volume: f32,
    pub muted: bool,

    /// RNG seed (None = seed from entropy)
    pub seed: Option<u64>,
    /// Where the leaderboard is persisted (None = memory only)
    pub highscores_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid_rows: GRID_ROWS,
            grid_cols: GRID_COLS,
            cell_px: CELL_PX,
            screen_width: SCREEN_WIDTH,

            cursor_start: CURSOR_START,
            sensitivity_shift: SENSITIVITY_SHIFT,
            crosshair_half_span: CROSSHAIR_HALF_SPAN,
            sample_period_us: SAMPLE_PERIOD_US,
            queue_capacity: CURSOR_QUEUE_CAPACITY,
            max_samples: None,

            cube_half_size: CUBE_HALF_SIZE,
            max_wave: MAX_WAVE,
            initial_life: INITIAL_LIFE,
            points_per_level: POINTS_PER_LEVEL,
            difficulty: DifficultyCurve::default(),

            debounce_ms: DEBOUNCE_MS,
            restart_settle_ms: 50,
            restart_banner_ms: 500,

            master_volume: 0.8,
            muted: false,

            seed: None,
            highscores_path: None,
        }
    }
}

impl Settings {
    pub fn sample_period(&self) -> Duration {
        Duration::from_micros(self.sample_period_us)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn restart_settle(&self) -> Duration {
        Duration::from_millis(self.restart_settle_ms)
    }

    pub fn restart_banner(&self) -> Duration {
        Duration::from_millis(self.restart_banner_ms)
    }

    /// Number of cells in the grid
    pub fn grid_capacity(&self) -> usize {
        self.grid_rows as usize * self.grid_cols as usize
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: String| -> Result<(), SettingsError> { Err(SettingsError::Invalid(msg)) };

        if self.grid_rows == 0 || self.grid_cols == 0 {
            return invalid("grid must have at least one row and column".into());
        }
        if self.max_wave == 0 || self.max_wave > self.grid_capacity() {
            return invalid(format!(
                "max_wave {} must be between 1 and the grid capacity {}",
                self.max_wave,
                self.grid_capacity()
            ));
        }
        if self.cell_px < 2 * self.cube_half_size + 1 {
            return invalid(format!(
                "cube of half size {} does not fit a {} px cell",
                self.cube_half_size, self.cell_px
            ));
        }
        let width = self.cell_px * self.grid_cols as i32;
        let height = self.cell_px * self.grid_rows as i32;
        if width > self.screen_width {
            return invalid("playfield is wider than the screen".into());
        }
        let left = (self.screen_width - width) / 2;
        let (x, y) = self.cursor_start;
        if !(left..self.screen_width - left).contains(&x) || !(0..height).contains(&y) {
            return invalid(format!(
                "cursor_start {:?} lies outside the playfield",
                self.cursor_start
            ));
        }
        // A wider shift overflows the u16 deflection
        if self.sensitivity_shift >= u16::BITS {
            return invalid(format!(
                "sensitivity_shift {} must be below {}",
                self.sensitivity_shift,
                u16::BITS
            ));
        }
        if self.sample_period_us == 0 {
            return invalid("sample period must be non-zero".into());
        }
        if self.queue_capacity == 0 {
            return invalid("queue capacity must be non-zero".into());
        }
        if self.points_per_level == 0 {
            return invalid("points_per_level must be non-zero".into());
        }
        if self.initial_life == 0 {
            return invalid("initial_life must be non-zero".into());
        }
        let d = &self.difficulty;
        if d.expire_floor_ms > d.expire_ms || d.move_floor_ms > d.move_ms {
            return invalid("difficulty floors must not exceed the initial values".into());
        }
        if d.move_floor_ms == 0 {
            return invalid("move interval floor must be non-zero".into());
        }
        if (d.expire_step_ms == 0 && d.expire_ms > d.expire_floor_ms)
            || (d.move_step_ms == 0 && d.move_ms > d.move_floor_ms)
        {
            return invalid(
                "a difficulty step must be non-zero while its floor is below the initial value".into(),
            );
        }
        Ok(())
    }

    /// Read and validate settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.grid_capacity(), 36);
        assert_eq!(settings.sample_period(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "max_wave": 3, "difficulty": { "expire_ms": 8000 } }"#)
                .unwrap();
        assert_eq!(settings.max_wave, 3);
        assert_eq!(settings.difficulty.expire_ms, 8000);
        assert_eq!(settings.difficulty.move_ms, 1000);
        assert_eq!(settings.grid_rows, GRID_ROWS);
    }

    #[test]
    fn test_wave_larger_than_grid_rejected() {
        let settings = Settings {
            grid_rows: 2,
            grid_cols: 2,
            max_wave: 5,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_floor_above_initial_rejected() {
        let mut settings = Settings::default();
        settings.difficulty.expire_floor_ms = settings.difficulty.expire_ms + 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_oversized_sensitivity_shift_rejected() {
        let mut settings = Settings {
            sensitivity_shift: 16,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
        settings.sensitivity_shift = 15;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_step_above_floor_rejected() {
        let mut settings = Settings::default();
        settings.difficulty.expire_step_ms = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.difficulty.move_step_ms = 0;
        assert!(settings.validate().is_err());

        // Nothing to step down when a parameter starts on its floor
        let mut settings = Settings::default();
        settings.difficulty.expire_step_ms = 0;
        settings.difficulty.expire_floor_ms = settings.difficulty.expire_ms;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_cursor_start_outside_playfield_rejected() {
        // Default playfield spans x 13..=114, y 0..=101
        for start in [(12, 50), (115, 50), (63, -1), (63, 102)] {
            let settings = Settings {
                cursor_start: start,
                ..Default::default()
            };
            assert!(settings.validate().is_err(), "{start:?}");
        }
        for start in [(13, 0), (114, 101)] {
            let settings = Settings {
                cursor_start: start,
                ..Default::default()
            };
            assert!(settings.validate().is_ok(), "{start:?}");
        }
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("cube_strike_settings_{}.json", std::process::id()));
        let settings = Settings {
            seed: Some(7),
            max_wave: 2,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.seed, Some(7));
        assert_eq!(loaded.max_wave, 2);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_or_default(Path::new("/nonexistent/cube_strike.json"));
        assert_eq!(settings.max_wave, MAX_WAVE);
    }
}
