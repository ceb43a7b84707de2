//! Debug counters
//!
//! Process-lifetime instrumentation of the input pipeline and actors.
//! Nothing here feeds back into gameplay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::JITTER_BUCKETS;
use crate::platform::Button;

/// Deviation of sample timing from the nominal period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JitterStats {
    /// Largest deviation seen, in microseconds (not clamped)
    pub max_us: u64,
    /// Count of samples per deviation in microseconds; the last bucket
    /// collects everything larger
    pub histogram: [u64; JITTER_BUCKETS],
}

impl Default for JitterStats {
    fn default() -> Self {
        Self {
            max_us: 0,
            histogram: [0; JITTER_BUCKETS],
        }
    }
}

impl JitterStats {
    pub fn record(&mut self, deviation_us: u64) {
        self.max_us = self.max_us.max(deviation_us);
        let bucket = (deviation_us as usize).min(JITTER_BUCKETS - 1);
        self.histogram[bucket] += 1;
    }

    /// Number of recorded samples
    pub fn total(&self) -> u64 {
        self.histogram.iter().sum()
    }
}

/// Absolute deviation of `elapsed` from `period`, rounded to whole microseconds
pub fn deviation_us(elapsed: Duration, period: Duration) -> u64 {
    let diff = elapsed.abs_diff(period);
    ((diff.as_nanos() + 500) / 1000) as u64
}

/// Shared counters
#[derive(Debug, Default)]
pub struct Diagnostics {
    num_samples: AtomicU64,
    update_work: AtomicU64,
    data_lost: AtomicU64,
    consumer_count: AtomicU64,
    display_count: AtomicU64,
    num_created: AtomicU64,
    start_response_ms: AtomicU64,
    restart_response_ms: AtomicU64,
    jitter: Mutex<JitterStats>,
}

macro_rules! counter {
    ($bump:ident, $get:ident, $field:ident) => {
        pub fn $bump(&self) -> u64 {
            self.$field.fetch_add(1, Ordering::Relaxed) + 1
        }

        pub fn $get(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(bump_samples, num_samples, num_samples);
    counter!(bump_update_work, update_work, update_work);
    counter!(bump_data_lost, data_lost, data_lost);
    counter!(bump_consumer, consumer_count, consumer_count);
    counter!(bump_display, display_count, display_count);
    counter!(bump_created, num_created, num_created);

    pub fn record_jitter(&self, deviation_us: u64) {
        self.jitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(deviation_us);
    }

    pub fn jitter(&self) -> JitterStats {
        self.jitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Time from a button press to the screen responding
    pub fn record_response(&self, button: Button, latency: Duration) {
        let ms = latency.as_millis() as u64;
        match button {
            Button::Start => self.start_response_ms.store(ms, Ordering::Relaxed),
            Button::Restart => self.restart_response_ms.store(ms, Ordering::Relaxed),
        }
    }

    pub fn response_ms(&self, button: Button) -> u64 {
        match button {
            Button::Start => self.start_response_ms.load(Ordering::Relaxed),
            Button::Restart => self.restart_response_ms.load(Ordering::Relaxed),
        }
    }

    /// Clear the per-round sampling counters. Jitter is kept.
    pub fn reset_round(&self) {
        self.num_samples.store(0, Ordering::Relaxed);
        self.update_work.store(0, Ordering::Relaxed);
        self.data_lost.store(0, Ordering::Relaxed);
    }

    pub fn report(&self) -> DiagnosticsReport {
        let jitter = self.jitter();
        DiagnosticsReport {
            num_samples: self.num_samples(),
            update_work: self.update_work(),
            data_lost: self.data_lost(),
            consumer_count: self.consumer_count(),
            display_count: self.display_count(),
            num_created: self.num_created(),
            start_response_ms: self.response_ms(Button::Start),
            restart_response_ms: self.response_ms(Button::Restart),
            max_jitter_us: jitter.max_us,
            jitter_histogram: jitter.histogram.to_vec(),
        }
    }
}

/// Serializable snapshot of [`Diagnostics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub num_samples: u64,
    pub update_work: u64,
    pub data_lost: u64,
    pub consumer_count: u64,
    pub display_count: u64,
    pub num_created: u64,
    pub start_response_ms: u64,
    pub restart_response_ms: u64,
    pub max_jitter_us: u64,
    pub jitter_histogram: Vec<u64>,
}
