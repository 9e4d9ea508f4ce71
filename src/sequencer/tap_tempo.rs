// Tap tempo - BPM estimate from the spacing of user taps

use crate::sequencer::state::{MAX_BPM, MIN_BPM};
use std::collections::VecDeque;

/// Maximum number of taps kept
pub const TAP_HISTORY_LEN: usize = 8;

/// Taps further apart than this start a new session, and longer deltas are
/// ignored when averaging
pub const TAP_GAP_MS: i64 = 2000;

/// Tap history and BPM estimator
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    taps: VecDeque<u64>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self {
            taps: VecDeque::with_capacity(TAP_HISTORY_LEN + 1),
        }
    }

    /// Record a tap at `timestamp_ms` (any monotonic millisecond clock).
    ///
    /// Returns the new BPM when the history yields a usable estimate inside
    /// [40, 260]. Returns None when there are fewer than two taps, when every
    /// delta is an outlier, or when the estimate is out of range.
    pub fn register_tap(&mut self, timestamp_ms: u64) -> Option<f64> {
        if let Some(&last) = self.taps.back() {
            if delta_ms(last, timestamp_ms) > TAP_GAP_MS {
                self.taps.clear();
            }
        }

        self.taps.push_back(timestamp_ms);
        while self.taps.len() > TAP_HISTORY_LEN {
            self.taps.pop_front();
        }

        if self.taps.len() < 2 {
            return None;
        }

        let (sum, count) = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(&a, &b)| delta_ms(a, b))
            .filter(|&delta| delta > 0 && delta <= TAP_GAP_MS)
            .fold((0i64, 0i64), |(sum, count), delta| (sum + delta, count + 1));

        if count == 0 {
            return None;
        }

        let mean = sum as f64 / count as f64;
        let bpm = 60_000.0 / mean;
        if (MIN_BPM..=MAX_BPM).contains(&bpm) {
            Some(bpm)
        } else {
            None
        }
    }

    /// Number of taps in the current session
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

/// Signed `b - a`; a clock that went backwards gives a negative delta
fn delta_ms(a: u64, b: u64) -> i64 {
    b as i64 - a as i64
}
