//! Frame clock: turns host timestamps into `frame` phases.
//!
//! Relative-time scripts receive the fraction of one cycle elapsed since the
//! previous frame. Whole cycles that passed in between are flushed first as
//! separate `frame 1` ticks, so the script never sees a phase above one
//! cycle. Absolute-time scripts get elapsed seconds with no flushing.

use crate::param::{ParamValue, ParamValues};

/// Timing constants derived from parameter values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Length of one cycle; `-1` when unset
    pub duration_ms: i64,
    /// Interval between automatic retriggers; `0` when unset
    pub repeat_ms: i64,
}

impl Timing {
    pub fn derive(absolute_time: bool, params: &ParamValues) -> Self {
        if absolute_time {
            return Self {
                duration_ms: 1000,
                repeat_ms: 0,
            };
        }
        let millis = |name: &str| {
            params
                .get(name)
                .and_then(ParamValue::as_f64)
                .map_or(0, |secs| (secs * 1000.0).round() as i64)
        };
        let duration_ms = millis("duration");
        Self {
            duration_ms: if duration_ms <= 0 { -1 } else { duration_ms },
            repeat_ms: millis("repeat"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameClock {
    timing: Timing,
    absolute_time: bool,
    last_frame: u64,
    emitted: bool,
}

impl FrameClock {
    pub fn new(timing: Timing, absolute_time: bool) -> Self {
        Self {
            timing,
            absolute_time,
            last_frame: 0,
            emitted: false,
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    /// Restart from `origin` as if no frame had been sent.
    pub fn reset(&mut self, origin: u64) {
        self.last_frame = origin;
        self.emitted = false;
    }

    /// Timestamp of the most recent frame (or the origin).
    pub fn last_frame(&self) -> u64 {
        self.last_frame
    }

    /// Whether any frame has been emitted since the last reset.
    pub fn has_emitted(&self) -> bool {
        self.emitted
    }

    /// Advance to `timestamp` and return the phases to send, in order.
    ///
    /// A timestamp at or before the previous frame moves the clock to that
    /// timestamp and yields a single zero phase.
    pub fn advance(&mut self, timestamp: u64) -> Vec<f64> {
        if timestamp <= self.last_frame {
            self.last_frame = timestamp;
        }
        let elapsed = (timestamp - self.last_frame) as f64;
        let mut delta = if self.timing.duration_ms == 0 {
            0.0
        } else {
            elapsed / self.timing.duration_ms as f64
        };

        let mut phases = Vec::new();
        if !self.absolute_time {
            while delta > 1.0 {
                phases.push(1.0);
                delta -= 1.0;
            }
        }
        phases.push(delta.max(0.0));

        self.last_frame = timestamp;
        self.emitted = true;
        phases
    }
}
