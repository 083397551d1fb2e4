//! Time-window math for sprite-relative playback
//!
//! Sprites are authored in milliseconds; playback positions are tracked in
//! seconds. All conversions live here.

use serde::{Deserialize, Serialize};

#[inline]
pub fn ms_to_secs(ms: f64) -> f64 {
    ms / 1000.0
}

#[inline]
pub fn secs_to_ms(secs: f64) -> f64 {
    secs * 1000.0
}

/// Wall-clock milliseconds needed to play `duration_secs` of audio at `rate`.
///
/// Infinite when the duration is infinite (streams).
#[inline]
pub fn timeout_ms(duration_secs: f64, rate: f64) -> f64 {
    secs_to_ms(duration_secs) / rate.abs()
}

/// Playback window inside an asset, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub stop: f64,
}

impl TimeWindow {
    /// Window starting at `offset_ms` lasting `duration_ms`
    #[inline]
    pub fn from_ms(offset_ms: f64, duration_ms: f64) -> Self {
        Self {
            start: ms_to_secs(offset_ms),
            stop: ms_to_secs(offset_ms + duration_ms),
        }
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }

    /// Where playback begins: a stored seek wins, otherwise the window start
    #[inline]
    pub fn start_position(&self, seek: f64) -> f64 {
        let position = if seek > 0.0 { seek } else { self.start };
        position.max(0.0)
    }

    /// Seconds left before the window stops
    #[inline]
    pub fn remaining(&self, position: f64) -> f64 {
        (self.stop - position).max(0.0)
    }

    /// True when `position` is at or past the window end
    #[inline]
    pub fn is_exhausted_at(&self, position: f64) -> bool {
        position >= self.stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_from_ms() {
        let w = TimeWindow::from_ms(500.0, 1000.0);
        assert_eq!(w.start, 0.5);
        assert_eq!(w.stop, 1.5);
        assert_eq!(w.duration(), 1.0);
    }

    #[test]
    fn test_start_position() {
        let w = TimeWindow::from_ms(500.0, 1000.0);
        assert_eq!(w.start_position(0.0), 0.5);
        assert_eq!(w.start_position(1.2), 1.2);
        assert_eq!(w.start_position(-3.0), 0.5);
    }

    #[test]
    fn test_remaining_and_exhaustion() {
        let w = TimeWindow::from_ms(0.0, 1000.0);
        assert_eq!(w.remaining(0.25), 0.75);
        assert_eq!(w.remaining(2.0), 0.0);
        assert!(w.is_exhausted_at(1.0));
        assert!(w.is_exhausted_at(2.0));
        assert!(!w.is_exhausted_at(0.999));
    }

    #[test]
    fn test_timeout() {
        assert_eq!(timeout_ms(1.0, 2.0), 500.0);
        assert_eq!(timeout_ms(1.0, -0.5), 2000.0);
        assert!(timeout_ms(f64::INFINITY, 1.0).is_infinite());
    }
}
