//! Stepped volume fades
//!
//! A fade advances in roughly 0.01 volume steps. Each tick moves the volume
//! by the share of the total change matching the wall time elapsed since the
//! previous tick, rounds to two decimals and clamps at the target.

use rf_core::Volume;

use crate::scheduler::TimerId;

/// Volume resolution of one fade step
pub const FADE_STEP: f32 = 0.01;
/// Floor on the tick interval
pub const MIN_FADE_INTERVAL_MS: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeStep {
    Continue(f32),
    Finished(f32),
}

impl FadeStep {
    #[inline]
    pub fn volume(self) -> f32 {
        match self {
            FadeStep::Continue(v) | FadeStep::Finished(v) => v,
        }
    }
}

/// Running fade on one instance
#[derive(Debug, Clone)]
pub struct Fade {
    from: f32,
    to: f32,
    duration_ms: f64,
    current: f32,
    last_tick_ms: f64,
    /// Also drives the group default volume
    group_wide: bool,
    pub(crate) token: u64,
    pub(crate) timer: Option<TimerId>,
}

impl Fade {
    pub fn new(from: f32, to: f32, duration_ms: f64, started_at_ms: f64, group_wide: bool) -> Self {
        Self {
            from,
            to,
            duration_ms: duration_ms.max(0.0),
            current: from,
            last_tick_ms: started_at_ms,
            group_wide,
            token: 0,
            timer: None,
        }
    }

    /// Tick spacing: one step per 0.01 of change, no faster than 4 ms
    pub fn interval_ms(&self) -> f64 {
        let steps = ((self.to - self.from).abs() / FADE_STEP) as f64;
        let interval = if steps > 0.0 {
            self.duration_ms / steps
        } else {
            self.duration_ms
        };
        interval.max(MIN_FADE_INTERVAL_MS)
    }

    pub fn tick(&mut self, now_ms: f64) -> FadeStep {
        if self.duration_ms <= 0.0 || self.from == self.to {
            self.current = self.to;
            return FadeStep::Finished(self.to);
        }

        let elapsed = (now_ms - self.last_tick_ms).max(0.0);
        self.last_tick_ms = now_ms;

        let delta = (self.to - self.from) * (elapsed / self.duration_ms) as f32;
        let mut volume = Volume::round_centi(self.current + delta);
        volume = if self.from < self.to {
            volume.min(self.to)
        } else {
            volume.max(self.to)
        };
        self.current = volume;

        if volume == self.to {
            FadeStep::Finished(volume)
        } else {
            FadeStep::Continue(volume)
        }
    }

    #[inline]
    pub fn from(&self) -> f32 {
        self.from
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.to
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    #[inline]
    pub fn is_group_wide(&self) -> bool {
        self.group_wide
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interval() {
        assert_relative_eq!(Fade::new(0.0, 1.0, 1000.0, 0.0, false).interval_ms(), 10.0, epsilon = 1e-6);
        // 100 steps over 100 ms would be 1 ms; floored to 4 ms
        assert_eq!(Fade::new(0.0, 1.0, 100.0, 0.0, false).interval_ms(), MIN_FADE_INTERVAL_MS);
        assert_eq!(Fade::new(0.5, 0.5, 200.0, 0.0, false).interval_ms(), 200.0);
    }

    #[test]
    fn test_fade_up_is_monotonic_and_lands_on_target() {
        let mut fade = Fade::new(0.0, 1.0, 100.0, 0.0, false);
        let interval = fade.interval_ms();
        let mut now = 0.0;
        let mut last = 0.0;
        let mut finished = None;

        for _ in 0..100 {
            now += interval;
            match fade.tick(now) {
                FadeStep::Continue(v) => {
                    assert!(v >= last, "fade went backwards: {v} < {last}");
                    last = v;
                }
                FadeStep::Finished(v) => {
                    finished = Some(v);
                    break;
                }
            }
        }
        assert_eq!(finished, Some(1.0));
    }

    #[test]
    fn test_fade_down_clamps() {
        let mut fade = Fade::new(1.0, 0.2, 50.0, 0.0, true);
        assert!(fade.is_group_wide());
        // A late tick overshoots and is clamped
        assert_eq!(fade.tick(500.0), FadeStep::Finished(0.2));
    }

    #[test]
    fn test_zero_length_finishes_immediately() {
        let mut fade = Fade::new(0.3, 0.9, 0.0, 0.0, false);
        assert_eq!(fade.tick(0.0), FadeStep::Finished(0.9));
        let mut flat = Fade::new(0.4, 0.4, 300.0, 0.0, false);
        assert_eq!(flat.tick(4.0).volume(), 0.4);
    }
}
