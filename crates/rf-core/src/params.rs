//! Parameter types for playback control

use serde::{Deserialize, Serialize};

/// Linear volume, always inside 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Volume(f32);

impl Volume {
    pub const SILENT: Self = Self(0.0);
    pub const FULL: Self = Self(1.0);

    /// Validate a raw volume. Returns `None` outside 0.0..=1.0 (NaN included).
    #[inline]
    pub fn new(value: f32) -> Option<Self> {
        if (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Clamp a raw volume into range (NaN becomes silence)
    #[inline]
    pub fn clamped(value: f32) -> Self {
        if value.is_nan() {
            Self::SILENT
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    #[inline]
    pub fn get(self) -> f32 {
        self.0
    }

    /// Round to two decimal places (fade step resolution)
    #[inline]
    pub fn round_centi(value: f32) -> f32 {
        (value * 100.0).round() / 100.0
    }

    /// Scale by another volume (instance volume × global volume)
    #[inline]
    pub fn scaled(self, by: Volume) -> Self {
        Self(self.0 * by.0)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::FULL
    }
}

/// Playback rate multiplier, strictly positive and finite
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    pub const NORMAL: Self = Self(1.0);

    #[inline]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value > 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::NORMAL
    }
}
