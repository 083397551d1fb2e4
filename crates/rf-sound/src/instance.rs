//! Sound instances
//!
//! An instance is one playback voice of a group. Instances are pooled: an
//! ended instance is reset to the parameters it was created with and handed
//! out again under the same id.

use serde::{Deserialize, Serialize};

use crate::backend::voice::Voice;
use crate::fade::Fade;
use crate::scheduler::TimerId;
use crate::sprite::DEFAULT_SPRITE;

/// Unique instance identifier, assigned by the device registry
pub type InstanceId = u64;

/// Group defaults captured when an instance is constructed
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct InstanceDefaults {
    pub muted: bool,
    pub looping: bool,
    pub volume: f32,
    pub rate: f64,
}

/// How the natural end of the current playback is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndWatch {
    /// Scheduler timeout computed from remaining duration and rate
    Timer { timer: TimerId, token: u64 },
    /// Media element's own `ended` signal
    ElementEnded,
}

/// Public view of an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub id: InstanceId,
    pub sprite: String,
    pub paused: bool,
    pub ended: bool,
    pub muted: bool,
    pub looping: bool,
    pub volume: f32,
    pub rate: f64,
    /// Window start/stop in seconds of the sprite last played
    pub start: f64,
    pub stop: f64,
}

impl InstanceStatus {
    #[inline]
    pub fn is_playing(&self) -> bool {
        !self.paused
    }
}

pub(crate) struct SoundInstance {
    pub id: InstanceId,
    pub sprite: String,
    pub paused: bool,
    pub ended: bool,
    pub muted: bool,
    pub looping: bool,
    pub volume: f32,
    pub rate: f64,
    /// Stored position in seconds (resume point)
    pub seek: f64,
    /// Position captured at the last rate change while playing
    pub rate_seek: f64,
    pub start: f64,
    pub stop: f64,
    /// Device time playback (re)started
    pub play_start: f64,
    pub fade: Option<Fade>,
    pub end_watch: Option<EndWatch>,
    /// Element end re-check after an early timer
    pub recheck: Option<TimerId>,
    pub voice: Option<Voice>,
    defaults: InstanceDefaults,
}

impl SoundInstance {
    pub fn new(id: InstanceId, defaults: InstanceDefaults, voice: Option<Voice>) -> Self {
        Self {
            id,
            sprite: DEFAULT_SPRITE.to_string(),
            paused: true,
            ended: true,
            muted: defaults.muted,
            looping: defaults.looping,
            volume: defaults.volume,
            rate: defaults.rate,
            seek: 0.0,
            rate_seek: 0.0,
            start: 0.0,
            stop: 0.0,
            play_start: 0.0,
            fade: None,
            end_watch: None,
            recheck: None,
            voice,
            defaults,
        }
    }

    /// Restore the construction-time parameters for reuse
    pub fn reset(&mut self) {
        self.muted = self.defaults.muted;
        self.looping = self.defaults.looping;
        self.volume = self.defaults.volume;
        self.rate = self.defaults.rate;
        self.seek = 0.0;
        self.rate_seek = 0.0;
        self.paused = true;
        self.ended = true;
        self.sprite = DEFAULT_SPRITE.to_string();
    }

    /// Paused with a resume point, i.e. resumable by a bare `play()`
    #[inline]
    pub fn is_resumable(&self) -> bool {
        self.paused && !self.ended
    }

    /// Gain the backend should apply right now
    #[inline]
    pub fn effective_gain(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    pub fn status(&self) -> InstanceStatus {
        InstanceStatus {
            id: self.id,
            sprite: self.sprite.clone(),
            paused: self.paused,
            ended: self.ended,
            muted: self.muted,
            looping: self.looping,
            volume: self.volume,
            rate: self.rate,
            start: self.start,
            stop: self.stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> InstanceDefaults {
        InstanceDefaults {
            muted: false,
            looping: true,
            volume: 0.7,
            rate: 1.25,
        }
    }

    #[test]
    fn test_new_instance_is_idle() {
        let inst = SoundInstance::new(11, defaults(), None);
        assert!(inst.paused && inst.ended);
        assert!(!inst.is_resumable());
        assert_eq!(inst.sprite, DEFAULT_SPRITE);
        assert_eq!(inst.volume, 0.7);
        assert!(inst.looping);
    }

    #[test]
    fn test_reset_restores_snapshot_and_keeps_id() {
        let mut inst = SoundInstance::new(11, defaults(), None);
        inst.volume = 0.1;
        inst.rate = 3.0;
        inst.muted = true;
        inst.looping = false;
        inst.seek = 4.2;
        inst.rate_seek = 1.0;
        inst.sprite = "blast".into();
        inst.paused = true;
        inst.ended = false;

        inst.reset();
        assert_eq!(inst.id, 11);
        assert_eq!(inst.volume, 0.7);
        assert_eq!(inst.rate, 1.25);
        assert!(!inst.muted);
        assert!(inst.looping);
        assert_eq!(inst.seek, 0.0);
        assert_eq!(inst.rate_seek, 0.0);
        assert!(inst.paused && inst.ended);
        assert_eq!(inst.sprite, DEFAULT_SPRITE);
    }

    #[test]
    fn test_effective_gain_and_status() {
        let mut inst = SoundInstance::new(1, defaults(), None);
        assert_eq!(inst.effective_gain(), 0.7);
        inst.muted = true;
        assert_eq!(inst.effective_gain(), 0.0);

        inst.paused = false;
        let status = inst.status();
        assert!(status.is_playing());
        assert!(status.muted);
    }
}
