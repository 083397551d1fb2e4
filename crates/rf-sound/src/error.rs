//! Error types for rf-sound

use thiserror::Error;

use crate::instance::InstanceId;

/// Contract violations, returned synchronously to the caller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SoundError {
    #[error("sound group has been unloaded")]
    Unloaded,

    #[error("unknown sprite: {0}")]
    UnknownSprite(String),

    #[error("unknown instance: {0}")]
    UnknownInstance(InstanceId),

    #[error("volume out of range 0.0..=1.0: {0}")]
    InvalidVolume(f32),

    #[error("rate must be positive and finite: {0}")]
    InvalidRate(f64),

    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for SoundError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Why a group failed to load. Delivered as the `loaderror` message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("no audio support available")]
    NoAudio,

    #[error("no codec support for selected audio sources")]
    NoCodecSupport,

    #[error("decoding audio data failed: {0}")]
    Decode(String),

    #[error("media element error (code {code})")]
    Element { code: u16 },
}

/// Why playback did not start. Delivered as the `playerror` message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("playback was refused: {0}")]
    Refused(String),

    #[error("playback did not start")]
    NotStarted,
}

/// Result alias for group and registry operations
pub type SoundResult<T> = Result<T, SoundError>;
