//! Runtime capabilities the engine plays through
//!
//! Two backends exist:
//!
//! - **Audio graph** ([`AudioDevice`]): decoded buffers are played by one-shot
//!   buffer-source nodes routed through a per-instance [`GainNode`] into the
//!   device master gain. Sample-accurate, supports native gain ramps.
//! - **Media element** ([`MediaElement`]): one streaming element per instance.
//!   Used for long files, streams and runtimes without a graph.
//!
//! Hosts implement these traits over their platform (a browser bridge, a
//! native mixer). [`headless`] implements them in software for tests and
//! servers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::config::Preload;
use crate::scheduler::Callback;
use crate::source::ResolvedSource;

pub mod headless;
pub(crate) mod voice;

// ═══════════════════════════════════════════════════════════════════════════════
// CODECS
// ═══════════════════════════════════════════════════════════════════════════════

/// Codec predicate: can the runtime decode this extension?
pub trait CodecSupport: Send + Sync {
    fn supports(&self, extension: &str) -> bool;
}

impl<F> CodecSupport for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn supports(&self, extension: &str) -> bool {
        self(extension)
    }
}

/// Fixed list of supported extensions
#[derive(Debug, Clone, Default)]
pub struct CodecTable {
    extensions: Vec<String>,
}

impl CodecTable {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Formats commonly decodable by desktop and mobile runtimes
    pub fn common() -> Self {
        Self::new([
            "mp3", "mpeg", "opus", "ogg", "oga", "wav", "aac", "caf", "m4a", "m4b", "mp4",
            "weba", "webm", "flac",
        ])
    }
}

impl CodecSupport for CodecTable {
    fn supports(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUDIO GRAPH
// ═══════════════════════════════════════════════════════════════════════════════

/// Fully decoded asset, shareable between groups
#[derive(Clone)]
pub struct DecodedAsset {
    duration: f64,
    buffer: Arc<dyn Any + Send + Sync>,
}

impl DecodedAsset {
    pub fn new(duration_secs: f64, buffer: impl Any + Send + Sync) -> Self {
        Self {
            duration: duration_secs,
            buffer: Arc::new(buffer),
        }
    }

    /// Length in seconds
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Backend-specific sample storage
    pub fn buffer<T: Any>(&self) -> Option<&T> {
        self.buffer.downcast_ref::<T>()
    }
}

impl fmt::Debug for DecodedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedAsset")
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

/// Per-instance gain stage, connected to the device master gain
pub trait GainNode: Send {
    fn set_value_at_time(&mut self, value: f32, time: f64);
    fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64);
    fn cancel_scheduled_values(&mut self, time: f64);
    fn disconnect(&mut self);
    /// Concrete node access for devices wiring sources into this gain
    fn as_any(&self) -> &dyn Any;
}

/// One-shot buffer player. Discarded after stop.
pub trait BufferSource: Send {
    fn set_loop(&mut self, looping: bool, loop_start: f64, loop_end: f64);
    fn set_playback_rate(&mut self, rate: f64, time: f64);
    /// Start at device time `when`, reading from `offset` for `duration` seconds
    fn start(&mut self, when: f64, offset: f64, duration: f64);
    fn stop(&mut self, when: f64);
    fn disconnect(&mut self);
}

/// Audio-graph device
pub trait AudioDevice: Send + Sync {
    /// Device clock in seconds
    fn current_time(&self) -> f64;
    fn set_master_gain(&self, value: f32, time: f64);
    fn create_gain(&self) -> Box<dyn GainNode>;
    /// Source node feeding `output`
    fn create_buffer_source(
        &self,
        asset: &DecodedAsset,
        output: &dyn GainNode,
    ) -> Box<dyn BufferSource>;
    fn decode(&self, source: &ResolvedSource, done: Callback<Result<DecodedAsset, String>>);
    fn suspend(&self, done: Callback<()>);
    fn resume(&self, done: Callback<()>);
    fn close(&self) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEDIA ELEMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of asking an element to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayRequest {
    Started,
    /// Resolution arrives later as `PlayResolved` / `PlayRejected`
    Pending,
    Refused(String),
}

/// Signals an element reports back through its attached callback
#[derive(Debug, Clone, PartialEq)]
pub enum ElementEvent {
    CanPlayThrough,
    Ended,
    Error(u16),
    PlayResolved,
    PlayRejected(String),
}

pub trait MediaElement: Send {
    fn attach(&mut self, events: Callback<ElementEvent>);
    fn detach(&mut self);
    /// Point at `url` and begin loading
    fn set_source(&mut self, url: &str, preload: Preload);
    /// Drop the source to release the network stream
    fn clear_source(&mut self);
    fn has_source(&self) -> bool;
    fn is_ready(&self) -> bool;
    /// Seconds; NaN while unknown, infinite for live streams
    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, secs: f64);
    fn is_paused(&self) -> bool;
    fn is_ended(&self) -> bool;
    fn play(&mut self) -> PlayRequest;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn set_muted(&mut self, muted: bool);
    fn set_playback_rate(&mut self, rate: f64);
    /// Run the unlock ritual (called from a user gesture)
    fn unlock(&mut self);
    fn is_unlocked(&self) -> bool;
}

pub trait ElementFactory: Send + Sync {
    fn create_element(&self) -> Box<dyn MediaElement>;
}
