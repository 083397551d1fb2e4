//! Backend binding of one instance
//!
//! Both backends sit behind the same operations (start, halt, gain, rate,
//! position) so playback logic only branches where behavior really differs.

use super::{AudioDevice, BufferSource, DecodedAsset, GainNode, MediaElement, PlayRequest};

/// Source length requested for looping graph playback; the loop window
/// repeats until the source is stopped
pub(crate) const LOOP_SOURCE_SECS: f64 = 86_400.0;

/// Parameters for starting graph playback
#[derive(Debug, Clone, Copy)]
pub(crate) struct GraphStart {
    pub seek: f64,
    pub duration: f64,
    pub looping: bool,
    pub loop_start: f64,
    pub loop_end: f64,
    pub rate: f64,
    pub gain: f32,
}

/// Parameters for starting element playback
#[derive(Debug, Clone, Copy)]
pub(crate) struct ElementStart {
    pub seek: f64,
    pub muted: bool,
    pub volume: f32,
    pub rate: f64,
}

pub(crate) enum Voice {
    Graph {
        gain: Box<dyn GainNode>,
        source: Option<Box<dyn BufferSource>>,
    },
    Element(Box<dyn MediaElement>),
}

impl Voice {
    pub fn graph(gain: Box<dyn GainNode>) -> Self {
        Voice::Graph { gain, source: None }
    }

    #[inline]
    pub fn is_graph(&self) -> bool {
        matches!(self, Voice::Graph { .. })
    }

    /// Graph: fresh source from `asset`, started now. Returns the device time.
    pub fn start_graph(&mut self, device: &dyn AudioDevice, asset: &DecodedAsset, p: GraphStart) -> f64 {
        let now = device.current_time();
        let Voice::Graph { gain, source } = self else {
            return now;
        };

        if let Some(mut old) = source.take() {
            old.stop(now);
            old.disconnect();
        }

        let mut node = device.create_buffer_source(asset, &**gain);
        node.set_loop(p.looping, p.loop_start, p.loop_end);
        node.set_playback_rate(p.rate, now);
        gain.set_value_at_time(p.gain, now);
        let length = if p.looping { LOOP_SOURCE_SECS } else { p.duration };
        node.start(0.0, p.seek, length);
        *source = Some(node);
        now
    }

    /// Element: seek, apply parameters and request playback
    pub fn start_element(&mut self, p: ElementStart) -> PlayRequest {
        match self {
            Voice::Element(element) => {
                element.set_current_time(p.seek);
                element.set_muted(p.muted);
                element.set_volume(p.volume);
                element.set_playback_rate(p.rate);
                element.play()
            }
            Voice::Graph { .. } => PlayRequest::Refused("not a media element".into()),
        }
    }

    /// Stop sound output. Graph sources are discarded; elements pause.
    pub fn halt(&mut self, now: f64) {
        match self {
            Voice::Graph { source, .. } => {
                if let Some(mut node) = source.take() {
                    node.stop(now);
                    node.disconnect();
                }
            }
            Voice::Element(element) => {
                if !element.duration().is_nan() {
                    element.pause();
                }
            }
        }
    }

    #[inline]
    pub fn has_active_source(&self) -> bool {
        matches!(self, Voice::Graph { source: Some(_), .. })
    }

    /// Graph: gain value. Element: output volume.
    pub fn set_level(&mut self, value: f32, now: f64) {
        match self {
            Voice::Graph { gain, .. } => gain.set_value_at_time(value, now),
            Voice::Element(element) => element.set_volume(value),
        }
    }

    pub fn set_element_muted(&mut self, muted: bool) {
        if let Voice::Element(element) = self {
            element.set_muted(muted);
        }
    }

    pub fn set_rate(&mut self, rate: f64, now: f64) {
        match self {
            Voice::Graph { source, .. } => {
                if let Some(node) = source {
                    node.set_playback_rate(rate, now);
                }
            }
            Voice::Element(element) => element.set_playback_rate(rate),
        }
    }

    pub fn set_loop_window(&mut self, looping: bool, start: f64, stop: f64) {
        if let Voice::Graph {
            source: Some(node), ..
        } = self
        {
            node.set_loop(looping, start, stop);
        }
    }

    /// Native gain ramp (graph only)
    pub fn ramp(&mut self, from: f32, to: f32, now: f64, end: f64) {
        if let Voice::Graph { gain, .. } = self {
            gain.set_value_at_time(from, now);
            gain.linear_ramp_to_value_at_time(to, end);
        }
    }

    pub fn cancel_ramp(&mut self, now: f64) {
        if let Voice::Graph { gain, .. } = self {
            gain.cancel_scheduled_values(now);
        }
    }

    /// Element playback position; graph positions are derived from the clock
    pub fn element_position(&self) -> Option<f64> {
        match self {
            Voice::Element(element) => Some(element.current_time()),
            Voice::Graph { .. } => None,
        }
    }

    pub fn element(&self) -> Option<&dyn MediaElement> {
        match self {
            Voice::Element(element) => Some(element.as_ref()),
            Voice::Graph { .. } => None,
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut Box<dyn MediaElement>> {
        match self {
            Voice::Element(element) => Some(element),
            Voice::Graph { .. } => None,
        }
    }

    /// Tear down. Returns the element so the registry can pool it.
    pub fn release(self, now: f64) -> Option<Box<dyn MediaElement>> {
        match self {
            Voice::Graph { mut gain, source } => {
                if let Some(mut node) = source {
                    node.stop(now);
                    node.disconnect();
                }
                gain.disconnect();
                None
            }
            Voice::Element(mut element) => {
                element.pause();
                element.detach();
                element.clear_source();
                Some(element)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ElementFactory;
    use crate::backend::headless::{HeadlessBuffer, HeadlessDevice, HeadlessElements};
    use crate::config::Preload;
    use crate::scheduler::Scheduler;

    fn params(looping: bool) -> GraphStart {
        GraphStart {
            seek: 0.5,
            duration: 1.0,
            looping,
            loop_start: 0.5,
            loop_end: 1.5,
            rate: 1.0,
            gain: 0.8,
        }
    }

    #[test]
    fn test_graph_start_replaces_source() {
        let scheduler = Scheduler::new();
        let device = HeadlessDevice::new(&scheduler);
        let asset = DecodedAsset::new(3.0, HeadlessBuffer { url: "a.wav".into() });
        let mut voice = Voice::graph(device.create_gain());

        voice.start_graph(&device, &asset, params(false));
        voice.start_graph(&device, &asset, params(true));
        assert_eq!(device.active_sources(), 1);

        let starts = device.source_starts();
        assert_eq!(starts[0].duration, 1.0);
        assert_eq!(starts[1].duration, LOOP_SOURCE_SECS);
        assert_eq!(starts[1].offset, 0.5);

        voice.halt(0.0);
        assert!(!voice.has_active_source());
        assert!(voice.release(0.0).is_none());
        assert_eq!(device.live_gains(), 0);
    }

    #[test]
    fn test_element_release_returns_element() {
        let scheduler = Scheduler::new();
        let factory = HeadlessElements::new(&scheduler).with_asset("a.mp3", 2.0);
        let mut element = factory.create_element();
        element.set_source("a.mp3", Preload::Auto);
        let mut voice = Voice::Element(element);

        let started = voice.start_element(ElementStart {
            seek: 0.25,
            muted: false,
            volume: 0.5,
            rate: 1.0,
        });
        assert_eq!(started, PlayRequest::Started);
        assert_eq!(voice.element_position(), Some(0.25));

        let element = voice.release(0.0).unwrap();
        assert!(!element.has_source());
        assert!(element.is_paused());
    }
}
