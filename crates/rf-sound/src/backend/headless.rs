//! Software backend without audio output
//!
//! Both backends read time from the [`Scheduler`] clock, so playback position,
//! natural ends and decode completion follow `Scheduler::advance`. Nodes and
//! elements record what the engine asked of them for inspection.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{
    AudioDevice, BufferSource, DecodedAsset, ElementEvent, ElementFactory, GainNode,
    MediaElement, PlayRequest,
};
use crate::config::Preload;
use crate::scheduler::{Callback, Scheduler, TimerId, delay_from_ms};
use crate::source::ResolvedSource;

/// `MEDIA_ERR_SRC_NOT_SUPPORTED`
pub const ELEMENT_ERR_SRC_NOT_SUPPORTED: u16 = 4;

type DecodeDone = Callback<Result<DecodedAsset, String>>;

/// Payload stored in assets decoded by [`HeadlessDevice`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessBuffer {
    pub url: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPH
// ═══════════════════════════════════════════════════════════════════════════════

/// A buffer source start, as requested by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStart {
    pub url: String,
    pub offset: f64,
    pub duration: f64,
    pub looping: bool,
    pub loop_start: f64,
    pub loop_end: f64,
    pub rate: f64,
    pub at: f64,
}

#[derive(Debug, Default)]
struct GraphLog {
    starts: Vec<SourceStart>,
    active_sources: usize,
    gains_live: usize,
}

pub struct HeadlessDevice {
    scheduler: Scheduler,
    assets: Mutex<HashMap<String, f64>>,
    manual_decode: AtomicBool,
    pending_decodes: Mutex<Vec<(String, DecodeDone)>>,
    master_gain: Mutex<f32>,
    log: Arc<Mutex<GraphLog>>,
    decodes: AtomicUsize,
    suspends: AtomicUsize,
    resumes: AtomicUsize,
    closed: AtomicBool,
}

impl HeadlessDevice {
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            scheduler: scheduler.clone(),
            assets: Mutex::new(HashMap::new()),
            manual_decode: AtomicBool::new(false),
            pending_decodes: Mutex::new(Vec::new()),
            master_gain: Mutex::new(1.0),
            log: Arc::new(Mutex::new(GraphLog::default())),
            decodes: AtomicUsize::new(0),
            suspends: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a decodable asset
    pub fn with_asset(self, url: impl Into<String>, duration_secs: f64) -> Self {
        self.add_asset(url, duration_secs);
        self
    }

    pub fn add_asset(&self, url: impl Into<String>, duration_secs: f64) {
        self.assets.lock().insert(url.into(), duration_secs);
    }

    /// Hold decodes until [`complete_decodes`](Self::complete_decodes)
    pub fn set_manual_decode(&self, manual: bool) {
        self.manual_decode.store(manual, Ordering::SeqCst);
    }

    pub fn complete_decodes(&self) {
        let pending = std::mem::take(&mut *self.pending_decodes.lock());
        for (url, done) in pending {
            self.finish_decode(&url, done);
        }
    }

    pub fn fail_decodes(&self, message: &str) {
        let pending = std::mem::take(&mut *self.pending_decodes.lock());
        for (_, done) in pending {
            done.call(Err(message.to_string()));
        }
    }

    fn finish_decode(&self, url: &str, done: DecodeDone) {
        let duration = self.assets.lock().get(url).copied();
        match duration {
            Some(duration) => done.call(Ok(DecodedAsset::new(
                duration,
                HeadlessBuffer { url: url.to_string() },
            ))),
            None => done.call(Err(format!("unable to decode {url}"))),
        }
    }

    pub fn source_starts(&self) -> Vec<SourceStart> {
        self.log.lock().starts.clone()
    }

    /// Sources started and not yet stopped
    pub fn active_sources(&self) -> usize {
        self.log.lock().active_sources
    }

    /// Gain nodes created and not yet disconnected
    pub fn live_gains(&self) -> usize {
        self.log.lock().gains_live
    }

    pub fn master_gain(&self) -> f32 {
        *self.master_gain.lock()
    }

    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn suspend_count(&self) -> usize {
        self.suspends.load(Ordering::SeqCst)
    }

    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AudioDevice for HeadlessDevice {
    fn current_time(&self) -> f64 {
        self.scheduler.now_secs()
    }

    fn set_master_gain(&self, value: f32, _time: f64) {
        *self.master_gain.lock() = value;
    }

    fn create_gain(&self) -> Box<dyn GainNode> {
        self.log.lock().gains_live += 1;
        Box::new(HeadlessGain {
            log: Arc::clone(&self.log),
            value: 1.0,
            ramp: None,
            connected: true,
        })
    }

    fn create_buffer_source(
        &self,
        asset: &DecodedAsset,
        _output: &dyn GainNode,
    ) -> Box<dyn BufferSource> {
        let url = asset
            .buffer::<HeadlessBuffer>()
            .map(|b| b.url.clone())
            .unwrap_or_default();
        Box::new(HeadlessSource {
            log: Arc::clone(&self.log),
            url,
            looping: false,
            loop_start: 0.0,
            loop_end: 0.0,
            rate: 1.0,
            running: false,
        })
    }

    fn decode(&self, source: &ResolvedSource, done: DecodeDone) {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if self.manual_decode.load(Ordering::SeqCst) {
            self.pending_decodes.lock().push((source.url.clone(), done));
        } else {
            self.finish_decode(&source.url, done);
        }
    }

    fn suspend(&self, done: Callback<()>) {
        self.suspends.fetch_add(1, Ordering::SeqCst);
        done.call(());
    }

    fn resume(&self, done: Callback<()>) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        done.call(());
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct HeadlessGain {
    log: Arc<Mutex<GraphLog>>,
    value: f32,
    ramp: Option<(f32, f64)>,
    connected: bool,
}

impl GainNode for HeadlessGain {
    fn set_value_at_time(&mut self, value: f32, _time: f64) {
        self.value = value;
    }

    fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.ramp = Some((value, end_time));
    }

    fn cancel_scheduled_values(&mut self, _time: f64) {
        self.ramp = None;
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.log.lock().gains_live -= 1;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct HeadlessSource {
    log: Arc<Mutex<GraphLog>>,
    url: String,
    looping: bool,
    loop_start: f64,
    loop_end: f64,
    rate: f64,
    running: bool,
}

impl HeadlessSource {
    fn halt(&mut self) {
        if self.running {
            self.running = false;
            self.log.lock().active_sources -= 1;
        }
    }
}

impl BufferSource for HeadlessSource {
    fn set_loop(&mut self, looping: bool, loop_start: f64, loop_end: f64) {
        self.looping = looping;
        self.loop_start = loop_start;
        self.loop_end = loop_end;
    }

    fn set_playback_rate(&mut self, rate: f64, _time: f64) {
        self.rate = rate;
    }

    fn start(&mut self, when: f64, offset: f64, duration: f64) {
        let mut log = self.log.lock();
        log.starts.push(SourceStart {
            url: self.url.clone(),
            offset,
            duration,
            looping: self.looping,
            loop_start: self.loop_start,
            loop_end: self.loop_end,
            rate: self.rate,
            at: when,
        });
        if !self.running {
            self.running = true;
            log.active_sources += 1;
        }
    }

    fn stop(&mut self, _when: f64) {
        self.halt();
    }

    fn disconnect(&mut self) {
        self.halt();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// How headless elements answer `play()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayBehavior {
    Immediate,
    /// Pending, then resolved on the next tick
    Deferred,
    /// Pending, then rejected on the next tick
    Rejected(String),
    /// Refused synchronously
    Refused(String),
}

/// Observable element state
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSnapshot {
    pub src: Option<String>,
    pub ready: bool,
    pub paused: bool,
    pub current_time: f64,
    pub volume: f32,
    pub muted: bool,
    pub rate: f64,
    pub unlocked: bool,
}

struct ElementState {
    src: Option<String>,
    ready: bool,
    duration: f64,
    base_time: f64,
    playing_since: Option<f64>,
    rate: f64,
    paused: bool,
    ended: bool,
    volume: f32,
    muted: bool,
    unlocked: bool,
    events: Option<Callback<ElementEvent>>,
    end_timer: Option<TimerId>,
}

impl ElementState {
    fn position(&self, now: f64) -> f64 {
        let mut t = self.base_time;
        if let Some(since) = self.playing_since {
            t += (now - since) * self.rate;
        }
        if self.duration.is_finite() { t.min(self.duration) } else { t }
    }

    fn emit(&self, event: ElementEvent) {
        if let Some(events) = &self.events {
            events.call(event);
        }
    }
}

struct ElementEnv {
    scheduler: Scheduler,
    assets: Mutex<HashMap<String, f64>>,
    behavior: Mutex<PlayBehavior>,
    auto_ready: AtomicBool,
}

/// Element factory producing [`HeadlessElement`]s
pub struct HeadlessElements {
    env: Arc<ElementEnv>,
    elements: Mutex<Vec<Arc<Mutex<ElementState>>>>,
}

impl HeadlessElements {
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            env: Arc::new(ElementEnv {
                scheduler: scheduler.clone(),
                assets: Mutex::new(HashMap::new()),
                behavior: Mutex::new(PlayBehavior::Immediate),
                auto_ready: AtomicBool::new(true),
            }),
            elements: Mutex::new(Vec::new()),
        }
    }

    /// Register a playable url; `f64::INFINITY` models a live stream
    pub fn with_asset(self, url: impl Into<String>, duration_secs: f64) -> Self {
        self.env.assets.lock().insert(url.into(), duration_secs);
        self
    }

    pub fn set_play_behavior(&self, behavior: PlayBehavior) {
        *self.env.behavior.lock() = behavior;
    }

    /// When off, elements stay unready until [`make_ready`](Self::make_ready)
    pub fn set_auto_ready(&self, auto: bool) {
        self.env.auto_ready.store(auto, Ordering::SeqCst);
    }

    /// Finish buffering every element pointing at `url`
    pub fn make_ready(&self, url: &str) {
        let duration = self.env.assets.lock().get(url).copied();
        for element in self.elements.lock().iter() {
            let mut state = element.lock();
            if state.src.as_deref() == Some(url) && !state.ready {
                match duration {
                    Some(d) => {
                        state.ready = true;
                        state.duration = d;
                        state.emit(ElementEvent::CanPlayThrough);
                    }
                    None => state.emit(ElementEvent::Error(ELEMENT_ERR_SRC_NOT_SUPPORTED)),
                }
            }
        }
    }

    pub fn created_count(&self) -> usize {
        self.elements.lock().len()
    }

    pub fn snapshots(&self) -> Vec<ElementSnapshot> {
        let now = self.env.scheduler.now_secs();
        self.elements
            .lock()
            .iter()
            .map(|element| {
                let state = element.lock();
                ElementSnapshot {
                    src: state.src.clone(),
                    ready: state.ready,
                    paused: state.paused,
                    current_time: state.position(now),
                    volume: state.volume,
                    muted: state.muted,
                    rate: state.rate,
                    unlocked: state.unlocked,
                }
            })
            .collect()
    }
}

impl ElementFactory for HeadlessElements {
    fn create_element(&self) -> Box<dyn MediaElement> {
        let shared = Arc::new(Mutex::new(ElementState {
            src: None,
            ready: false,
            duration: f64::NAN,
            base_time: 0.0,
            playing_since: None,
            rate: 1.0,
            paused: true,
            ended: false,
            volume: 1.0,
            muted: false,
            unlocked: false,
            events: None,
            end_timer: None,
        }));
        self.elements.lock().push(Arc::clone(&shared));
        Box::new(HeadlessElement {
            shared,
            env: Arc::clone(&self.env),
        })
    }
}

pub struct HeadlessElement {
    shared: Arc<Mutex<ElementState>>,
    env: Arc<ElementEnv>,
}

impl HeadlessElement {
    fn now(&self) -> f64 {
        self.env.scheduler.now_secs()
    }

    /// Fold elapsed playback into the base position
    fn settle(&self, state: &mut ElementState) {
        state.base_time = state.position(self.now());
        if state.playing_since.is_some() {
            state.playing_since = Some(self.now());
        }
    }

    fn disarm(&self, state: &mut ElementState) {
        if let Some(timer) = state.end_timer.take() {
            self.env.scheduler.clear(timer);
        }
    }

    fn arm_end(&self, state: &mut ElementState) {
        self.disarm(state);
        if state.playing_since.is_none() || !state.duration.is_finite() {
            return;
        }
        let remaining_ms = (state.duration - state.base_time).max(0.0) * 1000.0 / state.rate;
        let Some(delay) = delay_from_ms(remaining_ms) else {
            return;
        };
        let shared = Arc::clone(&self.shared);
        let timer = self.env.scheduler.set_timeout(delay, move || {
            let mut state = shared.lock();
            state.end_timer = None;
            state.base_time = state.duration;
            state.playing_since = None;
            state.paused = true;
            state.ended = true;
            state.emit(ElementEvent::Ended);
        });
        state.end_timer = Some(timer);
    }

    fn begin(&self, state: &mut ElementState) {
        state.paused = false;
        state.ended = false;
        state.playing_since = Some(self.now());
        self.arm_end(state);
    }
}

impl MediaElement for HeadlessElement {
    fn attach(&mut self, events: Callback<ElementEvent>) {
        self.shared.lock().events = Some(events);
    }

    fn detach(&mut self) {
        self.shared.lock().events = None;
    }

    fn set_source(&mut self, url: &str, _preload: Preload) {
        let mut state = self.shared.lock();
        self.disarm(&mut state);
        state.src = Some(url.to_string());
        state.ready = false;
        state.duration = f64::NAN;
        state.base_time = 0.0;
        state.playing_since = None;
        state.paused = true;

        if !self.env.auto_ready.load(Ordering::SeqCst) {
            return;
        }
        match self.env.assets.lock().get(url).copied() {
            Some(duration) => {
                state.ready = true;
                state.duration = duration;
                state.emit(ElementEvent::CanPlayThrough);
            }
            None => state.emit(ElementEvent::Error(ELEMENT_ERR_SRC_NOT_SUPPORTED)),
        }
    }

    fn clear_source(&mut self) {
        let mut state = self.shared.lock();
        self.disarm(&mut state);
        state.src = None;
        state.ready = false;
        state.duration = f64::NAN;
        state.playing_since = None;
        state.paused = true;
    }

    fn has_source(&self) -> bool {
        self.shared.lock().src.is_some()
    }

    fn is_ready(&self) -> bool {
        self.shared.lock().ready
    }

    fn duration(&self) -> f64 {
        self.shared.lock().duration
    }

    fn current_time(&self) -> f64 {
        self.shared.lock().position(self.now())
    }

    fn set_current_time(&mut self, secs: f64) {
        let mut state = self.shared.lock();
        state.base_time = secs;
        if state.playing_since.is_some() {
            state.playing_since = Some(self.now());
        }
        self.arm_end(&mut state);
    }

    fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    fn is_ended(&self) -> bool {
        self.shared.lock().ended
    }

    fn play(&mut self) -> PlayRequest {
        let behavior = self.env.behavior.lock().clone();
        let mut state = self.shared.lock();
        match behavior {
            PlayBehavior::Immediate => {
                self.begin(&mut state);
                PlayRequest::Started
            }
            PlayBehavior::Deferred => {
                self.begin(&mut state);
                state.emit(ElementEvent::PlayResolved);
                PlayRequest::Pending
            }
            PlayBehavior::Rejected(reason) => {
                state.emit(ElementEvent::PlayRejected(reason));
                PlayRequest::Pending
            }
            PlayBehavior::Refused(reason) => PlayRequest::Refused(reason),
        }
    }

    fn pause(&mut self) {
        let mut state = self.shared.lock();
        self.settle(&mut state);
        self.disarm(&mut state);
        state.playing_since = None;
        state.paused = true;
    }

    fn set_volume(&mut self, volume: f32) {
        self.shared.lock().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.shared.lock().muted = muted;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        let mut state = self.shared.lock();
        self.settle(&mut state);
        state.rate = rate;
        self.arm_end(&mut state);
    }

    fn unlock(&mut self) {
        self.shared.lock().unlocked = true;
    }

    fn is_unlocked(&self) -> bool {
        self.shared.lock().unlocked
    }
}
