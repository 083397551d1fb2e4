//! Sound Groups
//!
//! A group owns one audio asset, its sprite table, and a pool of instances
//! playing it. All public operations go through the `SoundGroup` handle.
//!
//! ## Lifecycle
//!
//! ```text
//!   new() ──▶ Unloaded ──load()──▶ Loading ──decode / canplaythrough──▶ Loaded
//!                 ▲                                                     │
//!                 └──────────────────── unload() ◀──────────────────────┘
//! ```
//!
//! While the group is not `Loaded`, or a play commit is pending, commands are
//! recorded in the action queue and replayed in order once the group can run
//! them.
//!
//! ## Thread Safety Design
//!
//! Group state lives behind one mutex. Events, timers and backend callbacks
//! re-enter through the scheduler, never inline, so a listener may call any
//! group method. Lock order is group → registry → scheduler.

mod params;
mod playback;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::action_queue::{ActionQueue, DeferredCommand, PlayTarget};
use crate::backend::voice::Voice;
use crate::backend::{DecodedAsset, ElementEvent};
use crate::config::{Preload, SoundConfig};
use crate::error::{LoadError, SoundError, SoundResult};
use crate::events::{ListenerFn, ListenerId, ListenerSet, SoundEvent, SoundEventKind};
use crate::instance::{InstanceDefaults, InstanceId, InstanceStatus, SoundInstance};
use crate::registry::{DeviceRegistry, GroupId};
use crate::scheduler::Callback;
use crate::source::{ResolvedSource, SourceCandidate, select_source};
use crate::sprite::SpriteTable;

pub(crate) use playback::PlayOutcome;

/// Load progress of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum LoadState {
    #[default]
    Unloaded = 0,
    Loading = 1,
    Loaded = 2,
}

/// Playback backend a group runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Backend {
    Graph = 0,
    Element = 1,
}

/// A start waiting on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingStart {
    pub id: InstanceId,
    pub internal: bool,
}

/// Outcome of running one deferred command
enum Progress {
    /// Completed synchronously; pop and continue
    Done,
    /// Completion arrives with the command's trigger event
    Awaiting,
    /// Group cannot run it yet; retry on a later drain
    Blocked,
}

// ═══════════════════════════════════════════════════════════════════════════════
// GROUP STATE
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) struct GroupInner {
    pub state: LoadState,
    pub destroyed: bool,
    pub backend: Backend,
    pub prefer_element: bool,
    pub candidates: Vec<SourceCandidate>,
    pub source: Option<ResolvedSource>,
    pub asset: Option<DecodedAsset>,
    pub load_attempt: u64,
    pub duration: f64,
    pub sprites: SpriteTable,
    pub volume: f32,
    pub rate: f64,
    pub looping: bool,
    pub muted: bool,
    pub pool: usize,
    pub preload: Preload,
    pub instances: Vec<SoundInstance>,
    pub queue: ActionQueue,
    pub listeners: ListenerSet,
    /// A play commit is pending on the backend
    pub play_lock: bool,
    pub awaiting_resume: Vec<PendingStart>,
    pub awaiting_ready: Vec<PendingStart>,
    pub awaiting_element_play: Vec<PendingStart>,
    next_token: u64,
}

impl GroupInner {
    fn from_config(config: &SoundConfig) -> Self {
        Self {
            state: LoadState::Unloaded,
            destroyed: false,
            backend: if config.html5 {
                Backend::Element
            } else {
                Backend::Graph
            },
            prefer_element: config.html5,
            candidates: config.candidates(),
            source: None,
            asset: None,
            load_attempt: 0,
            duration: 0.0,
            sprites: SpriteTable::from_config(&config.sprite),
            volume: config.volume,
            rate: config.rate,
            looping: config.looping,
            muted: config.mute,
            pool: config.pool,
            preload: config.preload,
            instances: Vec::new(),
            queue: ActionQueue::new(),
            listeners: ListenerSet::default(),
            play_lock: false,
            awaiting_resume: Vec::new(),
            awaiting_ready: Vec::new(),
            awaiting_element_play: Vec::new(),
            next_token: 0,
        }
    }

    /// Commands must wait in the queue
    #[inline]
    pub fn must_defer(&self) -> bool {
        self.state != LoadState::Loaded || self.play_lock
    }

    #[inline]
    pub fn index_of(&self, id: InstanceId) -> Option<usize> {
        self.instances.iter().position(|i| i.id == id)
    }

    /// One instance, or every instance when `id` is `None`
    pub fn target_ids(&self, id: Option<InstanceId>) -> Vec<InstanceId> {
        match id {
            Some(id) => self.index_of(id).map(|_| vec![id]).unwrap_or_default(),
            None => self.instances.iter().map(|i| i.id).collect(),
        }
    }

    pub fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    #[inline]
    pub fn is_graph(&self) -> bool {
        self.backend == Backend::Graph
    }

    /// Recompute the play lock from outstanding starts
    pub fn refresh_play_lock(&mut self) {
        self.play_lock = !(self.awaiting_resume.is_empty()
            && self.awaiting_ready.is_empty()
            && self.awaiting_element_play.is_empty());
    }
}

pub(crate) struct GroupShared {
    id: GroupId,
    registry: DeviceRegistry,
    inner: Mutex<GroupInner>,
}

impl Drop for GroupShared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.destroyed {
            return;
        }
        let scheduler = self.registry.scheduler().clone();
        let now = self.registry.clock();
        for mut inst in inner.instances.drain(..) {
            if let Some(fade) = inst.fade.take() {
                if let Some(timer) = fade.timer {
                    scheduler.clear(timer);
                }
            }
            if let Some(crate::instance::EndWatch::Timer { timer, .. }) = inst.end_watch.take() {
                scheduler.clear(timer);
            }
            if let Some(element) = inst.voice.take().and_then(|v| v.release(now)) {
                self.registry.release_element(element);
            }
        }
        self.registry.release_group(self.id);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Handle to one sound group. Clones share the same group.
#[derive(Clone)]
pub struct SoundGroup {
    shared: Arc<GroupShared>,
}

impl SoundGroup {
    /// Create a group. Loads immediately unless `preload` is `none`.
    pub fn new(registry: &DeviceRegistry, config: SoundConfig) -> SoundResult<Self> {
        config.validate()?;

        let mut inner = GroupInner::from_config(&config);
        if config.autoplay {
            inner.queue.enqueue(DeferredCommand::Play(PlayTarget::Default));
        }

        let shared = Arc::new_cyclic(|weak: &Weak<GroupShared>| GroupShared {
            id: registry.register_group(weak.clone()),
            registry: registry.clone(),
            inner: Mutex::new(inner),
        });
        let group = Self { shared };
        log::debug!(
            "[Sound] Group {} created ({} source candidates)",
            group.id(),
            config.sources.len()
        );

        if config.preload.loads_eagerly() {
            group.load()?;
        }
        Ok(group)
    }

    pub(crate) fn from_shared(shared: Arc<GroupShared>) -> Self {
        Self { shared }
    }

    #[inline]
    pub fn id(&self) -> GroupId {
        self.shared.id
    }

    #[inline]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.shared.registry
    }

    /// Current load state; `Unloaded` after `unload()`
    pub fn state(&self) -> LoadState {
        self.shared.inner.lock().state
    }

    pub fn backend(&self) -> SoundResult<Backend> {
        Ok(self.lock_live()?.backend)
    }

    /// Selected source, once `load()` found a playable one
    pub fn source(&self) -> SoundResult<Option<ResolvedSource>> {
        Ok(self.lock_live()?.source.clone())
    }

    fn lock_live(&self) -> SoundResult<MutexGuard<'_, GroupInner>> {
        let guard = self.shared.inner.lock();
        if guard.destroyed {
            Err(SoundError::Unloaded)
        } else {
            Ok(guard)
        }
    }

    fn downgrade(&self) -> Weak<GroupShared> {
        Arc::downgrade(&self.shared)
    }

    fn upgrade(weak: &Weak<GroupShared>) -> Option<SoundGroup> {
        weak.upgrade().map(Self::from_shared)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOADING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Select a source and start decoding / preloading it.
    ///
    /// Failures are reported through `loaderror`. Calling again after a
    /// failure retries.
    pub fn load(&self) -> SoundResult<()> {
        let mut guard = self.lock_live()?;
        let inner = &mut *guard;
        if inner.state == LoadState::Loaded {
            return Ok(());
        }

        let registry = &self.shared.registry;
        if registry.no_audio() {
            self.emit_load_error(LoadError::NoAudio);
            return Ok(());
        }

        let source = match select_source(&inner.candidates, |ext| registry.codecs(ext)) {
            Ok(source) => source,
            Err(err) => {
                self.emit_load_error(err);
                return Ok(());
            }
        };

        let blocked_on_secure_page = source.is_insecure() && registry.secure_transport();
        inner.backend = if !inner.prefer_element && registry.has_device() && !blocked_on_secure_page
        {
            Backend::Graph
        } else {
            Backend::Element
        };
        if inner.backend == Backend::Element && !registry.has_elements() {
            self.emit_load_error(LoadError::NoAudio);
            return Ok(());
        }

        registry.bind_source(self.id(), &source.url);
        inner.source = Some(source.clone());
        inner.state = LoadState::Loading;
        inner.load_attempt += 1;
        log::debug!(
            "[Sound] Group {} loading {} via {:?}",
            self.id(),
            source.url,
            inner.backend
        );

        // Element backends preload through the first instance's element
        if inner.instances.is_empty() {
            self.create_instance(inner);
        } else {
            for idx in 0..inner.instances.len() {
                match inner.instances[idx].voice.as_mut().and_then(Voice::element_mut) {
                    // Retry after a failed preload
                    Some(element) => element.set_source(&source.url, inner.preload),
                    None => self.ensure_voice(inner, idx),
                }
            }
        }

        if inner.backend == Backend::Graph {
            if let Some(asset) = registry.cached_asset(&source.url) {
                let duration = asset.duration();
                self.finish_load(inner, duration, Some(asset));
            } else if let Some(device) = registry.device() {
                let weak = self.downgrade();
                let attempt = inner.load_attempt;
                let done = Callback::new(
                    registry.scheduler(),
                    move |result: Result<DecodedAsset, String>| {
                        if let Some(group) = Self::upgrade(&weak) {
                            group.on_decoded(attempt, result);
                        }
                    },
                );
                device.decode(&source, done);
            }
        }
        Ok(())
    }

    fn on_decoded(&self, attempt: u64, result: Result<DecodedAsset, String>) {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        if inner.destroyed || attempt != inner.load_attempt || inner.state == LoadState::Loaded {
            return;
        }

        match result {
            Ok(asset) => {
                if let Some(source) = &inner.source {
                    self.shared.registry.store_asset(&source.url, asset.clone());
                }
                let duration = asset.duration();
                self.finish_load(inner, duration, Some(asset));
            }
            Err(message) => {
                log::warn!("[Sound] Group {} decode failed: {}", self.id(), message);
                Self::abandon_load(inner);
                self.emit_load_error(LoadError::Decode(message));
            }
        }
    }

    /// Asset duration known: the group becomes playable
    fn finish_load(&self, inner: &mut GroupInner, duration: f64, asset: Option<DecodedAsset>) {
        inner.duration = duration;
        inner.asset = asset;
        inner.sprites.ensure_default(duration);
        inner.state = LoadState::Loaded;
        log::info!(
            "[Sound] Group {} loaded ({:.2}s, {} sprites)",
            self.id(),
            duration,
            inner.sprites.len()
        );

        self.post_drain();
        self.emit(SoundEventKind::Load, None, None);
    }

    /// A load attempt failed: back to `Unloaded` until `load()` is called again
    fn abandon_load(inner: &mut GroupInner) {
        inner.state = LoadState::Unloaded;
        inner.asset = None;
        inner.awaiting_ready.clear();
        inner.refresh_play_lock();
    }

    /// Element durations are reported rounded up to 0.1 s
    fn element_duration(raw: f64) -> f64 {
        (raw * 10.0).ceil() / 10.0
    }

    /// Release every resource and make the group unusable.
    ///
    /// Playing instances are stopped first (emitting `stop`). Every later
    /// call on this group returns [`SoundError::Unloaded`].
    pub fn unload(&self) -> SoundResult<()> {
        let mut guard = self.lock_live()?;
        let inner = &mut *guard;

        let playing: Vec<InstanceId> = inner
            .instances
            .iter()
            .filter(|i| !i.paused)
            .map(|i| i.id)
            .collect();
        for id in playing {
            self.stop_locked(inner, Some(id), false);
        }

        let scheduler = self.shared.registry.scheduler().clone();
        let now = self.shared.registry.clock();
        for mut inst in inner.instances.drain(..) {
            if let Some(fade) = inst.fade.take() {
                if let Some(timer) = fade.timer {
                    scheduler.clear(timer);
                }
            }
            if let Some(crate::instance::EndWatch::Timer { timer, .. }) = inst.end_watch.take() {
                scheduler.clear(timer);
            }
            if let Some(timer) = inst.recheck.take() {
                scheduler.clear(timer);
            }
            if let Some(element) = inst.voice.take().and_then(|v| v.release(now)) {
                self.shared.registry.release_element(element);
            }
        }

        inner.queue.clear();
        inner.awaiting_resume.clear();
        inner.awaiting_ready.clear();
        inner.awaiting_element_play.clear();
        inner.play_lock = false;
        inner.asset = None;
        inner.state = LoadState::Unloaded;
        inner.destroyed = true;
        drop(guard);

        self.shared.registry.release_group(self.id());
        self.shared.registry.schedule_auto_suspend();

        // Listeners stay until events emitted above are delivered
        let weak = self.downgrade();
        scheduler.post(move || {
            if let Some(group) = Self::upgrade(&weak) {
                group.shared.inner.lock().listeners.clear_all();
            }
        });
        log::info!("[Sound] Group {} unloaded", self.id());
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INSTANCES
    // ═══════════════════════════════════════════════════════════════════════════

    fn create_instance(&self, inner: &mut GroupInner) -> usize {
        let id = self.shared.registry.next_instance_id();
        let defaults = InstanceDefaults {
            muted: inner.muted,
            looping: inner.looping,
            volume: inner.volume,
            rate: inner.rate,
        };
        let voice = self.make_voice(inner, id);
        inner.instances.push(SoundInstance::new(id, defaults, voice));
        log::debug!("[Sound] Group {} created instance {}", self.id(), id);
        inner.instances.len() - 1
    }

    fn ensure_voice(&self, inner: &mut GroupInner, idx: usize) {
        if inner.instances[idx].voice.is_none() {
            let id = inner.instances[idx].id;
            inner.instances[idx].voice = self.make_voice(inner, id);
        }
    }

    /// Bind backend resources. `None` until a source is selected.
    fn make_voice(&self, inner: &GroupInner, id: InstanceId) -> Option<Voice> {
        let source = inner.source.as_ref()?;
        let registry = &self.shared.registry;
        match inner.backend {
            Backend::Graph => {
                let device = registry.device()?;
                let mut gain = device.create_gain();
                let level = if inner.muted { 0.0 } else { inner.volume };
                gain.set_value_at_time(level, device.current_time());
                Some(Voice::graph(gain))
            }
            Backend::Element => {
                let mut element = registry.acquire_element()?;
                let (global_volume, global_muted) = registry.global_state();
                element.attach(self.element_callback(id));
                element.set_muted(global_muted || inner.muted);
                element.set_volume(inner.volume * global_volume);
                element.set_source(&source.url, inner.preload);
                Some(Voice::Element(element))
            }
        }
    }

    fn element_callback(&self, id: InstanceId) -> Callback<ElementEvent> {
        let weak = self.downgrade();
        Callback::new(self.shared.registry.scheduler(), move |event: ElementEvent| {
            if let Some(group) = Self::upgrade(&weak) {
                group.on_element_event(id, event);
            }
        })
    }

    /// Take an instance for new playback.
    ///
    /// Ended instances beyond the pool size are discarded newest first; then
    /// the oldest ended instance is recycled, or a new one is created.
    fn obtain_instance(&self, inner: &mut GroupInner) -> usize {
        let limit = inner.pool;
        if inner.instances.len() >= limit {
            let mut ended = inner.instances.iter().filter(|i| i.ended).count();
            let mut idx = inner.instances.len();
            while idx > 0 && inner.instances.len() > limit && ended > 0 {
                idx -= 1;
                if inner.instances[idx].ended {
                    let inst = inner.instances.remove(idx);
                    log::debug!("[Sound] Group {} evicted instance {}", self.id(), inst.id);
                    self.discard_instance(inst);
                    ended -= 1;
                }
            }
        }

        if let Some(idx) = inner.instances.iter().position(|i| i.ended) {
            inner.instances[idx].reset();
            self.ensure_voice(inner, idx);
            return idx;
        }
        self.create_instance(inner)
    }

    fn discard_instance(&self, mut inst: SoundInstance) {
        let scheduler = self.shared.registry.scheduler();
        if let Some(fade) = inst.fade.take() {
            if let Some(timer) = fade.timer {
                scheduler.clear(timer);
            }
        }
        if let Some(crate::instance::EndWatch::Timer { timer, .. }) = inst.end_watch.take() {
            scheduler.clear(timer);
        }
        if let Some(element) = inst
            .voice
            .take()
            .and_then(|v| v.release(self.shared.registry.clock()))
        {
            self.shared.registry.release_element(element);
        }
    }

    /// Status of every instance, in creation order
    pub fn instances(&self) -> SoundResult<Vec<InstanceStatus>> {
        Ok(self
            .lock_live()?
            .instances
            .iter()
            .map(SoundInstance::status)
            .collect())
    }

    pub fn instance(&self, id: InstanceId) -> SoundResult<Option<InstanceStatus>> {
        let inner = self.lock_live()?;
        Ok(inner.index_of(id).map(|idx| inner.instances[idx].status()))
    }

    pub fn instance_ids(&self) -> SoundResult<Vec<InstanceId>> {
        Ok(self.lock_live()?.target_ids(None))
    }

    /// Commands waiting in the action queue
    pub fn pending_actions(&self) -> SoundResult<usize> {
        Ok(self.lock_live()?.queue.len())
    }

    /// Sprite length for an instance, else the asset duration (seconds)
    pub fn duration(&self, id: Option<InstanceId>) -> SoundResult<f64> {
        let inner = self.lock_live()?;
        let sprite_len = id
            .and_then(|id| inner.index_of(id))
            .and_then(|idx| inner.sprites.get(&inner.instances[idx].sprite))
            .map(|sprite| sprite.duration_secs());
        Ok(sprite_len.unwrap_or(inner.duration))
    }

    /// Is one instance, or any instance, playing?
    pub fn playing(&self, id: Option<InstanceId>) -> SoundResult<bool> {
        let inner = self.lock_live()?;
        Ok(match id {
            Some(id) => inner
                .index_of(id)
                .is_some_and(|idx| !inner.instances[idx].paused),
            None => inner.instances.iter().any(|i| !i.paused),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn on(
        &self,
        kind: SoundEventKind,
        listener: impl Fn(&SoundGroup, &SoundEvent) + Send + Sync + 'static,
    ) -> SoundResult<ListenerId> {
        self.listen(kind, None, false, Arc::new(listener))
    }

    /// Listen for events of one instance (`load` always reaches it)
    pub fn on_instance(
        &self,
        kind: SoundEventKind,
        id: InstanceId,
        listener: impl Fn(&SoundGroup, &SoundEvent) + Send + Sync + 'static,
    ) -> SoundResult<ListenerId> {
        self.listen(kind, Some(id), false, Arc::new(listener))
    }

    pub fn once(
        &self,
        kind: SoundEventKind,
        listener: impl Fn(&SoundGroup, &SoundEvent) + Send + Sync + 'static,
    ) -> SoundResult<ListenerId> {
        self.listen(kind, None, true, Arc::new(listener))
    }

    pub fn once_instance(
        &self,
        kind: SoundEventKind,
        id: InstanceId,
        listener: impl Fn(&SoundGroup, &SoundEvent) + Send + Sync + 'static,
    ) -> SoundResult<ListenerId> {
        self.listen(kind, Some(id), true, Arc::new(listener))
    }

    fn listen(
        &self,
        kind: SoundEventKind,
        instance: Option<InstanceId>,
        once: bool,
        listener: ListenerFn,
    ) -> SoundResult<ListenerId> {
        Ok(self
            .lock_live()?
            .listeners
            .add(kind, listener, instance, once))
    }

    /// Remove one listener, or every listener of `kind` when `id` is `None`
    pub fn off(&self, kind: SoundEventKind, id: Option<ListenerId>) -> SoundResult<()> {
        let mut inner = self.lock_live()?;
        match id {
            Some(id) => {
                inner.listeners.remove(kind, id);
            }
            None => inner.listeners.clear(kind),
        }
        Ok(())
    }

    pub fn off_all(&self) -> SoundResult<()> {
        self.lock_live()?.listeners.clear_all();
        Ok(())
    }

    /// Deliver on the next scheduler tick
    fn emit(&self, kind: SoundEventKind, instance: Option<InstanceId>, message: Option<String>) {
        let weak = self.downgrade();
        let event = SoundEvent {
            kind,
            instance,
            message,
        };
        self.shared.registry.scheduler().post(move || {
            if let Some(group) = Self::upgrade(&weak) {
                group.dispatch(event);
            }
        });
    }

    fn emit_load_error(&self, err: LoadError) {
        log::warn!("[Sound] Group {} load error: {}", self.id(), err);
        self.emit(SoundEventKind::LoadError, None, Some(err.to_string()));
    }

    fn dispatch(&self, event: SoundEvent) {
        let callbacks = self.shared.inner.lock().listeners.take_matching(&event);
        for callback in callbacks {
            callback(self, &event);
        }
        self.drain_queue(Some(event.kind));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACTION QUEUE
    // ═══════════════════════════════════════════════════════════════════════════

    fn post_drain(&self) {
        let weak = self.downgrade();
        self.shared.registry.scheduler().post(move || {
            if let Some(group) = Self::upgrade(&weak) {
                group.drain_queue(None);
            }
        });
    }

    fn drain_queue(&self, fired: Option<SoundEventKind>) {
        let mut fired = fired;
        loop {
            let command = {
                let mut inner = self.shared.inner.lock();
                if inner.destroyed {
                    return;
                }
                inner.queue.next_ready(fired.take())
            };
            let Some(command) = command else {
                return;
            };

            let progress = self.run_deferred(command);
            let mut inner = self.shared.inner.lock();
            match progress {
                Progress::Done => inner.queue.complete_head(),
                Progress::Awaiting => return,
                Progress::Blocked => {
                    inner.queue.release_head();
                    return;
                }
            }
        }
    }

    fn run_deferred(&self, command: DeferredCommand) -> Progress {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        if inner.destroyed {
            return Progress::Done;
        }
        if inner.must_defer() {
            return Progress::Blocked;
        }

        log::debug!("[Sound] Group {} running deferred {:?}", self.id(), command);
        match command {
            DeferredCommand::Play(target) => match self.play_locked(inner, target, false) {
                Ok(PlayOutcome::Started(_)) | Ok(PlayOutcome::Pending(_)) => Progress::Awaiting,
                Ok(_) => Progress::Done,
                Err(err) => {
                    log::warn!("[Sound] Group {} deferred play failed: {}", self.id(), err);
                    Progress::Done
                }
            },
            DeferredCommand::Pause(id) => {
                self.pause_locked(inner, id, false);
                Progress::Done
            }
            DeferredCommand::Stop(id) => {
                self.stop_locked(inner, id, false);
                Progress::Done
            }
            DeferredCommand::Mute { muted, instance } => {
                self.mute_locked(inner, muted, instance);
                Progress::Done
            }
            DeferredCommand::Volume { volume, instance } => {
                self.volume_locked(inner, volume, instance);
                Progress::Done
            }
            DeferredCommand::Rate { rate, instance } => {
                self.rate_locked(inner, rate, instance);
                Progress::Done
            }
            DeferredCommand::Loop { looping, instance } => {
                self.loop_locked(inner, looping, instance);
                Progress::Done
            }
            DeferredCommand::Seek { position, instance } => {
                self.seek_locked(inner, position, instance);
                Progress::Done
            }
            DeferredCommand::Fade {
                from,
                to,
                duration_ms,
                instance,
            } => {
                self.fade_locked(inner, from, to, duration_ms, instance);
                Progress::Done
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY HOOKS
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn has_active_graph_playback(&self) -> bool {
        let inner = self.shared.inner.lock();
        !inner.destroyed && inner.is_graph() && inner.instances.iter().any(|i| !i.paused)
    }

    pub(crate) fn apply_global_volume(&self, global_volume: f32) {
        let mut inner = self.shared.inner.lock();
        if inner.destroyed || inner.is_graph() {
            return;
        }
        for inst in inner.instances.iter_mut() {
            let level = inst.volume * global_volume;
            if let Some(voice) = inst.voice.as_mut() {
                voice.set_level(level, 0.0);
            }
        }
    }

    pub(crate) fn apply_global_mute(&self, global_muted: bool) {
        let mut inner = self.shared.inner.lock();
        if inner.destroyed || inner.is_graph() {
            return;
        }
        for inst in inner.instances.iter_mut() {
            let muted = global_muted || inst.muted;
            if let Some(voice) = inst.voice.as_mut() {
                voice.set_element_muted(muted);
            }
        }
    }

    pub(crate) fn unlock_elements(&self) {
        let mut inner = self.shared.inner.lock();
        for inst in inner.instances.iter_mut() {
            if let Some(element) = inst.voice.as_mut().and_then(Voice::element_mut) {
                element.unlock();
            }
        }
    }

    pub(crate) fn notify_unlocked(&self) {
        if !self.shared.inner.lock().destroyed {
            self.emit(SoundEventKind::Unlock, None, None);
        }
    }
}

impl fmt::Debug for SoundGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("SoundGroup")
            .field("id", &self.shared.id)
            .field("state", &inner.state)
            .field("backend", &inner.backend)
            .field("instances", &inner.instances.len())
            .field("queued", &inner.queue.len())
            .finish_non_exhaustive()
    }
}
