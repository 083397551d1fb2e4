//! Device Registry
//!
//! Process-wide audio state shared by every group:
//! - the optional audio-graph device and its master gain
//! - the media-element factory and pool of unlocked elements
//! - global volume/mute, codec support, the decoded-asset cache
//! - device auto-suspend/auto-resume
//!
//! ## Thread Safety Design
//!
//! `DeviceRegistry` is a cheap cloneable handle. Its lock is never held while
//! a group lock is taken: when the registry needs to touch groups it first
//! collects strong handles, releases its own lock, then calls into them.

use parking_lot::{Mutex, RwLock};
use rf_core::Volume;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::backend::{AudioDevice, CodecSupport, CodecTable, DecodedAsset, ElementFactory, MediaElement};
use crate::config::RegistryConfig;
use crate::error::{SoundError, SoundResult};
use crate::group::{GroupShared, SoundGroup};
use crate::instance::InstanceId;
use crate::scheduler::{Callback, Scheduler, TimerId};

/// Group identifier, unique per registry
pub type GroupId = u64;

/// First instance id handed out is one above this
const INSTANCE_ID_BASE: u64 = 1000;

/// Lifecycle of the audio-graph device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceState {
    #[default]
    Running = 0,
    Suspending = 1,
    Suspended = 2,
    Resuming = 3,
}

struct GroupEntry {
    id: GroupId,
    group: Weak<GroupShared>,
    /// Resolved source url once the group has picked one
    source: Option<String>,
}

struct RegistryState {
    config: RegistryConfig,
    groups: Vec<GroupEntry>,
    volume: f32,
    muted: bool,
    device_state: DeviceState,
    suspend_timer: Option<TimerId>,
    resume_after_suspend: bool,
    unlocked: bool,
    /// Unlocked elements ready for reuse
    pool: Vec<Box<dyn MediaElement>>,
}

pub(crate) struct RegistryShared {
    scheduler: Scheduler,
    codecs: RwLock<Arc<dyn CodecSupport>>,
    device: RwLock<Option<Arc<dyn AudioDevice>>>,
    elements: RwLock<Option<Arc<dyn ElementFactory>>>,
    cache: Mutex<HashMap<String, DecodedAsset>>,
    state: Mutex<RegistryState>,
    next_group: AtomicU64,
    next_instance: AtomicU64,
}

/// Shared handle to the process-wide audio state
#[derive(Clone)]
pub struct DeviceRegistry {
    shared: Arc<RegistryShared>,
}

impl DeviceRegistry {
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                scheduler: scheduler.clone(),
                codecs: RwLock::new(Arc::new(CodecTable::common())),
                device: RwLock::new(None),
                elements: RwLock::new(None),
                cache: Mutex::new(HashMap::new()),
                state: Mutex::new(RegistryState {
                    config: RegistryConfig::default(),
                    groups: Vec::new(),
                    volume: 1.0,
                    muted: false,
                    device_state: DeviceState::Running,
                    suspend_timer: None,
                    resume_after_suspend: false,
                    unlocked: false,
                    pool: Vec::new(),
                }),
                next_group: AtomicU64::new(0),
                next_instance: AtomicU64::new(INSTANCE_ID_BASE),
            }),
        }
    }

    pub fn with_device(self, device: Arc<dyn AudioDevice>) -> Self {
        self.install_device(device);
        self
    }

    pub fn with_elements(self, factory: Arc<dyn ElementFactory>) -> Self {
        self.install_elements(factory);
        self
    }

    pub fn with_codecs(self, codecs: impl CodecSupport + 'static) -> Self {
        *self.shared.codecs.write() = Arc::new(codecs);
        self
    }

    pub fn with_config(self, config: RegistryConfig) -> Self {
        self.exchange_config(config);
        self
    }

    /// Install the audio-graph device. Groups created afterwards use it.
    pub fn install_device(&self, device: Arc<dyn AudioDevice>) {
        let gain = {
            let mut state = self.shared.state.lock();
            state.device_state = DeviceState::Running;
            if state.muted { 0.0 } else { state.volume }
        };
        device.set_master_gain(gain, device.current_time());
        *self.shared.device.write() = Some(device);
        log::info!("[Registry] Audio device installed");
    }

    pub fn install_elements(&self, factory: Arc<dyn ElementFactory>) {
        *self.shared.elements.write() = Some(factory);
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    #[inline]
    pub fn has_device(&self) -> bool {
        self.shared.device.read().is_some()
    }

    #[inline]
    pub fn has_elements(&self) -> bool {
        self.shared.elements.read().is_some()
    }

    /// Neither backend is available
    #[inline]
    pub fn no_audio(&self) -> bool {
        !self.has_device() && !self.has_elements()
    }

    /// Can the runtime decode this extension? A leading `x-` is ignored.
    pub fn codecs(&self, extension: &str) -> bool {
        let ext = extension.strip_prefix("x-").unwrap_or(extension);
        self.shared.codecs.read().supports(ext)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIG
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn config_copy(&self) -> RegistryConfig {
        self.shared.state.lock().config.clone()
    }

    /// Install `config`, returning the previous one
    pub fn exchange_config(&self, config: RegistryConfig) -> RegistryConfig {
        let mut state = self.shared.state.lock();
        if !config.auto_suspend {
            if let Some(timer) = state.suspend_timer.take() {
                self.shared.scheduler.clear(timer);
            }
        }
        let capacity = config.element_pool_size;
        state.pool.truncate(capacity);
        std::mem::replace(&mut state.config, config)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GLOBAL VOLUME / MUTE
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn volume(&self) -> f32 {
        self.shared.state.lock().volume
    }

    pub fn set_volume(&self, volume: f32) -> SoundResult<()> {
        let volume = Volume::new(volume)
            .ok_or(SoundError::InvalidVolume(volume))?
            .get();
        let muted = {
            let mut state = self.shared.state.lock();
            state.volume = volume;
            state.muted
        };
        if muted {
            return Ok(());
        }

        if let Some(device) = self.device() {
            device.set_master_gain(volume, device.current_time());
        }
        for group in self.live_groups() {
            group.apply_global_volume(volume);
        }
        Ok(())
    }

    pub fn muted(&self) -> bool {
        self.shared.state.lock().muted
    }

    pub fn set_muted(&self, muted: bool) {
        let volume = {
            let mut state = self.shared.state.lock();
            state.muted = muted;
            state.volume
        };

        if let Some(device) = self.device() {
            let gain = if muted { 0.0 } else { volume };
            device.set_master_gain(gain, device.current_time());
        }
        for group in self.live_groups() {
            group.apply_global_mute(muted);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GLOBAL STOP / UNLOAD
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn stop_all(&self) {
        for group in self.live_groups() {
            // Already-unloaded groups are skipped
            let _ = group.stop(None);
        }
    }

    /// Unload every group, close and uninstall the device, drop cached assets
    pub fn unload_all(&self) {
        for group in self.live_groups() {
            let _ = group.unload();
        }
        self.shared.cache.lock().clear();

        if let Some(device) = self.shared.device.write().take() {
            device.close();
        }
        let mut state = self.shared.state.lock();
        if let Some(timer) = state.suspend_timer.take() {
            self.shared.scheduler.clear(timer);
        }
        state.device_state = DeviceState::Running;
        state.resume_after_suspend = false;
        log::info!("[Registry] Unloaded all groups");
    }

    pub fn group_count(&self) -> usize {
        self.live_groups().len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // UNLOCK
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn is_unlocked(&self) -> bool {
        self.shared.state.lock().unlocked
    }

    /// Host hook for user gestures; unlocks when `auto_unlock` is set
    pub fn user_gesture(&self) {
        if self.shared.state.lock().config.auto_unlock {
            self.unlock();
        }
    }

    /// Unlock playback. Runs once; must be called from a user gesture.
    pub fn unlock(&self) {
        let missing = {
            let state = self.shared.state.lock();
            if state.unlocked {
                return;
            }
            state.config.element_pool_size.saturating_sub(state.pool.len())
        };

        if let Some(factory) = self.element_factory() {
            let fresh: Vec<_> = (0..missing)
                .map(|_| {
                    let mut element = factory.create_element();
                    element.unlock();
                    element
                })
                .collect();
            self.shared.state.lock().pool.extend(fresh);
        }

        let groups = self.live_groups();
        for group in &groups {
            group.unlock_elements();
        }

        self.auto_resume();
        self.shared.state.lock().unlocked = true;
        log::info!("[Registry] Audio unlocked");

        for group in &groups {
            group.notify_unlocked();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEVICE SUSPEND / RESUME
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn device_state(&self) -> DeviceState {
        self.shared.state.lock().device_state
    }

    /// Make sure the device is running before graph playback.
    ///
    /// Returns true when it already is. Otherwise a resume is under way and
    /// groups are notified once the device reports ready.
    pub(crate) fn auto_resume(&self) -> bool {
        let Some(device) = self.device() else {
            return true;
        };

        let mut state = self.shared.state.lock();
        match state.device_state {
            DeviceState::Running => {
                if let Some(timer) = state.suspend_timer.take() {
                    self.shared.scheduler.clear(timer);
                }
                true
            }
            DeviceState::Suspended => {
                state.device_state = DeviceState::Resuming;
                drop(state);
                log::info!("[Registry] Resuming audio device");
                device.resume(self.callback(|registry, ()| registry.on_resumed()));
                false
            }
            DeviceState::Suspending => {
                state.resume_after_suspend = true;
                false
            }
            DeviceState::Resuming => false,
        }
    }

    /// Queue an idle check that may arm the suspend timer
    pub(crate) fn schedule_auto_suspend(&self) {
        let weak = Arc::downgrade(&self.shared);
        self.shared.scheduler.post(move || {
            if let Some(shared) = weak.upgrade() {
                DeviceRegistry { shared }.check_idle();
            }
        });
    }

    fn check_idle(&self) {
        if !self.has_device() || !self.shared.state.lock().config.auto_suspend {
            return;
        }
        if self
            .live_groups()
            .iter()
            .any(SoundGroup::has_active_graph_playback)
        {
            return;
        }

        let mut state = self.shared.state.lock();
        if state.device_state != DeviceState::Running {
            return;
        }
        if let Some(timer) = state.suspend_timer.take() {
            self.shared.scheduler.clear(timer);
        }

        let delay = Duration::from_millis(state.config.auto_suspend_delay_ms);
        let weak = Arc::downgrade(&self.shared);
        let timer = self.shared.scheduler.set_timeout(delay, move || {
            if let Some(shared) = weak.upgrade() {
                DeviceRegistry { shared }.on_suspend_timer();
            }
        });
        state.suspend_timer = Some(timer);
    }

    fn on_suspend_timer(&self) {
        let Some(device) = self.device() else {
            return;
        };
        {
            let mut state = self.shared.state.lock();
            state.suspend_timer = None;
            if !state.config.auto_suspend || state.device_state != DeviceState::Running {
                return;
            }
            state.device_state = DeviceState::Suspending;
        }
        log::info!("[Registry] Suspending idle audio device");
        device.suspend(self.callback(|registry, ()| registry.on_suspended()));
    }

    fn on_suspended(&self) {
        let resume = {
            let mut state = self.shared.state.lock();
            if state.device_state != DeviceState::Suspending {
                return;
            }
            state.device_state = DeviceState::Suspended;
            std::mem::take(&mut state.resume_after_suspend)
        };
        if resume {
            self.auto_resume();
        }
    }

    fn on_resumed(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.device_state != DeviceState::Resuming {
                return;
            }
            state.device_state = DeviceState::Running;
        }
        log::info!("[Registry] Audio device running");
        for group in self.live_groups() {
            group.on_device_resumed();
        }
        self.schedule_auto_suspend();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ELEMENT POOL
    // ═══════════════════════════════════════════════════════════════════════════

    /// Unlocked elements waiting in the pool
    pub fn pooled_elements(&self) -> usize {
        self.shared.state.lock().pool.len()
    }

    /// Take a pooled unlocked element, or create a fresh (locked) one
    pub(crate) fn acquire_element(&self) -> Option<Box<dyn MediaElement>> {
        let factory = self.element_factory()?;
        {
            let mut state = self.shared.state.lock();
            if let Some(element) = state.pool.pop() {
                return Some(element);
            }
            if state.unlocked {
                log::warn!(
                    "[Registry] Media element pool exhausted, returning potentially locked element"
                );
            }
        }
        Some(factory.create_element())
    }

    /// Return an element; only unlocked ones are kept
    pub(crate) fn release_element(&self, element: Box<dyn MediaElement>) {
        if !element.is_unlocked() {
            return;
        }
        let mut state = self.shared.state.lock();
        if state.pool.len() < state.config.element_pool_size {
            state.pool.push(element);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GROUPS & CACHE
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn register_group(&self, group: Weak<GroupShared>) -> GroupId {
        let id = self.shared.next_group.fetch_add(1, Ordering::Relaxed) + 1;
        self.shared.state.lock().groups.push(GroupEntry {
            id,
            group,
            source: None,
        });
        id
    }

    pub(crate) fn bind_source(&self, id: GroupId, url: &str) {
        let mut state = self.shared.state.lock();
        if let Some(entry) = state.groups.iter_mut().find(|e| e.id == id) {
            entry.source = Some(url.to_string());
        }
    }

    /// Forget a group; drop its cached asset unless another group shares it
    pub(crate) fn release_group(&self, id: GroupId) {
        let orphaned = {
            let mut state = self.shared.state.lock();
            let Some(pos) = state.groups.iter().position(|e| e.id == id) else {
                return;
            };
            let entry = state.groups.remove(pos);
            entry
                .source
                .filter(|url| !state.groups.iter().any(|e| e.source.as_ref() == Some(url)))
        };

        if let Some(url) = orphaned {
            if self.shared.cache.lock().remove(&url).is_some() {
                log::debug!("[Registry] Evicted cached asset {url}");
            }
        }
    }

    pub(crate) fn live_groups(&self) -> Vec<SoundGroup> {
        let mut state = self.shared.state.lock();
        state.groups.retain(|e| e.group.strong_count() > 0);
        state
            .groups
            .iter()
            .filter_map(|e| e.group.upgrade().map(SoundGroup::from_shared))
            .collect()
    }

    pub fn is_cached(&self, url: &str) -> bool {
        self.shared.cache.lock().contains_key(url)
    }

    pub(crate) fn cached_asset(&self, url: &str) -> Option<DecodedAsset> {
        self.shared.cache.lock().get(url).cloned()
    }

    pub(crate) fn store_asset(&self, url: &str, asset: DecodedAsset) {
        self.shared.cache.lock().insert(url.to_string(), asset);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ACCESS
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn device(&self) -> Option<Arc<dyn AudioDevice>> {
        self.shared.device.read().clone()
    }

    pub(crate) fn element_factory(&self) -> Option<Arc<dyn ElementFactory>> {
        self.shared.elements.read().clone()
    }

    pub(crate) fn secure_transport(&self) -> bool {
        self.shared.state.lock().config.secure_transport
    }

    pub(crate) fn global_state(&self) -> (f32, bool) {
        let state = self.shared.state.lock();
        (state.volume, state.muted)
    }

    pub(crate) fn next_instance_id(&self) -> InstanceId {
        self.shared.next_instance.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Device clock when a device exists, scheduler clock otherwise
    pub(crate) fn clock(&self) -> f64 {
        match self.device() {
            Some(device) => device.current_time(),
            None => self.shared.scheduler.now_secs(),
        }
    }

    fn callback<T: Send + 'static>(
        &self,
        handler: impl Fn(&DeviceRegistry, T) + Send + Sync + 'static,
    ) -> Callback<T> {
        let weak = Arc::downgrade(&self.shared);
        Callback::new(&self.shared.scheduler, move |value| {
            if let Some(shared) = weak.upgrade() {
                handler(&DeviceRegistry { shared }, value);
            }
        })
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("DeviceRegistry")
            .field("groups", &state.groups.len())
            .field("volume", &state.volume)
            .field("muted", &state.muted)
            .field("device_state", &state.device_state)
            .field("pooled_elements", &state.pool.len())
            .finish_non_exhaustive()
    }
}
