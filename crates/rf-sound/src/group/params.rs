//! Volume, mute, rate, loop and fades
//!
//! Every setter takes an optional instance id: `None` changes the group
//! default and every existing instance. While the group cannot run
//! commands, setters are queued and replayed in order.

use rf_core::{PlaybackRate, Volume, timeout_ms};
use std::time::Duration;

use super::{GroupInner, SoundGroup};
use crate::action_queue::{DeferredCommand, PlayTarget};
use crate::error::{SoundError, SoundResult};
use crate::events::SoundEventKind;
use crate::fade::{Fade, FadeStep};
use crate::instance::InstanceId;
use crate::scheduler::delay_from_ms;

impl SoundGroup {
    fn instance_field<T>(
        &self,
        id: InstanceId,
        read: impl Fn(&crate::instance::SoundInstance) -> T,
    ) -> SoundResult<T> {
        let inner = self.lock_live()?;
        inner
            .index_of(id)
            .map(|idx| read(&inner.instances[idx]))
            .ok_or(SoundError::UnknownInstance(id))
    }

    /// Queue `command` if the group cannot run it now; true when queued
    fn defer_if_busy(inner: &mut GroupInner, command: impl FnOnce() -> DeferredCommand) -> bool {
        if inner.must_defer() {
            inner.queue.enqueue(command());
            true
        } else {
            false
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VOLUME
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn group_volume(&self) -> SoundResult<f32> {
        Ok(self.lock_live()?.volume)
    }

    pub fn instance_volume(&self, id: InstanceId) -> SoundResult<f32> {
        self.instance_field(id, |inst| inst.volume)
    }

    pub fn set_group_volume(&self, volume: f32) -> SoundResult<()> {
        self.set_volume(volume, None)
    }

    pub fn set_instance_volume(&self, id: InstanceId, volume: f32) -> SoundResult<()> {
        self.set_volume(volume, Some(id))
    }

    /// Set volume in `0.0..=1.0`. Cancels running fades on the targets.
    pub fn set_volume(&self, volume: f32, id: Option<InstanceId>) -> SoundResult<()> {
        let volume = Volume::new(volume)
            .ok_or(SoundError::InvalidVolume(volume))?
            .get();
        let mut guard = self.lock_live()?;
        if Self::defer_if_busy(&mut guard, || DeferredCommand::Volume {
            volume,
            instance: id,
        }) {
            return Ok(());
        }
        self.volume_locked(&mut guard, volume, id);
        Ok(())
    }

    pub(super) fn volume_locked(&self, inner: &mut GroupInner, volume: f32, id: Option<InstanceId>) {
        if id.is_none() {
            inner.volume = volume;
        }
        for id in inner.target_ids(id) {
            let Some(idx) = inner.index_of(id) else {
                continue;
            };
            self.cancel_fade(inner, idx);
            inner.instances[idx].volume = volume;
            if !inner.instances[idx].muted {
                self.apply_level(inner, idx);
            }
            self.emit(SoundEventKind::Volume, Some(id), None);
        }
    }

    /// Push the instance volume to its backend (global volume applies to elements)
    fn apply_level(&self, inner: &mut GroupInner, idx: usize) {
        let registry = &self.shared.registry;
        let graph = inner.is_graph();
        let inst = &mut inner.instances[idx];
        let level = if graph {
            inst.effective_gain()
        } else {
            inst.volume * registry.global_state().0
        };
        if let Some(voice) = inst.voice.as_mut() {
            voice.set_level(level, registry.clock());
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MUTE
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn group_muted(&self) -> SoundResult<bool> {
        Ok(self.lock_live()?.muted)
    }

    pub fn instance_muted(&self, id: InstanceId) -> SoundResult<bool> {
        self.instance_field(id, |inst| inst.muted)
    }

    pub fn set_group_muted(&self, muted: bool) -> SoundResult<()> {
        self.set_muted(muted, None)
    }

    pub fn set_instance_muted(&self, id: InstanceId, muted: bool) -> SoundResult<()> {
        self.set_muted(muted, Some(id))
    }

    pub fn set_muted(&self, muted: bool, id: Option<InstanceId>) -> SoundResult<()> {
        let mut guard = self.lock_live()?;
        if Self::defer_if_busy(&mut guard, || DeferredCommand::Mute {
            muted,
            instance: id,
        }) {
            return Ok(());
        }
        self.mute_locked(&mut guard, muted, id);
        Ok(())
    }

    pub(super) fn mute_locked(&self, inner: &mut GroupInner, muted: bool, id: Option<InstanceId>) {
        if id.is_none() {
            inner.muted = muted;
        }
        let registry = &self.shared.registry;
        let global_muted = registry.global_state().1;
        for id in inner.target_ids(id) {
            let Some(idx) = inner.index_of(id) else {
                continue;
            };
            inner.instances[idx].muted = muted;
            if inner.instances[idx].fade.is_some() {
                self.cancel_fade(inner, idx);
            }

            let graph = inner.is_graph();
            let inst = &mut inner.instances[idx];
            let level = inst.effective_gain();
            if let Some(voice) = inst.voice.as_mut() {
                if graph {
                    voice.set_level(level, registry.clock());
                } else {
                    voice.set_element_muted(global_muted || muted);
                }
            }
            self.emit(SoundEventKind::Mute, Some(id), None);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RATE
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn group_rate(&self) -> SoundResult<f64> {
        Ok(self.lock_live()?.rate)
    }

    pub fn instance_rate(&self, id: InstanceId) -> SoundResult<f64> {
        self.instance_field(id, |inst| inst.rate)
    }

    pub fn set_group_rate(&self, rate: f64) -> SoundResult<()> {
        self.set_rate(rate, None)
    }

    pub fn set_instance_rate(&self, id: InstanceId, rate: f64) -> SoundResult<()> {
        self.set_rate(rate, Some(id))
    }

    /// Change playback rate; playing instances keep their position and get
    /// a new end timer
    pub fn set_rate(&self, rate: f64, id: Option<InstanceId>) -> SoundResult<()> {
        let rate = PlaybackRate::new(rate)
            .ok_or(SoundError::InvalidRate(rate))?
            .get();
        let mut guard = self.lock_live()?;
        if Self::defer_if_busy(&mut guard, || DeferredCommand::Rate {
            rate,
            instance: id,
        }) {
            return Ok(());
        }
        self.rate_locked(&mut guard, rate, id);
        Ok(())
    }

    pub(super) fn rate_locked(&self, inner: &mut GroupInner, rate: f64, id: Option<InstanceId>) {
        if id.is_none() {
            inner.rate = rate;
        }
        let registry = &self.shared.registry;
        for id in inner.target_ids(id) {
            let Some(idx) = inner.index_of(id) else {
                continue;
            };
            let now = registry.clock();

            if !inner.instances[idx].paused {
                let position = self.position_of(inner, idx);
                let graph = inner.is_graph();
                let inst = &mut inner.instances[idx];
                inst.rate_seek = position;
                if graph {
                    inst.play_start = now;
                }
            }

            let inst = &mut inner.instances[idx];
            inst.rate = rate;
            if let Some(voice) = inst.voice.as_mut() {
                voice.set_rate(rate, now);
            }

            let position = self.position_of(inner, idx);
            let inst = &inner.instances[idx];
            let timeout = timeout_ms(inst.stop - position, rate);
            if inst.end_watch.is_some() || !inst.paused {
                self.arm_end_timer(inner, idx, timeout);
            }
            self.emit(SoundEventKind::Rate, Some(id), None);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOP
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn group_loop(&self) -> SoundResult<bool> {
        Ok(self.lock_live()?.looping)
    }

    pub fn instance_loop(&self, id: InstanceId) -> SoundResult<bool> {
        self.instance_field(id, |inst| inst.looping)
    }

    pub fn set_group_loop(&self, looping: bool) -> SoundResult<()> {
        self.set_loop(looping, None)
    }

    pub fn set_instance_loop(&self, id: InstanceId, looping: bool) -> SoundResult<()> {
        self.set_loop(looping, Some(id))
    }

    pub fn set_loop(&self, looping: bool, id: Option<InstanceId>) -> SoundResult<()> {
        let mut guard = self.lock_live()?;
        if Self::defer_if_busy(&mut guard, || DeferredCommand::Loop {
            looping,
            instance: id,
        }) {
            return Ok(());
        }
        self.loop_locked(&mut guard, looping, id);
        Ok(())
    }

    pub(super) fn loop_locked(&self, inner: &mut GroupInner, looping: bool, id: Option<InstanceId>) {
        if id.is_none() {
            inner.looping = looping;
        }
        for id in inner.target_ids(id) {
            let Some(idx) = inner.index_of(id) else {
                continue;
            };
            let inst = &mut inner.instances[idx];
            inst.looping = looping;

            let (start, stop, playing) = (inst.start, inst.stop, !inst.paused);
            let Some(voice) = inst.voice.as_mut().filter(|v| v.has_active_source()) else {
                continue;
            };
            voice.set_loop_window(looping, start, stop);

            // Restart so the source is rebuilt with the loop window
            if looping && playing {
                self.pause_locked(inner, Some(id), true);
                if let Err(err) = self.play_locked(inner, PlayTarget::Instance(id), true) {
                    log::warn!("[Sound] Instance {id} failed to restart looping: {err}");
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FADE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fade from `from` to `to` over `duration_ms`; both ends are clamped
    /// to `0.0..=1.0`. Emits `fade` once done.
    pub fn fade(
        &self,
        from: f32,
        to: f32,
        duration_ms: f64,
        id: Option<InstanceId>,
    ) -> SoundResult<()> {
        let from = Volume::clamped(from).get();
        let to = Volume::clamped(to).get();
        let duration_ms = duration_ms.max(0.0);

        let mut guard = self.lock_live()?;
        if Self::defer_if_busy(&mut guard, || DeferredCommand::Fade {
            from,
            to,
            duration_ms,
            instance: id,
        }) {
            return Ok(());
        }
        self.fade_locked(&mut guard, from, to, duration_ms, id);
        Ok(())
    }

    pub(super) fn fade_locked(
        &self,
        inner: &mut GroupInner,
        from: f32,
        to: f32,
        duration_ms: f64,
        id: Option<InstanceId>,
    ) {
        self.volume_locked(inner, from, id);

        let registry = &self.shared.registry;
        let group_wide = id.is_none();
        for id in inner.target_ids(id) {
            let Some(idx) = inner.index_of(id) else {
                continue;
            };
            let graph = inner.is_graph();
            let inst = &mut inner.instances[idx];
            if graph && !inst.muted {
                if let Some(voice) = inst.voice.as_mut() {
                    let now = registry.clock();
                    voice.ramp(from, to, now, now + duration_ms / 1000.0);
                }
            }
            self.start_fade(inner, idx, from, to, duration_ms, group_wide);
        }
    }

    fn start_fade(
        &self,
        inner: &mut GroupInner,
        idx: usize,
        from: f32,
        to: f32,
        duration_ms: f64,
        group_wide: bool,
    ) {
        let scheduler = self.shared.registry.scheduler();
        let mut fade = Fade::new(from, to, duration_ms, scheduler.now_ms(), group_wide);
        fade.token = inner.next_token();

        let id = inner.instances[idx].id;
        let token = fade.token;
        let weak = self.downgrade();
        let period = delay_from_ms(fade.interval_ms()).unwrap_or(Duration::MAX);
        fade.timer = Some(scheduler.set_interval(period, move || {
            if let Some(group) = Self::upgrade(&weak) {
                group.on_fade_tick(id, token);
            }
        }));
        inner.instances[idx].fade = Some(fade);
    }

    fn on_fade_tick(&self, id: InstanceId, token: u64) {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        if inner.destroyed {
            return;
        }
        let Some(idx) = inner.index_of(id) else {
            return;
        };
        let now_ms = self.shared.registry.scheduler().now_ms();
        let Some(fade) = inner.instances[idx]
            .fade
            .as_mut()
            .filter(|f| f.token == token)
        else {
            return;
        };

        let step = fade.tick(now_ms);
        let group_wide = fade.is_group_wide();
        let timer = fade.timer;
        let volume = step.volume();

        inner.instances[idx].volume = volume;
        if group_wide {
            inner.volume = volume;
        }
        // Graph gain follows the native ramp
        if !inner.is_graph() && !inner.instances[idx].muted {
            self.apply_level(inner, idx);
        }

        if let FadeStep::Finished(target) = step {
            if let Some(timer) = timer {
                self.shared.registry.scheduler().clear(timer);
            }
            inner.instances[idx].fade = None;
            inner.instances[idx].volume = target;
            if !inner.instances[idx].muted {
                self.apply_level(inner, idx);
            }
            self.emit(SoundEventKind::Fade, Some(id), None);
        }
    }

    /// Stop a running fade, snapping to its target. Emits `fade`.
    pub(super) fn cancel_fade(&self, inner: &mut GroupInner, idx: usize) {
        let Some(fade) = inner.instances[idx].fade.take() else {
            return;
        };
        let registry = &self.shared.registry;
        if let Some(timer) = fade.timer {
            registry.scheduler().clear(timer);
        }

        let inst = &mut inner.instances[idx];
        if let Some(voice) = inst.voice.as_mut() {
            voice.cancel_ramp(registry.clock());
        }
        inst.volume = fade.target();
        let id = inst.id;
        if !inst.muted {
            self.apply_level(inner, idx);
        }
        self.emit(SoundEventKind::Fade, Some(id), None);
    }
}
