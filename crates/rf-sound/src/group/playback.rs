//! Play / pause / stop / seek and natural-end handling

use rf_core::{TimeWindow, timeout_ms};

use super::{GroupInner, LoadState, PendingStart, SoundGroup};
use crate::action_queue::{DeferredCommand, PlayTarget};
use crate::backend::voice::{ElementStart, GraphStart};
use crate::backend::{ElementEvent, PlayRequest};
use crate::error::{LoadError, PlaybackError, SoundError, SoundResult};
use crate::events::SoundEventKind;
use crate::instance::{EndWatch, InstanceId};
use crate::scheduler::delay_from_ms;
use crate::sprite::DEFAULT_SPRITE;

/// Element end re-check delay when the end timer fired early
const ELEMENT_END_RECHECK_MS: f64 = 100.0;

/// Result of a play request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayOutcome {
    /// Playback committed
    Started(InstanceId),
    /// Waiting on device resume, element readiness or the element's play promise
    Pending(InstanceId),
    /// Group not loaded yet; the play sits in the action queue
    Queued(InstanceId),
    AlreadyPlaying(InstanceId),
    /// Start position at or past the window end; the instance ended at once
    Exhausted(InstanceId),
    Refused(InstanceId),
    /// Explicit instance id not found
    Missing,
}

impl PlayOutcome {
    pub fn id(self) -> Option<InstanceId> {
        match self {
            PlayOutcome::Started(id)
            | PlayOutcome::Pending(id)
            | PlayOutcome::Queued(id)
            | PlayOutcome::AlreadyPlaying(id)
            | PlayOutcome::Exhausted(id)
            | PlayOutcome::Refused(id) => Some(id),
            PlayOutcome::Missing => None,
        }
    }
}

impl SoundGroup {
    // ═══════════════════════════════════════════════════════════════════════════
    // PLAY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Play the whole sound, or resume the only paused instance.
    ///
    /// Returns the instance id; it stays valid for the instance's lifetime
    /// even when the group is still loading.
    pub fn play(&self) -> SoundResult<Option<InstanceId>> {
        self.play_target(PlayTarget::Default)
    }

    /// Play a named sprite on a fresh or recycled instance
    pub fn play_sprite(&self, name: &str) -> SoundResult<Option<InstanceId>> {
        self.play_target(PlayTarget::Sprite(name.to_string()))
    }

    /// Resume an existing instance. `Ok(None)` when the id is unknown.
    pub fn play_instance(&self, id: InstanceId) -> SoundResult<Option<InstanceId>> {
        self.play_target(PlayTarget::Instance(id))
    }

    pub fn play_target(&self, target: PlayTarget) -> SoundResult<Option<InstanceId>> {
        let needs_load = {
            let inner = self.lock_live()?;
            inner.state == LoadState::Unloaded && !inner.preload.loads_eagerly()
        };
        if needs_load {
            self.load()?;
        }

        let mut guard = self.lock_live()?;
        let outcome = self.play_locked(&mut guard, target, false)?;
        Ok(outcome.id())
    }

    /// Core play path. `internal` plays commit without emitting `play`.
    pub(super) fn play_locked(
        &self,
        inner: &mut GroupInner,
        target: PlayTarget,
        internal: bool,
    ) -> SoundResult<PlayOutcome> {
        let mut explicit = None;
        let mut sprite = None;
        match target {
            PlayTarget::Instance(id) => explicit = Some(id),
            PlayTarget::Sprite(name) => {
                // `__default` only exists once the duration is known
                let known = inner.sprites.contains(&name)
                    || (name == DEFAULT_SPRITE && inner.state != LoadState::Loaded);
                if !known {
                    return Err(SoundError::UnknownSprite(name));
                }
                sprite = Some(name);
            }
            PlayTarget::Default => {
                if !inner.play_lock {
                    let mut resumable = inner.instances.iter().filter(|i| i.is_resumable());
                    if let (Some(only), None) = (resumable.next(), resumable.next()) {
                        explicit = Some(only.id);
                    }
                }
                if explicit.is_none() {
                    sprite = Some(DEFAULT_SPRITE.to_string());
                }
            }
        }

        let idx = match explicit {
            Some(id) => match inner.index_of(id) {
                Some(idx) => idx,
                None => return Ok(PlayOutcome::Missing),
            },
            None => self.obtain_instance(inner),
        };
        let id = inner.instances[idx].id;
        let sprite = sprite.unwrap_or_else(|| inner.instances[idx].sprite.clone());

        if inner.state != LoadState::Loaded {
            let inst = &mut inner.instances[idx];
            inst.sprite = sprite;
            inst.ended = false;
            inner
                .queue
                .enqueue(DeferredCommand::Play(PlayTarget::Instance(id)));
            return Ok(PlayOutcome::Queued(id));
        }

        if explicit.is_some() && !inner.instances[idx].paused {
            self.post_drain();
            return Ok(PlayOutcome::AlreadyPlaying(id));
        }

        let (window, sprite_loop) = match inner.sprites.get(&sprite) {
            Some(s) => (s.window(), s.looping),
            None => return Err(SoundError::UnknownSprite(sprite)),
        };
        self.ensure_voice(inner, idx);

        let inst = &mut inner.instances[idx];
        let seek = window.start_position(inst.seek);
        inst.sprite = sprite;
        inst.ended = false;
        inst.start = window.start;
        inst.stop = window.stop;
        inst.looping = inst.looping || sprite_loop;

        if window.is_exhausted_at(seek) {
            self.ended_locked(inner, idx);
            return Ok(PlayOutcome::Exhausted(id));
        }

        if inner.is_graph() {
            if self.shared.registry.auto_resume() {
                Ok(self.commit_graph(inner, idx, internal))
            } else {
                log::debug!("[Sound] Instance {id} waits for device resume");
                inner.play_lock = true;
                inner.awaiting_resume.push(PendingStart { id, internal });
                Ok(PlayOutcome::Pending(id))
            }
        } else {
            Ok(self.start_element(inner, idx, internal))
        }
    }

    fn commit_graph(&self, inner: &mut GroupInner, idx: usize, internal: bool) -> PlayOutcome {
        let registry = &self.shared.registry;
        let (Some(device), Some(asset)) = (registry.device(), inner.asset.clone()) else {
            return self.refuse_locked(inner, idx, PlaybackError::NotStarted);
        };
        if inner.instances[idx].voice.is_none() {
            return self.refuse_locked(inner, idx, PlaybackError::NotStarted);
        }

        let inst = &mut inner.instances[idx];
        let window = TimeWindow {
            start: inst.start,
            stop: inst.stop,
        };
        let seek = window.start_position(inst.seek);
        let duration = window.remaining(seek);
        inst.paused = false;
        inst.seek = seek;

        let params = GraphStart {
            seek,
            duration,
            looping: inst.looping,
            loop_start: window.start,
            loop_end: window.stop,
            rate: inst.rate,
            gain: inst.effective_gain(),
        };
        if let Some(voice) = inst.voice.as_mut() {
            inst.play_start = voice.start_graph(&*device, &asset, params);
        }

        let id = inst.id;
        let timeout = timeout_ms(duration, inst.rate);
        inner.refresh_play_lock();
        self.arm_end_timer(inner, idx, timeout);
        if !internal {
            self.emit(SoundEventKind::Play, Some(id), None);
        }
        PlayOutcome::Started(id)
    }

    fn start_element(&self, inner: &mut GroupInner, idx: usize, internal: bool) -> PlayOutcome {
        let url = inner.source.as_ref().map(|s| s.url.clone());
        let preload = inner.preload;
        let id = inner.instances[idx].id;
        let ready = match inner.instances[idx].voice.as_mut().and_then(|v| v.element_mut()) {
            Some(element) => {
                // Streams drop their source on stop
                if !element.has_source() {
                    if let Some(url) = url.as_deref() {
                        element.set_source(url, preload);
                    }
                }
                element.is_ready()
            }
            None => return self.refuse_locked(inner, idx, PlaybackError::NotStarted),
        };

        if !ready {
            log::debug!("[Sound] Instance {id} waits for element readiness");
            inner.play_lock = true;
            inner.awaiting_ready.push(PendingStart { id, internal });
            return PlayOutcome::Pending(id);
        }
        self.commit_element(inner, idx, internal)
    }

    fn commit_element(&self, inner: &mut GroupInner, idx: usize, internal: bool) -> PlayOutcome {
        let (global_volume, global_muted) = self.shared.registry.global_state();
        if inner.instances[idx].voice.is_none() {
            return self.refuse_locked(inner, idx, PlaybackError::NotStarted);
        }
        let inst = &mut inner.instances[idx];
        let id = inst.id;
        let window = TimeWindow {
            start: inst.start,
            stop: inst.stop,
        };
        let seek = window.start_position(inst.seek);
        let params = ElementStart {
            seek,
            muted: global_muted || inst.muted,
            volume: inst.volume * global_volume,
            rate: inst.rate,
        };
        let request = match inst.voice.as_mut() {
            Some(voice) => voice.start_element(params),
            None => PlayRequest::Refused("no media element".into()),
        };

        match request {
            PlayRequest::Started => {
                inst.paused = false;
                inst.seek = seek;
                inner.refresh_play_lock();
                self.arm_element_end(inner, idx, seek);
                if !internal {
                    self.emit(SoundEventKind::Play, Some(id), None);
                }
                PlayOutcome::Started(id)
            }
            PlayRequest::Pending => {
                inst.paused = false;
                inst.seek = seek;
                inner.awaiting_element_play.push(PendingStart { id, internal });
                inner.play_lock = true;
                self.arm_element_end(inner, idx, seek);
                PlayOutcome::Pending(id)
            }
            PlayRequest::Refused(reason) => {
                self.refuse_locked(inner, idx, PlaybackError::Refused(reason))
            }
        }
    }

    /// Sprites and loops end on a timer; whole-file playback on the element's own end
    fn arm_element_end(&self, inner: &mut GroupInner, idx: usize, seek: f64) {
        let inst = &inner.instances[idx];
        if inst.sprite != DEFAULT_SPRITE || inst.looping {
            let timeout = timeout_ms(inst.stop - seek, inst.rate);
            self.arm_end_timer(inner, idx, timeout);
        } else {
            self.clear_end_watch(inner, idx);
            inner.instances[idx].end_watch = Some(EndWatch::ElementEnded);
        }
    }

    fn refuse_locked(&self, inner: &mut GroupInner, idx: usize, err: PlaybackError) -> PlayOutcome {
        self.clear_end_watch(inner, idx);
        let inst = &mut inner.instances[idx];
        inst.paused = true;
        inst.ended = true;
        let id = inst.id;
        inner.refresh_play_lock();
        log::warn!("[Sound] Instance {id} playback error: {err}");
        self.emit(SoundEventKind::PlayError, Some(id), Some(err.to_string()));
        PlayOutcome::Refused(id)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PAUSE / STOP
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pause one instance, or all when `id` is `None`
    pub fn pause(&self, id: Option<InstanceId>) -> SoundResult<()> {
        let mut guard = self.lock_live()?;
        if guard.must_defer() {
            guard.queue.enqueue(DeferredCommand::Pause(id));
            return Ok(());
        }
        self.pause_locked(&mut guard, id, false);
        Ok(())
    }

    pub(super) fn pause_locked(&self, inner: &mut GroupInner, id: Option<InstanceId>, silent: bool) {
        let now = self.shared.registry.clock();
        for id in inner.target_ids(id) {
            let Some(idx) = inner.index_of(id) else {
                continue;
            };
            self.clear_end_watch(inner, idx);

            if !inner.instances[idx].paused {
                let position = self.position_of(inner, idx);
                self.cancel_fade(inner, idx);
                let inst = &mut inner.instances[idx];
                inst.seek = position;
                inst.rate_seek = 0.0;
                inst.paused = true;
                if let Some(voice) = inst.voice.as_mut() {
                    voice.halt(now);
                }
            }

            if !silent {
                self.emit(SoundEventKind::Pause, Some(id), None);
            }
        }
        self.shared.registry.schedule_auto_suspend();
    }

    /// Stop one instance, or all when `id` is `None`; position returns to the window start
    pub fn stop(&self, id: Option<InstanceId>) -> SoundResult<()> {
        self.stop_with(id, false)
    }

    /// Stop without emitting `stop`
    pub fn stop_silently(&self, id: Option<InstanceId>) -> SoundResult<()> {
        self.stop_with(id, true)
    }

    fn stop_with(&self, id: Option<InstanceId>, silent: bool) -> SoundResult<()> {
        let mut guard = self.lock_live()?;
        if guard.must_defer() {
            guard.queue.enqueue(DeferredCommand::Stop(id));
            return Ok(());
        }
        self.stop_locked(&mut guard, id, silent);
        Ok(())
    }

    pub(super) fn stop_locked(&self, inner: &mut GroupInner, id: Option<InstanceId>, silent: bool) {
        let now = self.shared.registry.clock();
        for id in inner.target_ids(id) {
            let Some(idx) = inner.index_of(id) else {
                continue;
            };
            self.clear_end_watch(inner, idx);
            self.cancel_fade(inner, idx);

            let inst = &mut inner.instances[idx];
            inst.seek = inst.start;
            inst.rate_seek = 0.0;
            inst.paused = true;
            inst.ended = true;

            let start = inst.start;
            if let Some(voice) = inst.voice.as_mut() {
                match voice.element_mut() {
                    Some(element) => {
                        let duration = element.duration();
                        if !duration.is_nan() {
                            element.set_current_time(start);
                            element.pause();
                            if duration.is_infinite() {
                                element.clear_source();
                            }
                        }
                    }
                    None => voice.halt(now),
                }
            }

            if !silent {
                self.emit(SoundEventKind::Stop, Some(id), None);
            }
        }
        self.shared.registry.schedule_auto_suspend();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SEEK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current position in seconds of `id`, or of the first instance
    pub fn seek(&self, id: Option<InstanceId>) -> SoundResult<f64> {
        let inner = self.lock_live()?;
        let idx = match id {
            Some(id) => inner.index_of(id),
            None => (!inner.instances.is_empty()).then_some(0),
        };
        Ok(idx.map_or(0.0, |idx| self.position_of(&inner, idx)))
    }

    /// Move `id`, or the first instance, to `position` seconds.
    ///
    /// A playing instance continues from there; a position past its sprite
    /// window ends it.
    pub fn seek_to(&self, position: f64, id: Option<InstanceId>) -> SoundResult<()> {
        let mut guard = self.lock_live()?;
        if guard.must_defer() {
            guard
                .queue
                .enqueue(DeferredCommand::Seek { position, instance: id });
            return Ok(());
        }
        self.seek_locked(&mut guard, position, id);
        Ok(())
    }

    pub(super) fn seek_locked(&self, inner: &mut GroupInner, position: f64, id: Option<InstanceId>) {
        if !(position.is_finite() && position >= 0.0) {
            log::debug!("[Sound] Ignoring seek to {position}");
            return;
        }
        let Some(id) = id.or_else(|| inner.instances.first().map(|i| i.id)) else {
            return;
        };
        let Some(idx) = inner.index_of(id) else {
            return;
        };

        let playing = !inner.instances[idx].paused;
        if playing {
            self.pause_locked(inner, Some(id), true);
        }

        let inst = &mut inner.instances[idx];
        inst.seek = position;
        inst.ended = false;
        if let Some(element) = inst.voice.as_mut().and_then(|v| v.element_mut()) {
            if !element.duration().is_nan() {
                element.set_current_time(position);
            }
        }
        self.clear_end_watch(inner, idx);

        if playing {
            if let Err(err) = self.play_locked(inner, PlayTarget::Instance(id), true) {
                log::warn!("[Sound] Instance {id} failed to resume after seek: {err}");
            }
        }
        self.emit(SoundEventKind::Seek, Some(id), None);
    }

    /// Live position: the element clock, or stored seek plus elapsed device time
    pub(super) fn position_of(&self, inner: &GroupInner, idx: usize) -> f64 {
        let inst = &inner.instances[idx];
        if let Some(position) = inst.voice.as_ref().and_then(|v| v.element_position()) {
            return position;
        }
        let elapsed = if inst.paused {
            0.0
        } else {
            self.shared.registry.clock() - inst.play_start
        };
        let rate_offset = if inst.rate_seek > 0.0 {
            inst.rate_seek - inst.seek
        } else {
            0.0
        };
        inst.seek + rate_offset + elapsed * inst.rate.abs()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // END DETECTION
    // ═══════════════════════════════════════════════════════════════════════════

    pub(super) fn arm_end_timer(&self, inner: &mut GroupInner, idx: usize, timeout: f64) {
        self.clear_end_watch(inner, idx);
        let Some(delay) = delay_from_ms(timeout) else {
            return;
        };

        let token = inner.next_token();
        let id = inner.instances[idx].id;
        let weak = self.downgrade();
        let timer = self.shared.registry.scheduler().set_timeout(delay, move || {
            if let Some(group) = Self::upgrade(&weak) {
                group.on_end_timer(id, token);
            }
        });
        inner.instances[idx].end_watch = Some(EndWatch::Timer { timer, token });
    }

    pub(super) fn clear_end_watch(&self, inner: &mut GroupInner, idx: usize) {
        let scheduler = self.shared.registry.scheduler();
        let inst = &mut inner.instances[idx];
        if let Some(EndWatch::Timer { timer, .. }) = inst.end_watch.take() {
            scheduler.clear(timer);
        }
        if let Some(timer) = inst.recheck.take() {
            scheduler.clear(timer);
        }
    }

    fn on_end_timer(&self, id: InstanceId, token: u64) {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        if inner.destroyed {
            return;
        }
        let Some(idx) = inner.index_of(id) else {
            return;
        };
        let current = matches!(
            inner.instances[idx].end_watch,
            Some(EndWatch::Timer { token: t, .. }) if t == token
        );
        if !current {
            return;
        }
        inner.instances[idx].end_watch = None;
        self.ended_locked(inner, idx);
    }

    fn on_recheck(&self, id: InstanceId) {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        if inner.destroyed {
            return;
        }
        let Some(idx) = inner.index_of(id) else {
            return;
        };
        if inner.instances[idx].recheck.take().is_some() {
            self.ended_locked(inner, idx);
        }
    }

    /// Playback reached the end of its window
    pub(super) fn ended_locked(&self, inner: &mut GroupInner, idx: usize) {
        let graph = inner.is_graph();
        let id = inner.instances[idx].id;

        if !graph {
            let stop = inner.instances[idx].stop;
            let early = inner.instances[idx]
                .voice
                .as_ref()
                .and_then(|v| v.element())
                .is_some_and(|el| !el.is_paused() && !el.is_ended() && el.current_time() < stop);
            if early {
                let weak = self.downgrade();
                let delay = delay_from_ms(ELEMENT_END_RECHECK_MS).unwrap_or_default();
                let timer = self.shared.registry.scheduler().set_timeout(delay, move || {
                    if let Some(group) = Self::upgrade(&weak) {
                        group.on_recheck(id);
                    }
                });
                inner.instances[idx].recheck = Some(timer);
                return;
            }
        }

        let inst = &inner.instances[idx];
        let sprite_loop = inner.sprites.get(&inst.sprite).is_some_and(|s| s.looping);
        let window = TimeWindow {
            start: inst.start,
            stop: inst.stop,
        };
        let looping = (inst.looping || sprite_loop) && window.duration() > 0.0;

        self.emit(SoundEventKind::End, Some(id), None);

        match (graph, looping) {
            (false, true) => {
                self.stop_locked(inner, Some(id), true);
                if let Err(err) = self.play_locked(inner, PlayTarget::Instance(id), false) {
                    log::warn!("[Sound] Instance {id} failed to loop: {err}");
                }
            }
            (true, true) => {
                self.emit(SoundEventKind::Play, Some(id), None);
                let now = self.shared.registry.clock();
                let inst = &mut inner.instances[idx];
                inst.seek = window.start;
                inst.rate_seek = 0.0;
                inst.play_start = now;
                let restart = !inst.voice.as_ref().is_some_and(|v| v.has_active_source());
                let timeout = timeout_ms(window.duration(), inst.rate);
                if restart {
                    self.commit_graph(inner, idx, true);
                } else {
                    self.arm_end_timer(inner, idx, timeout);
                }
            }
            (true, false) => {
                self.clear_end_watch(inner, idx);
                let now = self.shared.registry.clock();
                let inst = &mut inner.instances[idx];
                inst.paused = true;
                inst.ended = true;
                inst.seek = window.start;
                inst.rate_seek = 0.0;
                if let Some(voice) = inst.voice.as_mut() {
                    voice.halt(now);
                }
                self.shared.registry.schedule_auto_suspend();
            }
            (false, false) => self.stop_locked(inner, Some(id), true),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BACKEND NOTIFICATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    pub(super) fn on_element_event(&self, id: InstanceId, event: ElementEvent) {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        if inner.destroyed {
            return;
        }
        let Some(idx) = inner.index_of(id) else {
            return;
        };

        match event {
            ElementEvent::CanPlayThrough => {
                if inner.state != LoadState::Loaded && !inner.is_graph() {
                    let raw = inner.instances[idx]
                        .voice
                        .as_ref()
                        .and_then(|v| v.element())
                        .map_or(f64::NAN, |el| el.duration());
                    self.finish_load(inner, Self::element_duration(raw), None);
                }
                if let Some(pos) = inner.awaiting_ready.iter().position(|p| p.id == id) {
                    let pending = inner.awaiting_ready.remove(pos);
                    self.commit_element(inner, idx, pending.internal);
                }
            }
            ElementEvent::Error(code) => {
                let err = LoadError::Element { code };
                log::warn!("[Sound] Instance {id} element error: {err}");
                self.emit(SoundEventKind::LoadError, Some(id), Some(err.to_string()));
                if let Some(pos) = inner.awaiting_ready.iter().position(|p| p.id == id) {
                    inner.awaiting_ready.remove(pos);
                    self.refuse_locked(inner, idx, PlaybackError::NotStarted);
                }
                if inner.state == LoadState::Loading {
                    Self::abandon_load(inner);
                }
            }
            ElementEvent::PlayResolved => {
                if let Some(pos) = inner.awaiting_element_play.iter().position(|p| p.id == id) {
                    let pending = inner.awaiting_element_play.remove(pos);
                    inner.refresh_play_lock();
                    if let Some(element) = inner.instances[idx]
                        .voice
                        .as_mut()
                        .and_then(|v| v.element_mut())
                    {
                        element.unlock();
                    }
                    if pending.internal {
                        self.post_drain();
                    } else {
                        self.emit(SoundEventKind::Play, Some(id), None);
                    }
                }
            }
            ElementEvent::PlayRejected(reason) => {
                if let Some(pos) = inner.awaiting_element_play.iter().position(|p| p.id == id) {
                    inner.awaiting_element_play.remove(pos);
                    self.refuse_locked(inner, idx, PlaybackError::Refused(reason));
                }
            }
            ElementEvent::Ended => {
                let stream = inner.duration.is_infinite();
                if stream {
                    let raw = inner.instances[idx]
                        .voice
                        .as_ref()
                        .and_then(|v| v.element())
                        .map_or(f64::NAN, |el| el.duration());
                    if raw.is_finite() {
                        let duration = Self::element_duration(raw);
                        inner.duration = duration;
                        inner.sprites.update_default_duration(duration);
                    }
                }
                let watched = inner.instances[idx].end_watch == Some(EndWatch::ElementEnded);
                if watched || stream {
                    inner.instances[idx].end_watch = None;
                    self.ended_locked(inner, idx);
                }
            }
        }
    }

    /// Commit graph plays that waited for the device
    pub(crate) fn on_device_resumed(&self) {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        if inner.destroyed || inner.awaiting_resume.is_empty() {
            return;
        }

        let pending = std::mem::take(&mut inner.awaiting_resume);
        log::debug!(
            "[Sound] Group {} committing {} plays after resume",
            self.id(),
            pending.len()
        );
        for start in pending {
            if let Some(idx) = inner.index_of(start.id) {
                self.commit_graph(inner, idx, start.internal);
            }
        }
        inner.refresh_play_lock();
        self.post_drain();
    }
}
