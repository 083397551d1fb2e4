//! Sound group integration tests on the audio-graph backend
//!
//! Drives groups through the headless device and the virtual scheduler
//! clock: pre-load queueing, sprites, pooling, fades, looping, rate
//! changes, device suspend/resume and unload.

use approx::assert_relative_eq;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use rf_sound::backend::headless::HeadlessDevice;
use rf_sound::{
    DeviceRegistry, DeviceState, LoadState, Preload, Scheduler, SoundConfig, SoundError,
    SoundEvent, SoundEventKind, SoundGroup,
};

struct Rig {
    scheduler: Scheduler,
    device: Arc<HeadlessDevice>,
    registry: DeviceRegistry,
}

fn rig() -> Rig {
    let _ = env_logger::builder().is_test(true).try_init();
    let scheduler = Scheduler::new();
    let device = Arc::new(
        HeadlessDevice::new(&scheduler)
            .with_asset("sfx.webm", 3.0)
            .with_asset("music.mp3", 10.0),
    );
    let registry = DeviceRegistry::new(&scheduler).with_device(device.clone());
    Rig {
        scheduler,
        device,
        registry,
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Record every event of the given kinds, in delivery order
fn record(group: &SoundGroup, kinds: &[SoundEventKind]) -> Arc<Mutex<Vec<SoundEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for &kind in kinds {
        let seen = Arc::clone(&seen);
        group
            .on(kind, move |_, event| seen.lock().push(event.clone()))
            .unwrap();
    }
    seen
}

fn count(events: &Mutex<Vec<SoundEvent>>, kind: SoundEventKind) -> usize {
    events.lock().iter().filter(|e| e.kind == kind).count()
}

fn loaded(rig: &Rig, config: SoundConfig) -> SoundGroup {
    let group = SoundGroup::new(&rig.registry, config).unwrap();
    rig.scheduler.run_pending();
    assert_eq!(group.state(), LoadState::Loaded);
    group
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRE-LOAD QUEUEING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_play_before_load_returns_stable_id() {
    let rig = rig();
    rig.device.set_manual_decode(true);
    let sfx = SoundGroup::new(
        &rig.registry,
        SoundConfig::new(["sfx.webm"]).with_sprite("foo", 500.0, 1000.0),
    )
    .unwrap();
    let events = record(&sfx, &[SoundEventKind::Play, SoundEventKind::End]);

    let id = sfx.play_sprite("foo").unwrap().expect("instance id");
    assert_eq!(sfx.state(), LoadState::Loading);
    assert_eq!(sfx.pending_actions().unwrap(), 1);
    assert!(rig.device.source_starts().is_empty());

    rig.device.complete_decodes();
    rig.scheduler.run_pending();

    assert_eq!(sfx.pending_actions().unwrap(), 0);
    assert!(sfx.playing(Some(id)).unwrap());
    {
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SoundEventKind::Play);
        assert_eq!(events[0].instance, Some(id));
    }

    let starts = rig.device.source_starts();
    assert_eq!(starts.len(), 1);
    assert_relative_eq!(starts[0].offset, 0.5);
    assert_relative_eq!(starts[0].duration, 1.0);
    assert_eq!(starts[0].url, "sfx.webm");

    rig.scheduler.advance(ms(999));
    assert!(sfx.playing(Some(id)).unwrap());
    rig.scheduler.advance(ms(2));
    assert!(!sfx.playing(Some(id)).unwrap());
    assert_eq!(count(&events, SoundEventKind::End), 1);
    assert_eq!(rig.device.active_sources(), 0);
}

#[test]
fn test_queued_commands_run_in_order() {
    let rig = rig();
    rig.device.set_manual_decode(true);
    let sfx = SoundGroup::new(&rig.registry, SoundConfig::new(["sfx.webm"])).unwrap();
    let events = record(
        &sfx,
        &[
            SoundEventKind::Load,
            SoundEventKind::Volume,
            SoundEventKind::Rate,
            SoundEventKind::Play,
        ],
    );

    sfx.set_group_volume(0.5).unwrap();
    sfx.set_group_rate(1.5).unwrap();
    let id = sfx.play().unwrap().unwrap();
    assert_eq!(sfx.pending_actions().unwrap(), 3);

    rig.device.complete_decodes();
    rig.scheduler.run_pending();

    let kinds: Vec<_> = events.lock().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SoundEventKind::Load,
            SoundEventKind::Volume,
            SoundEventKind::Rate,
            SoundEventKind::Play,
        ]
    );
    assert_eq!(sfx.instance_volume(id).unwrap(), 0.5);
    assert_eq!(sfx.instance_rate(id).unwrap(), 1.5);
    assert_eq!(rig.device.source_starts()[0].rate, 1.5);

    // 3 s at 1.5x
    rig.scheduler.advance(ms(1999));
    assert!(sfx.playing(Some(id)).unwrap());
    rig.scheduler.advance(ms(2));
    assert!(!sfx.playing(Some(id)).unwrap());
}

#[test]
fn test_autoplay() {
    let rig = rig();
    let sfx = SoundGroup::new(&rig.registry, SoundConfig::new(["sfx.webm"]).with_autoplay(true))
        .unwrap();
    let events = record(&sfx, &[SoundEventKind::Play]);
    rig.scheduler.run_pending();

    assert!(sfx.playing(None).unwrap());
    assert_eq!(count(&events, SoundEventKind::Play), 1);
}

#[test]
fn test_play_triggers_load_when_not_preloaded() {
    let rig = rig();
    let sfx = SoundGroup::new(
        &rig.registry,
        SoundConfig::new(["sfx.webm"]).with_preload(Preload::None),
    )
    .unwrap();
    assert_eq!(sfx.state(), LoadState::Unloaded);

    let id = sfx.play().unwrap().unwrap();
    assert_eq!(sfx.state(), LoadState::Loading);
    rig.scheduler.run_pending();
    assert!(sfx.playing(Some(id)).unwrap());
}

#[test]
fn test_state_is_monotonic_until_unload() {
    let rig = rig();
    rig.device.set_manual_decode(true);
    let sfx = SoundGroup::new(&rig.registry, SoundConfig::new(["sfx.webm"])).unwrap();

    let mut observed = vec![sfx.state()];
    rig.device.complete_decodes();
    rig.scheduler.run_pending();
    observed.push(sfx.state());
    sfx.load().unwrap();
    observed.push(sfx.state());

    assert_eq!(
        observed,
        vec![LoadState::Loading, LoadState::Loaded, LoadState::Loaded]
    );
    assert!(observed.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_failed_decode_unloads_and_keeps_queued_play() {
    let rig = rig();
    rig.device.set_manual_decode(true);
    let sfx = SoundGroup::new(&rig.registry, SoundConfig::new(["sfx.webm"])).unwrap();
    let events = record(&sfx, &[SoundEventKind::LoadError, SoundEventKind::Play]);

    let id = sfx.play().unwrap().unwrap();
    rig.device.fail_decodes("truncated");
    rig.scheduler.run_pending();
    assert_eq!(sfx.state(), LoadState::Unloaded);
    assert_eq!(count(&events, SoundEventKind::LoadError), 1);
    assert_eq!(sfx.pending_actions().unwrap(), 1);

    sfx.load().unwrap();
    assert_eq!(sfx.state(), LoadState::Loading);
    rig.device.complete_decodes();
    rig.scheduler.run_pending();

    assert_eq!(sfx.state(), LoadState::Loaded);
    assert!(sfx.playing(Some(id)).unwrap());
    assert_eq!(count(&events, SoundEventKind::Play), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPRITES & TARGETS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_unknown_sprite_is_an_error() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]).with_sprite("hit", 0.0, 100.0));
    assert_eq!(
        sfx.play_sprite("miss"),
        Err(SoundError::UnknownSprite("miss".into()))
    );
}

#[test]
fn test_unknown_instance_plays_nothing() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    assert_eq!(sfx.play_instance(424_242), Ok(None));
    assert!(rig.device.source_starts().is_empty());
}

#[test]
fn test_default_sprite_covers_asset() {
    let rig = rig();
    let music = loaded(&rig, SoundConfig::new(["music.mp3"]));
    let id = music.play().unwrap().unwrap();
    assert_eq!(music.duration(None).unwrap(), 10.0);
    assert_eq!(music.duration(Some(id)).unwrap(), 10.0);

    let status = music.instance(id).unwrap().unwrap();
    assert_eq!(status.sprite, rf_sound::DEFAULT_SPRITE);
    assert_eq!((status.start, status.stop), (0.0, 10.0));
}

#[test]
fn test_seek_past_sprite_end_ends_instance() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]).with_sprite("short", 0.0, 1000.0));
    let events = record(&sfx, &[SoundEventKind::End, SoundEventKind::Seek]);

    let id = sfx.play_sprite("short").unwrap().unwrap();
    sfx.seek_to(2.0, Some(id)).unwrap();
    rig.scheduler.run_pending();

    let status = sfx.instance(id).unwrap().unwrap();
    assert!(status.paused && status.ended);
    assert_eq!(count(&events, SoundEventKind::End), 1);
    assert_eq!(count(&events, SoundEventKind::Seek), 1);
    assert_eq!(rig.device.source_starts().len(), 1);
    assert_eq!(rig.device.active_sources(), 0);
}

#[test]
fn test_pause_and_resume_continue_from_position() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let events = record(&sfx, &[SoundEventKind::Pause, SoundEventKind::End]);

    let id = sfx.play().unwrap().unwrap();
    rig.scheduler.advance(ms(1000));
    sfx.pause(Some(id)).unwrap();
    assert_relative_eq!(sfx.seek(Some(id)).unwrap(), 1.0, epsilon = 1e-9);

    let status = sfx.instance(id).unwrap().unwrap();
    assert!(status.paused && !status.ended);

    // A bare play resumes the only paused instance
    assert_eq!(sfx.play().unwrap(), Some(id));
    let starts = rig.device.source_starts();
    assert_eq!(starts.len(), 2);
    assert_relative_eq!(starts[1].offset, 1.0, epsilon = 1e-9);
    assert_relative_eq!(starts[1].duration, 2.0, epsilon = 1e-9);

    rig.scheduler.advance(ms(2001));
    assert_eq!(count(&events, SoundEventKind::Pause), 1);
    assert_eq!(count(&events, SoundEventKind::End), 1);
}

#[test]
fn test_stop_resets_to_window_start() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]).with_sprite("mid", 1000.0, 1500.0));
    let events = record(&sfx, &[SoundEventKind::Stop]);

    let id = sfx.play_sprite("mid").unwrap().unwrap();
    rig.scheduler.advance(ms(500));
    sfx.stop(Some(id)).unwrap();
    rig.scheduler.run_pending();

    let status = sfx.instance(id).unwrap().unwrap();
    assert!(status.paused && status.ended);
    assert_relative_eq!(sfx.seek(Some(id)).unwrap(), 1.0);
    assert_eq!(count(&events, SoundEventKind::Stop), 1);
    assert_eq!(rig.device.active_sources(), 0);
}

#[test]
fn test_two_paused_instances_force_fresh_play() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let a = sfx.play().unwrap().unwrap();
    let b = sfx.play().unwrap().unwrap();
    assert_ne!(a, b);

    sfx.pause(None).unwrap();
    let c = sfx.play().unwrap().unwrap();
    assert!(c != a && c != b);
    assert_eq!(sfx.instances().unwrap().len(), 3);
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_pool_evicts_newest_ended_and_reuses_oldest() {
    let rig = rig();
    let sfx = loaded(
        &rig,
        SoundConfig::new(["sfx.webm"])
            .with_sprite("blip", 0.0, 100.0)
            .with_pool(2),
    );

    let ids: Vec<_> = (0..4)
        .map(|_| sfx.play_sprite("blip").unwrap().unwrap())
        .collect();
    assert_eq!(sfx.instances().unwrap().len(), 4);
    let mut unique = ids.clone();
    unique.dedup();
    assert_eq!(unique.len(), 4);

    rig.scheduler.advance(ms(150));
    assert!(!sfx.playing(None).unwrap());

    let reused = sfx.play_sprite("blip").unwrap().unwrap();
    assert_eq!(reused, ids[0]);
    let remaining: Vec<_> = sfx.instances().unwrap().iter().map(|s| s.id).collect();
    assert_eq!(remaining, vec![ids[0], ids[1]]);
}

#[test]
fn test_recycled_instance_restores_defaults() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]).with_sprite("blip", 0.0, 100.0));

    let id = sfx.play_sprite("blip").unwrap().unwrap();
    sfx.set_instance_volume(id, 0.2).unwrap();
    sfx.set_instance_rate(id, 2.0).unwrap();
    rig.scheduler.advance(ms(200));

    let again = sfx.play_sprite("blip").unwrap().unwrap();
    assert_eq!(again, id);
    assert_eq!(sfx.instance_volume(id).unwrap(), 1.0);
    assert_eq!(sfx.instance_rate(id).unwrap(), 1.0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// FADE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_fade_is_monotonic_and_fires_once() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let events = record(&sfx, &[SoundEventKind::Fade]);

    let id = sfx.play().unwrap().unwrap();
    sfx.fade(0.0, 1.0, 1000.0, Some(id)).unwrap();
    assert_eq!(sfx.instance_volume(id).unwrap(), 0.0);

    let mut samples = Vec::new();
    for _ in 0..60 {
        rig.scheduler.advance(ms(20));
        samples.push(sfx.instance_volume(id).unwrap());
    }

    assert!(samples.windows(2).all(|w| w[0] <= w[1]), "{samples:?}");
    assert!(samples.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(*samples.last().unwrap(), 1.0);
    assert!(samples[10] > 0.0 && samples[10] < 1.0);
    assert_eq!(count(&events, SoundEventKind::Fade), 1);
}

#[test]
fn test_group_fade_drives_group_volume() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    sfx.play().unwrap();
    sfx.fade(1.0, 0.0, 200.0, None).unwrap();

    rig.scheduler.advance(ms(400));
    assert_eq!(sfx.group_volume().unwrap(), 0.0);
}

#[test]
fn test_volume_write_cancels_fade() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let events = record(&sfx, &[SoundEventKind::Fade]);

    let id = sfx.play().unwrap().unwrap();
    sfx.fade(1.0, 0.0, 1000.0, Some(id)).unwrap();
    rig.scheduler.advance(ms(100));
    sfx.set_instance_volume(id, 0.8).unwrap();
    rig.scheduler.run_pending();
    assert_eq!(count(&events, SoundEventKind::Fade), 1);

    rig.scheduler.advance(ms(1500));
    assert_eq!(sfx.instance_volume(id).unwrap(), 0.8);
    assert_eq!(count(&events, SoundEventKind::Fade), 1);
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    assert_eq!(sfx.set_group_volume(1.5), Err(SoundError::InvalidVolume(1.5)));
    assert_eq!(sfx.set_group_rate(0.0), Err(SoundError::InvalidRate(0.0)));
}

#[test]
fn test_fade_clamps_out_of_range_volumes() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let events = record(&sfx, &[SoundEventKind::Fade]);

    let id = sfx.play().unwrap().unwrap();
    sfx.fade(-0.5, 1.5, 100.0, Some(id)).unwrap();
    assert_eq!(sfx.instance_volume(id).unwrap(), 0.0);

    rig.scheduler.advance(ms(200));
    assert_eq!(sfx.instance_volume(id).unwrap(), 1.0);
    assert_eq!(count(&events, SoundEventKind::Fade), 1);
}

#[test]
fn test_huge_fade_duration_waits_without_overflow() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let events = record(&sfx, &[SoundEventKind::Fade]);

    let id = sfx.play().unwrap().unwrap();
    sfx.fade(0.0, 1.0, 1e25, Some(id)).unwrap();
    rig.scheduler.advance(ms(1000));

    assert_eq!(sfx.instance_volume(id).unwrap(), 0.0);
    assert_eq!(count(&events, SoundEventKind::Fade), 0);
    assert!(sfx.playing(Some(id)).unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOOP & RATE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_looping_sprite_reuses_source() {
    let rig = rig();
    let sfx = loaded(
        &rig,
        SoundConfig::new(["sfx.webm"]).with_looping_sprite("pad", 0.0, 500.0),
    );
    let events = record(&sfx, &[SoundEventKind::Play, SoundEventKind::End]);

    let id = sfx.play_sprite("pad").unwrap().unwrap();
    rig.scheduler.advance(ms(1200));

    assert!(sfx.playing(Some(id)).unwrap());
    assert_eq!(count(&events, SoundEventKind::End), 2);
    assert_eq!(count(&events, SoundEventKind::Play), 3);

    let starts = rig.device.source_starts();
    assert_eq!(starts.len(), 1);
    assert!(starts[0].looping);
    assert_eq!((starts[0].loop_start, starts[0].loop_end), (0.0, 0.5));
}

#[test]
fn test_enabling_loop_restarts_live_source() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let id = sfx.play().unwrap().unwrap();
    rig.scheduler.advance(ms(500));

    sfx.set_instance_loop(id, true).unwrap();
    assert!(sfx.instance_loop(id).unwrap());

    let starts = rig.device.source_starts();
    assert_eq!(starts.len(), 2);
    assert!(starts[1].looping);
    assert_relative_eq!(starts[1].offset, 0.5, epsilon = 1e-9);

    rig.scheduler.advance(ms(5000));
    assert!(sfx.playing(Some(id)).unwrap());
}

#[test]
fn test_rate_change_rearms_end_timer() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let events = record(&sfx, &[SoundEventKind::Rate, SoundEventKind::End]);

    let id = sfx.play().unwrap().unwrap();
    rig.scheduler.advance(ms(1000));
    sfx.set_instance_rate(id, 2.0).unwrap();
    assert_relative_eq!(sfx.seek(Some(id)).unwrap(), 1.0, epsilon = 1e-9);

    rig.scheduler.advance(ms(500));
    assert_relative_eq!(sfx.seek(Some(id)).unwrap(), 2.0, epsilon = 1e-9);
    assert!(sfx.playing(Some(id)).unwrap());

    // 2 s left at 2x
    rig.scheduler.advance(ms(499));
    assert!(sfx.playing(Some(id)).unwrap());
    rig.scheduler.advance(ms(2));
    assert!(!sfx.playing(Some(id)).unwrap());
    assert_eq!(count(&events, SoundEventKind::Rate), 1);
    assert_eq!(count(&events, SoundEventKind::End), 1);
}

#[test]
fn test_tiny_rate_pushes_end_out_of_reach() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let events = record(&sfx, &[SoundEventKind::End]);

    let id = sfx.play().unwrap().unwrap();
    sfx.set_rate(1e-20, Some(id)).unwrap();
    rig.scheduler.advance(ms(10_000));

    assert!(sfx.playing(Some(id)).unwrap());
    assert_eq!(count(&events, SoundEventKind::End), 0);
}

#[test]
fn test_group_mute_applies_to_instances() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let events = record(&sfx, &[SoundEventKind::Mute]);
    let a = sfx.play().unwrap().unwrap();
    let b = sfx.play().unwrap().unwrap();

    sfx.set_group_muted(true).unwrap();
    rig.scheduler.run_pending();
    assert!(sfx.group_muted().unwrap());
    assert!(sfx.instance_muted(a).unwrap() && sfx.instance_muted(b).unwrap());
    assert_eq!(count(&events, SoundEventKind::Mute), 2);

    sfx.set_instance_muted(b, false).unwrap();
    assert!(!sfx.instance_muted(b).unwrap());
    assert!(sfx.group_muted().unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════════
// LISTENERS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_once_and_instance_listeners() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]).with_sprite("blip", 0.0, 100.0));

    let once_hits = Arc::new(Mutex::new(0));
    let hits = Arc::clone(&once_hits);
    sfx.once(SoundEventKind::Play, move |_, _| *hits.lock() += 1)
        .unwrap();

    let a = sfx.play_sprite("blip").unwrap().unwrap();
    let only_a = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&only_a);
    sfx.on_instance(SoundEventKind::End, a, move |_, e| seen.lock().push(e.instance))
        .unwrap();
    let _b = sfx.play_sprite("blip").unwrap().unwrap();

    rig.scheduler.advance(ms(200));
    assert_eq!(*once_hits.lock(), 1);
    assert_eq!(*only_a.lock(), vec![Some(a)]);
}

#[test]
fn test_listener_may_call_back_into_group() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]).with_sprite("blip", 0.0, 100.0));
    let ends = record(&sfx, &[SoundEventKind::End]);

    // Replay once from inside the end listener
    let replayed = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&replayed);
    sfx.on(SoundEventKind::End, move |group, _| {
        let mut flag = flag.lock();
        if !*flag {
            *flag = true;
            group.play_sprite("blip").unwrap();
        }
    })
    .unwrap();

    sfx.play_sprite("blip").unwrap();
    rig.scheduler.advance(ms(500));
    assert_eq!(count(&ends, SoundEventKind::End), 2);
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEVICE SUSPEND / RESUME
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_play_on_suspended_device_waits_for_resume() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]).with_sprite("blip", 0.0, 100.0));
    let events = record(&sfx, &[SoundEventKind::Play, SoundEventKind::Volume]);

    sfx.play_sprite("blip").unwrap();
    rig.scheduler.advance(ms(200));
    rig.scheduler.advance(ms(30_001));
    assert_eq!(rig.registry.device_state(), DeviceState::Suspended);

    let id = sfx.play_sprite("blip").unwrap().unwrap();
    assert!(!sfx.playing(Some(id)).unwrap());

    // Queued behind the pending play
    sfx.set_group_volume(0.3).unwrap();
    assert_eq!(sfx.pending_actions().unwrap(), 1);

    rig.scheduler.run_pending();
    assert_eq!(rig.registry.device_state(), DeviceState::Running);
    assert!(sfx.playing(Some(id)).unwrap());
    assert_eq!(sfx.instance_volume(id).unwrap(), 0.3);
    assert_eq!(sfx.pending_actions().unwrap(), 0);

    let kinds: Vec<_> = events.lock().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SoundEventKind::Play,
            SoundEventKind::Play,
            SoundEventKind::Volume
        ]
    );
    assert_eq!(rig.device.resume_count(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// UNLOAD
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_unload_stops_playback_and_invalidates_group() {
    let rig = rig();
    let sfx = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let events = record(&sfx, &[SoundEventKind::Stop]);
    sfx.play().unwrap();

    sfx.unload().unwrap();
    rig.scheduler.run_pending();

    assert_eq!(count(&events, SoundEventKind::Stop), 1);
    assert_eq!(sfx.state(), LoadState::Unloaded);
    assert_eq!(rig.device.active_sources(), 0);
    assert_eq!(rig.device.live_gains(), 0);
    assert_eq!(rig.registry.group_count(), 0);

    assert_eq!(sfx.play(), Err(SoundError::Unloaded));
    assert_eq!(sfx.pause(None), Err(SoundError::Unloaded));
    assert_eq!(sfx.set_group_volume(0.5), Err(SoundError::Unloaded));
    assert_eq!(sfx.seek(None), Err(SoundError::Unloaded));
    assert!(sfx.on(SoundEventKind::Load, |_, _| {}).is_err());
}

#[test]
fn test_stop_all_and_unload_all() {
    let rig = rig();
    let a = loaded(&rig, SoundConfig::new(["sfx.webm"]));
    let b = loaded(&rig, SoundConfig::new(["music.mp3"]));
    a.play().unwrap();
    b.play().unwrap();

    rig.registry.stop_all();
    assert!(!a.playing(None).unwrap() && !b.playing(None).unwrap());

    rig.registry.unload_all();
    assert_eq!(a.state(), LoadState::Unloaded);
    assert_eq!(b.state(), LoadState::Unloaded);
    assert!(rig.device.is_closed());
    assert!(!rig.registry.has_device());
}

#[test]
fn test_config_from_json_drives_group() {
    let rig = rig();
    let config = SoundConfig::from_json(
        r#"{
            "src": ["missing.xyz", "sfx.webm"],
            "sprite": { "blip": [0, 250], "pad": [500, 1000, true] },
            "volume": 0.5,
            "pool": 3,
            "preload": true,
            "unknown": 1
        }"#,
    )
    .unwrap();
    let sfx = loaded(&rig, config);

    assert_eq!(sfx.source().unwrap().unwrap().url, "sfx.webm");
    assert_eq!(sfx.group_volume().unwrap(), 0.5);
    let id = sfx.play_sprite("pad").unwrap().unwrap();
    assert!(sfx.instance_loop(id).unwrap());
    assert_relative_eq!(sfx.duration(Some(id)).unwrap(), 1.0);
}
