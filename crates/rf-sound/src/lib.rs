//! FluxForge Sound Playback Engine
//!
//! Sprite-based sound playback over two interchangeable backends:
//! - Audio graph: decoded buffers played through per-instance gain nodes
//! - Media elements: streaming players, pooled and unlocked on user gesture
//! - Sound groups with pooled instances, sprites, fades, rate and looping
//! - Action queue replaying commands issued before a group finished loading
//! - Device auto-suspend after idle time, auto-resume on playback
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    SOUND ENGINE ARCHITECTURE                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   Host                                                           │
//! │   ┌─────────────────┐     ┌──────────────────────────────┐      │
//! │   │ play()/pause()  │────▶│ SoundGroup                   │      │
//! │   │ fade()/rate()   │     │ ├── SpriteTable              │      │
//! │   │ on(event)       │◀────│ ├── Instances (pool)         │      │
//! │   └─────────────────┘     │ ├── ActionQueue              │      │
//! │                           │ └── Listeners                │      │
//! │                           └──────────────┬───────────────┘      │
//! │                                          │                       │
//! │   ┌──────────────────────────────────────▼───────────────────┐  │
//! │   │ DeviceRegistry: master gain, element pool, asset cache,  │  │
//! │   │                 suspend/resume, codec table              │  │
//! │   └───────────────┬─────────────────────────┬────────────────┘  │
//! │                   │                         │                    │
//! │          ┌────────▼────────┐       ┌────────▼────────┐          │
//! │          │  AudioDevice    │       │ ElementFactory  │          │
//! │          │  (graph)        │       │ (media element) │          │
//! │          └─────────────────┘       └─────────────────┘          │
//! │                                                                  │
//! │   Scheduler: one cooperative loop for events, timers, callbacks  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rf_sound::{DeviceRegistry, Scheduler, SoundConfig, SoundGroup, SoundEventKind};
//! use rf_sound::backend::headless::HeadlessDevice;
//!
//! let scheduler = Scheduler::new();
//! let device = Arc::new(HeadlessDevice::new(&scheduler).with_asset("ui.webm", 4.0));
//! let registry = DeviceRegistry::new(&scheduler).with_device(device);
//!
//! let sfx = SoundGroup::new(
//!     &registry,
//!     SoundConfig::new(["ui.webm"]).with_sprite("click", 0.0, 120.0),
//! )?;
//! sfx.on(SoundEventKind::End, |_, event| log::info!("ended {:?}", event.instance))?;
//!
//! // Returns an id right away, even before the asset is decoded
//! let id = sfx.play_sprite("click")?;
//!
//! // Drive events and timers
//! scheduler.advance(Duration::from_millis(200));
//! ```

pub mod action_queue;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod fade;
pub mod group;
pub mod instance;
pub mod registry;
pub mod scheduler;
pub mod source;
pub mod sprite;

// Re-exports
pub use action_queue::{DeferredCommand, PlayTarget};
pub use backend::{
    AudioDevice, BufferSource, CodecSupport, CodecTable, DecodedAsset, ElementEvent,
    ElementFactory, GainNode, MediaElement, PlayRequest,
};
pub use config::{Preload, RegistryConfig, SoundConfig, SpriteDef};
pub use error::{LoadError, PlaybackError, SoundError, SoundResult};
pub use events::{ListenerId, SoundEvent, SoundEventKind};
pub use group::{Backend, LoadState, SoundGroup};
pub use instance::{InstanceId, InstanceStatus};
pub use registry::{DeviceRegistry, DeviceState, GroupId};
pub use scheduler::{Scheduler, TimerId};
pub use source::ResolvedSource;
pub use sprite::{DEFAULT_SPRITE, Sprite};
