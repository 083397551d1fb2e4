//! Group events and listener registry

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::group::SoundGroup;
use crate::instance::InstanceId;

/// Event names a group emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SoundEventKind {
    Load = 0,
    LoadError = 1,
    Play = 2,
    PlayError = 3,
    Pause = 4,
    Stop = 5,
    Mute = 6,
    Volume = 7,
    Rate = 8,
    Seek = 9,
    Fade = 10,
    End = 11,
    Unlock = 12,
}

impl SoundEventKind {
    pub const ALL: [SoundEventKind; 13] = [
        Self::Load,
        Self::LoadError,
        Self::Play,
        Self::PlayError,
        Self::Pause,
        Self::Stop,
        Self::Mute,
        Self::Volume,
        Self::Rate,
        Self::Seek,
        Self::Fade,
        Self::End,
        Self::Unlock,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::LoadError => "loaderror",
            Self::Play => "play",
            Self::PlayError => "playerror",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Mute => "mute",
            Self::Volume => "volume",
            Self::Rate => "rate",
            Self::Seek => "seek",
            Self::Fade => "fade",
            Self::End => "end",
            Self::Unlock => "unlock",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// One emitted event
#[derive(Debug, Clone, PartialEq)]
pub struct SoundEvent {
    pub kind: SoundEventKind,
    /// Instance the event concerns; `None` for group-wide events
    pub instance: Option<InstanceId>,
    /// Error text for `loaderror`/`playerror`
    pub message: Option<String>,
}

impl SoundEvent {
    pub fn new(kind: SoundEventKind, instance: Option<InstanceId>) -> Self {
        Self {
            kind,
            instance,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Listener callback
pub type ListenerFn = Arc<dyn Fn(&SoundGroup, &SoundEvent) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    callback: ListenerFn,
    /// Fire only for this instance
    instance: Option<InstanceId>,
    once: bool,
}

impl Listener {
    fn matches(&self, event: &SoundEvent) -> bool {
        // `load` is group-wide and reaches instance-bound listeners too
        event.kind == SoundEventKind::Load
            || self.instance.is_none()
            || self.instance == event.instance
    }
}

/// Per-group listener lists, kept in registration order
#[derive(Default)]
pub(crate) struct ListenerSet {
    listeners: HashMap<SoundEventKind, Vec<Listener>>,
    next_id: u64,
}

impl ListenerSet {
    pub fn add(
        &mut self,
        kind: SoundEventKind,
        callback: ListenerFn,
        instance: Option<InstanceId>,
        once: bool,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.entry(kind).or_default().push(Listener {
            id,
            callback,
            instance,
            once,
        });
        id
    }

    pub fn remove(&mut self, kind: SoundEventKind, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != id);
        before != list.len()
    }

    pub fn clear(&mut self, kind: SoundEventKind) {
        self.listeners.remove(&kind);
    }

    pub fn clear_all(&mut self) {
        self.listeners.clear();
    }

    pub fn count(&self, kind: SoundEventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Collect callbacks for `event`, dropping matched one-shot listeners
    pub fn take_matching(&mut self, event: &SoundEvent) -> Vec<ListenerFn> {
        let Some(list) = self.listeners.get_mut(&event.kind) else {
            return Vec::new();
        };

        let mut fired = Vec::new();
        list.retain(|listener| {
            if !listener.matches(event) {
                return true;
            }
            fired.push(Arc::clone(&listener.callback));
            !listener.once
        });
        fired
    }
}
