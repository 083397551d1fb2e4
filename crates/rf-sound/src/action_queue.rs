//! Deferred commands
//!
//! Commands issued while a group is still loading, or while a pending play
//! holds the play lock, wait here in FIFO order. Only the head runs at a
//! time. A command that completes synchronously is popped right away; one
//! that finishes asynchronously (play) stays in flight until its completion
//! event is emitted.

use std::collections::VecDeque;

use crate::events::SoundEventKind;
use crate::instance::InstanceId;

/// What `play` should start
#[derive(Debug, Clone, PartialEq)]
pub enum PlayTarget {
    /// Resume the single paused instance, or start `__default`
    Default,
    /// Start a named sprite on a pooled instance
    Sprite(String),
    /// Resume or restart a specific instance
    Instance(InstanceId),
}

impl From<InstanceId> for PlayTarget {
    fn from(id: InstanceId) -> Self {
        PlayTarget::Instance(id)
    }
}

impl From<&str> for PlayTarget {
    fn from(name: &str) -> Self {
        PlayTarget::Sprite(name.to_string())
    }
}

/// A command captured for later execution
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredCommand {
    Play(PlayTarget),
    Pause(Option<InstanceId>),
    Stop(Option<InstanceId>),
    Mute {
        muted: bool,
        instance: Option<InstanceId>,
    },
    Volume {
        volume: f32,
        instance: Option<InstanceId>,
    },
    Rate {
        rate: f64,
        instance: Option<InstanceId>,
    },
    Loop {
        looping: bool,
        instance: Option<InstanceId>,
    },
    Seek {
        position: f64,
        instance: Option<InstanceId>,
    },
    Fade {
        from: f32,
        to: f32,
        duration_ms: f64,
        instance: Option<InstanceId>,
    },
}

impl DeferredCommand {
    /// Event whose emission marks this command complete
    pub fn trigger(&self) -> SoundEventKind {
        match self {
            Self::Play(_) => SoundEventKind::Play,
            Self::Pause(_) => SoundEventKind::Pause,
            Self::Stop(_) => SoundEventKind::Stop,
            Self::Mute { .. } => SoundEventKind::Mute,
            Self::Volume { .. } => SoundEventKind::Volume,
            Self::Rate { .. } => SoundEventKind::Rate,
            // No loop event exists; a loop write always completes synchronously
            Self::Loop { .. } => SoundEventKind::Play,
            Self::Seek { .. } => SoundEventKind::Seek,
            Self::Fade { .. } => SoundEventKind::Fade,
        }
    }
}

#[derive(Debug, Clone)]
struct QueuedAction {
    trigger: SoundEventKind,
    command: DeferredCommand,
    in_flight: bool,
}

impl QueuedAction {
    fn completed_by(&self, kind: SoundEventKind) -> bool {
        // A rejected play completes its queued play
        kind == self.trigger
            || (self.trigger == SoundEventKind::Play && kind == SoundEventKind::PlayError)
    }
}

/// FIFO of deferred commands with at most one in flight
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: VecDeque<QueuedAction>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, command: DeferredCommand) {
        log::debug!("[Sound] Deferring {:?}", command);
        self.actions.push_back(QueuedAction {
            trigger: command.trigger(),
            command,
            in_flight: false,
        });
    }

    /// Advance the queue.
    ///
    /// `fired` is the event just emitted, if any. It retires the in-flight
    /// head when it matches that head's trigger. Then, if the head is idle,
    /// it is marked in flight and its command returned for execution.
    pub fn next_ready(&mut self, fired: Option<SoundEventKind>) -> Option<DeferredCommand> {
        if let (Some(kind), Some(head)) = (fired, self.actions.front()) {
            if head.in_flight && head.completed_by(kind) {
                self.actions.pop_front();
            }
        }

        let head = self.actions.front_mut()?;
        if head.in_flight {
            return None;
        }
        head.in_flight = true;
        Some(head.command.clone())
    }

    /// The in-flight head finished without emitting its trigger
    pub fn complete_head(&mut self) {
        if self.actions.front().is_some_and(|a| a.in_flight) {
            self.actions.pop_front();
        }
    }

    /// The in-flight head could not run yet; leave it for a later drain
    pub fn release_head(&mut self) {
        if let Some(head) = self.actions.front_mut() {
            head.in_flight = false;
        }
    }

    pub fn commands(&self) -> impl Iterator<Item = &DeferredCommand> {
        self.actions.iter().map(|a| &a.command)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
