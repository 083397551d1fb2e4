//! Cooperative task scheduler
//!
//! All engine work runs on one logical thread. Backends and timers never call
//! into a group directly; they post a task here and the host drives the
//! queue with [`Scheduler::run_pending`] / [`Scheduler::advance`].
//!
//! ```text
//!   backend thread ──Callback::call──┐
//!   timer deadline ──────────────────┼──▶ ready queue ──▶ run_pending()
//!   group.emit() ──post──────────────┘        (FIFO, no locks held)
//! ```
//!
//! The clock is virtual: it only moves when `advance` is called. A host with
//! a real event loop advances it by the wall time elapsed between frames.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shortest allowed interval period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

type Task = Box<dyn FnOnce() + Send + 'static>;
type RepeatingTask = Arc<dyn Fn() + Send + Sync + 'static>;

/// Handle for a pending timeout or interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

enum TimerTask {
    Once(Task),
    Every {
        period: Duration,
        task: RepeatingTask,
    },
}

enum DueTask {
    Once(Task),
    Every(RepeatingTask),
}

struct SchedulerState {
    now: Duration,
    next_timer: u64,
    ready: VecDeque<Task>,
    /// Ordered by (deadline, arming sequence)
    timers: BTreeMap<(Duration, u64), (TimerId, TimerTask)>,
    deadlines: HashMap<TimerId, (Duration, u64)>,
}

/// Shared handle to the task queue and virtual clock
#[derive(Clone)]
pub struct Scheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                now: Duration::ZERO,
                next_timer: 1,
                ready: VecDeque::new(),
                timers: BTreeMap::new(),
                deadlines: HashMap::new(),
            })),
        }
    }

    /// Current virtual time
    #[inline]
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    #[inline]
    pub fn now_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }

    #[inline]
    pub fn now_ms(&self) -> f64 {
        self.now().as_secs_f64() * 1000.0
    }

    /// Queue a task for the next tick
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.state.lock().ready.push_back(Box::new(task));
    }

    /// Run `task` once after `delay`
    pub fn set_timeout(&self, delay: Duration, task: impl FnOnce() + Send + 'static) -> TimerId {
        self.arm(delay, TimerTask::Once(Box::new(task)))
    }

    /// Run `task` every `period` until cleared
    pub fn set_interval(&self, period: Duration, task: impl Fn() + Send + Sync + 'static) -> TimerId {
        let period = period.max(MIN_INTERVAL);
        self.arm(
            period,
            TimerTask::Every {
                period,
                task: Arc::new(task),
            },
        )
    }

    /// Cancel a timer. Returns false if it already fired or was cleared.
    pub fn clear(&self, id: TimerId) -> bool {
        let mut state = self.state.lock();
        match state.deadlines.remove(&id) {
            Some(key) => {
                state.timers.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Number of armed timers
    pub fn pending_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Number of tasks waiting in the ready queue
    pub fn pending_tasks(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Drain the ready queue, including tasks posted while draining
    pub fn run_pending(&self) {
        loop {
            let task = self.state.lock().ready.pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Move the clock forward, firing due timers in deadline order
    pub fn advance(&self, by: Duration) {
        let target = self.now().saturating_add(by);
        self.run_pending();

        while let Some(due) = self.pop_due(target) {
            match due {
                DueTask::Once(task) => task(),
                DueTask::Every(task) => task(),
            }
            self.run_pending();
        }

        {
            let mut state = self.state.lock();
            if state.now < target {
                state.now = target;
            }
        }
        self.run_pending();
    }

    /// Advance in fixed steps, e.g. to emulate a frame loop
    pub fn advance_in_steps(&self, total: Duration, step: Duration) {
        let step = step.max(MIN_INTERVAL);
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            let slice = step.min(total - elapsed);
            self.advance(slice);
            elapsed += slice;
        }
    }

    fn arm(&self, delay: Duration, task: TimerTask) -> TimerId {
        let mut state = self.state.lock();
        let seq = state.next_timer;
        state.next_timer += 1;
        let id = TimerId(seq);
        let key = (state.now.saturating_add(delay), seq);
        state.timers.insert(key, (id, task));
        state.deadlines.insert(id, key);
        id
    }

    fn pop_due(&self, target: Duration) -> Option<DueTask> {
        let mut state = self.state.lock();
        let key = *state.timers.keys().next()?;
        if key.0 > target {
            return None;
        }
        let (id, task) = state.timers.remove(&key)?;
        state.deadlines.remove(&id);
        if state.now < key.0 {
            state.now = key.0;
        }

        Some(match task {
            TimerTask::Once(task) => DueTask::Once(task),
            TimerTask::Every { period, task } => {
                // An interval pinned at the end of time fires once
                if key.0 == Duration::MAX {
                    return Some(DueTask::Every(task));
                }
                let seq = state.next_timer;
                state.next_timer += 1;
                let next = (key.0.saturating_add(period), seq);
                state.timers.insert(
                    next,
                    (
                        id,
                        TimerTask::Every {
                            period,
                            task: Arc::clone(&task),
                        },
                    ),
                );
                state.deadlines.insert(id, next);
                DueTask::Every(task)
            }
        })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Scheduler")
            .field("now", &state.now)
            .field("ready", &state.ready.len())
            .field("timers", &state.timers.len())
            .finish()
    }
}

/// Convert engine milliseconds to a timer delay. `None` for infinite waits;
/// finite waits beyond `Duration::MAX` saturate.
pub(crate) fn delay_from_ms(ms: f64) -> Option<Duration> {
    if ms.is_finite() {
        Some(Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX))
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALLBACK
// ═══════════════════════════════════════════════════════════════════════════════

/// Completion sink handed to backends.
///
/// Calling it never runs engine code inline; the handler is posted to the
/// scheduler, so it is safe to call from any thread or from inside a backend
/// method the engine is currently executing.
pub struct Callback<T> {
    scheduler: Scheduler,
    handler: Arc<dyn Fn(T) + Send + Sync + 'static>,
}

impl<T: Send + 'static> Callback<T> {
    pub fn new(scheduler: &Scheduler, handler: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            scheduler: scheduler.clone(),
            handler: Arc::new(handler),
        }
    }

    pub fn call(&self, value: T) {
        let handler = Arc::clone(&self.handler);
        self.scheduler.post(move || handler(value));
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}
