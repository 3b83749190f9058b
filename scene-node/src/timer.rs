//! Timer handles shared between nodes and the scheduler

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Callback run each time a timer fires
pub type TimerCallback = Box<dyn Fn(&Timer) + Send + Sync>;

/// A repeating or one-shot timer
///
/// Timers are reference counted: the owning node keeps one reference in its
/// timer list and the scheduler holds another while the timer is active.
pub struct Timer {
    id: u64,
    interval: f32,
    one_shot: bool,
    done: AtomicBool,
    paused: AtomicBool,
    callback: Option<TimerCallback>,
}

impl Timer {
    /// Create a repeating timer firing every `interval` seconds
    pub fn new(interval: f32, callback: Option<TimerCallback>) -> Arc<Self> {
        Arc::new(Self::build(interval, false, callback))
    }

    /// Create a timer that fires once and is then done until reset
    pub fn one_shot(interval: f32, callback: Option<TimerCallback>) -> Arc<Self> {
        Arc::new(Self::build(interval, true, callback))
    }

    fn build(interval: f32, one_shot: bool, callback: Option<TimerCallback>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            interval,
            one_shot,
            done: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            callback,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Seconds between firings
    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn is_one_shot(&self) -> bool {
        self.one_shot
    }

    /// True once a one-shot timer has fired
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Make a finished one-shot timer eligible to fire again
    pub fn reset(&self) {
        self.done.store(false, Ordering::Release);
    }

    /// Run the callback, called by the scheduler when the interval elapses
    ///
    /// Returns false when nothing ran because the timer is paused or done.
    pub fn fire(&self) -> bool {
        if self.is_paused() || self.is_done() {
            return false;
        }

        if let Some(callback) = &self.callback {
            callback(self);
        }

        if self.one_shot {
            self.done.store(true, Ordering::Release);
        }
        true
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id)
            .field("interval", &self.interval)
            .field("one_shot", &self.one_shot)
            .field("done", &self.is_done())
            .field("paused", &self.is_paused())
            .finish()
    }
}
