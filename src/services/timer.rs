//! Timer supervisor.
//! Thread-backed countdown that fires a timeout callback at most once.
//! Restarting the countdown for the same context is a no-op while it is
//! still live, so a UI re-render never resets the visible remaining time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::models::{TimerConfig, TimerMode};

const TICK: Duration = Duration::from_millis(200);

struct ActiveCountdown {
    context: String,
    deadline: Instant,
    /// Flips exactly once, to whichever of `cancel()` or the worker's
    /// deadline claim gets there first. A countdown settled by a cancel
    /// never fires.
    settled: Arc<AtomicBool>,
}

#[derive(Default)]
pub struct TimerSupervisor {
    active: Mutex<Option<ActiveCountdown>>,
}

impl TimerSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a countdown for `context` (a question id, or the quiz id for a
    /// quiz-scoped timer). A `none` mode or zero limit is a no-op. If the
    /// same context already has a live countdown the call is a no-op and
    /// elapsed time is preserved; a different context replaces the old
    /// countdown.
    pub fn start<F>(&self, context: &str, config: &TimerConfig, on_timeout: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if config.mode == TimerMode::None || config.limit_seconds == 0 {
            return;
        }

        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(current) = active.as_ref() {
            let live = !current.settled.load(Ordering::Acquire)
                && Instant::now() < current.deadline;
            if live && current.context == context {
                return;
            }
            current.settled.store(true, Ordering::Release);
        }

        let settled = Arc::new(AtomicBool::new(false));
        let deadline = Instant::now() + Duration::from_secs(config.limit_seconds);
        debug!("countdown started for {context} ({}s)", config.limit_seconds);

        let flag = Arc::clone(&settled);
        thread::spawn(move || {
            loop {
                if flag.load(Ordering::Acquire) {
                    return;
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                thread::sleep(remaining.min(TICK));
            }
            // claim the countdown atomically; a cancel that settled it
            // first wins and the callback stays unfired
            if flag
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                on_timeout();
            }
        });

        *active = Some(ActiveCountdown {
            context: context.to_string(),
            deadline,
            settled,
        });
    }

    /// Stops the live countdown, if any. Safe to call redundantly; a
    /// cancelled countdown never fires its callback.
    pub fn cancel(&self) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(current) = active.take() {
            if current
                .settled
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                debug!("countdown for {} cancelled", current.context);
            }
        }
    }

    /// Time left on the live countdown; `None` when idle, cancelled or
    /// already expired.
    pub fn remaining(&self) -> Option<Duration> {
        let active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        active.as_ref().and_then(|current| {
            if current.settled.load(Ordering::Acquire) {
                return None;
            }
            let left = current.deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                None
            } else {
                Some(left)
            }
        })
    }
}
