//! One-shot Absolute-deadline Timer
//!
//! A background thread that runs an action once the armed deadline passes.
//! Arming again replaces the previous deadline; disarming cancels it. The
//! action executes on the timer thread, so it must only enqueue a message and
//! never touch node-private state.
//!
//! Dropping the timer stops and joins its thread.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Default)]
struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
    fired: u64,
}

#[derive(Default)]
struct Shared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// Re-armable single-shot timer
pub struct OneShotTimer {
    name: String,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl OneShotTimer {
    /// Start the timer thread, initially disarmed
    pub fn spawn<F>(name: impl Into<String>, action: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let shared = Arc::new(Shared::default());
        let thread = thread::Builder::new().name(name.clone()).spawn({
            let shared = Arc::clone(&shared);
            move || timer_loop(&shared, action)
        })?;

        Ok(Self {
            name,
            shared,
            thread: Some(thread),
        })
    }

    /// Fire at `deadline`, replacing any earlier arming
    pub fn arm_at(&self, deadline: Instant) {
        self.shared.state.lock().deadline = Some(deadline);
        self.shared.wake.notify_all();
    }

    /// Fire once `delay` has elapsed
    pub fn arm_after(&self, delay: Duration) {
        self.arm_at(Instant::now() + delay);
    }

    pub fn disarm(&self) {
        self.shared.state.lock().deadline = None;
        self.shared.wake.notify_all();
    }

    /// Currently armed deadline
    pub fn deadline(&self) -> Option<Instant> {
        self.shared.state.lock().deadline
    }

    /// How many times the action has run
    pub fn fired(&self) -> u64 {
        self.shared.state.lock().fired
    }
}

fn timer_loop<F: FnMut()>(shared: &Shared, mut action: F) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }
        let deadline = state.deadline;
        match deadline {
            None => shared.wake.wait(&mut state),
            Some(deadline) if Instant::now() >= deadline => {
                state.deadline = None;
                state.fired += 1;
                trace!(fired = state.fired, "Timer fired");
                // arming from other threads stays possible while the action runs
                MutexGuard::unlocked(&mut state, &mut action);
            }
            Some(deadline) => {
                shared.wake.wait_until(&mut state, deadline);
            }
        }
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wake.notify_all();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl fmt::Debug for OneShotTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShotTimer")
            .field("name", &self.name)
            .field("deadline", &self.deadline())
            .field("fired", &self.fired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_fires_once_at_deadline() {
        let (tx, rx) = mpsc::channel();
        let timer = OneShotTimer::spawn("test-timer", move || {
            let _ = tx.send(Instant::now());
        })
        .unwrap();

        let armed_at = Instant::now();
        timer.arm_after(Duration::from_millis(40));

        let fired_at = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(fired_at.duration_since(armed_at) >= Duration::from_millis(40));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(timer.fired(), 1);
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let (tx, rx) = mpsc::channel();
        let timer = OneShotTimer::spawn("test-timer", move || {
            let _ = tx.send(Instant::now());
        })
        .unwrap();

        let start = Instant::now();
        timer.arm_after(Duration::from_millis(30));
        timer.arm_after(Duration::from_millis(120));

        let fired_at = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(fired_at.duration_since(start) >= Duration::from_millis(120));
        assert_eq!(timer.fired(), 1);
    }

    #[test]
    fn test_disarm_cancels() {
        let (tx, rx) = mpsc::channel::<()>();
        let timer = OneShotTimer::spawn("test-timer", move || {
            let _ = tx.send(());
        })
        .unwrap();

        timer.arm_after(Duration::from_millis(30));
        timer.disarm();
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
        assert_eq!(timer.fired(), 0);
    }

    #[test]
    fn test_past_deadline_fires_immediately() {
        let (tx, rx) = mpsc::channel::<()>();
        let timer = OneShotTimer::spawn("test-timer", move || {
            let _ = tx.send(());
        })
        .unwrap();

        timer.arm_at(Instant::now() - Duration::from_millis(10));
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_ok());
    }

    #[test]
    fn test_drop_joins_armed_timer() {
        let timer = OneShotTimer::spawn("test-timer", || {}).unwrap();
        timer.arm_after(Duration::from_secs(60));
        let start = Instant::now();
        drop(timer);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
