//! Knob with trailing-edge throttle
//!
//! Hardware control-change messages for a knob's code reschedule a 150 ms
//! timer; only the last value seen before a quiet window closes is delivered
//! to listeners. Rapid continuous motion therefore produces a steady trickle
//! of events, each carrying the latest value, rather than one per message.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Quiet window before a value is delivered
pub const THROTTLE_WINDOW: Duration = Duration::from_millis(150);

/// Observer for throttled knob changes
pub type KnobListener = Arc<dyn Fn(u8) + Send + Sync>;

struct KnobState {
    /// At most one pending throttle timer; replaced, never stacked
    throttle: Option<JoinHandle<()>>,
    listeners: Vec<KnobListener>,
}

/// One physical knob, owned by the device driver for its lifetime
pub struct Knob {
    code: u8,
    // Shared with the throttle task so it can clear its own handle
    state: Arc<Mutex<KnobState>>,
}

impl Knob {
    pub(crate) fn new(code: u8) -> Arc<Self> {
        Arc::new(Self {
            code,
            state: Arc::new(Mutex::new(KnobState {
                throttle: None,
                listeners: Vec::new(),
            })),
        })
    }

    /// Hardware CC code for this knob
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Subscribe to throttled change events
    pub fn on_change(&self, listener: impl Fn(u8) + Send + Sync + 'static) {
        self.state.lock().listeners.push(Arc::new(listener));
    }

    /// Feed a hardware control-change value into the throttle.
    ///
    /// Cancels any pending timer before arming a new one, so a burst of
    /// messages collapses to a single delivery of the last value.
    pub(crate) fn input(&self, value: u8) {
        trace!("knob {}: value {} (throttling)", self.code, value);

        let mut state = self.state.lock();
        if let Some(handle) = state.throttle.take() {
            handle.abort();
        }

        let shared = Arc::clone(&self.state);
        state.throttle = Some(tokio::spawn(async move {
            tokio::time::sleep(THROTTLE_WINDOW).await;
            let listeners = {
                let mut state = shared.lock();
                state.throttle = None;
                state.listeners.clone()
            };
            for listener in listeners {
                listener(value);
            }
        }));
    }
}

impl Drop for Knob {
    fn drop(&mut self) {
        if let Some(handle) = self.state.lock().throttle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(knob: &Knob) -> Arc<Mutex<Vec<u8>>> {
        let values: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&values);
        knob.on_change(move |v| sink.lock().push(v));
        values
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_value() {
        let knob = Knob::new(1);
        let values = collect(&knob);

        // Messages at t=0, 50, 140; window closes at 140+150=290
        knob.input(10);
        tokio::time::sleep(Duration::from_millis(50)).await;
        knob.input(20);
        tokio::time::sleep(Duration::from_millis(90)).await;
        knob.input(30);

        tokio::time::sleep(Duration::from_millis(149)).await;
        assert!(values.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*values.lock(), vec![30]);

        // Nothing further without new input
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*values.lock(), vec![30]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_quiet_windows_each_deliver() {
        let knob = Knob::new(1);
        let values = collect(&knob);

        knob.input(10);
        tokio::time::sleep(Duration::from_millis(200)).await;
        knob.input(20);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(*values.lock(), vec![10, 20]);
    }
}
