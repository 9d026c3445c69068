//! Pad state machine
//!
//! One physical pad on the LPD8. Commands (`set_on`, `set_off`,
//! `set_blinking`) drive the pad LED through the device's MIDI output;
//! hardware-originated note-on/off messages are raised to observers without
//! touching the locally-tracked intent. The two directions are independent:
//! hardware echoes are never folded back into local state.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::midi::MidiMessage;
use crate::transport::MidiSink;

/// Default velocity for pad commands
pub const FULL_VELOCITY: u8 = 127;

/// Default blink interval
pub const BLINK_INTERVAL: Duration = Duration::from_millis(600);

/// Observer for hardware pad events, invoked with the raw message
pub type PadListener = Arc<dyn Fn(&MidiMessage) + Send + Sync>;

struct PadState {
    /// At most one active blink timer; aborted before any other command acts
    blink: Option<JoinHandle<()>>,
    on_listeners: Vec<PadListener>,
    off_listeners: Vec<PadListener>,
}

/// One physical pad, owned by the device driver for its lifetime
pub struct Pad {
    code: u8,
    channel: u8,
    output: Arc<dyn MidiSink>,
    state: Mutex<PadState>,
}

impl Pad {
    pub(crate) fn new(code: u8, channel: u8, output: Arc<dyn MidiSink>) -> Arc<Self> {
        Arc::new(Self {
            code,
            channel,
            output,
            state: Mutex::new(PadState {
                blink: None,
                on_listeners: Vec::new(),
                off_listeners: Vec::new(),
            }),
        })
    }

    /// Hardware note code for this pad
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Subscribe to hardware pad-on events
    pub fn on_on(&self, listener: impl Fn(&MidiMessage) + Send + Sync + 'static) {
        self.state.lock().on_listeners.push(Arc::new(listener));
    }

    /// Subscribe to hardware pad-off events
    pub fn on_off(&self, listener: impl Fn(&MidiMessage) + Send + Sync + 'static) {
        self.state.lock().off_listeners.push(Arc::new(listener));
    }

    /// Cancel any blink timer and light the pad
    pub fn set_on(&self, velocity: u8) -> Result<()> {
        self.cancel_blink();
        self.send_state(true, velocity)
    }

    /// Cancel any blink timer and darken the pad
    pub fn set_off(&self, velocity: u8) -> Result<()> {
        self.cancel_blink();
        self.send_state(false, velocity)
    }

    /// Start blinking: send `initial` immediately, then flip the emitted
    /// phase every `interval`.
    ///
    /// The flip reads the previous emitted phase held by the blink task
    /// itself - it never re-queries hardware state. A prior blink timer is
    /// always cancelled before the new one is armed.
    pub fn set_blinking(&self, initial: bool, interval: Duration, velocity: u8) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(handle) = state.blink.take() {
            handle.abort();
        }

        self.send_state(initial, velocity)?;

        let output = Arc::clone(&self.output);
        let code = self.code;
        let channel = self.channel;
        let mut phase = initial;

        state.blink = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; the initial state was
            // already sent synchronously above.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                phase = !phase;
                let message = note_message(phase, code, channel, velocity);
                if let Err(e) = output.send(&message) {
                    warn!("pad {} blink send failed: {:#}", code, e);
                }
            }
        }));

        Ok(())
    }

    /// Raise a hardware pad-on event to observers, in subscription order
    pub(crate) fn raise_on(&self, message: &MidiMessage) {
        let listeners = self.state.lock().on_listeners.clone();
        for listener in listeners {
            listener(message);
        }
    }

    /// Raise a hardware pad-off event to observers, in subscription order
    pub(crate) fn raise_off(&self, message: &MidiMessage) {
        let listeners = self.state.lock().off_listeners.clone();
        for listener in listeners {
            listener(message);
        }
    }

    fn cancel_blink(&self) {
        if let Some(handle) = self.state.lock().blink.take() {
            handle.abort();
        }
    }

    fn send_state(&self, on: bool, velocity: u8) -> Result<()> {
        self.output
            .send(&note_message(on, self.code, self.channel, velocity))
    }
}

impl Drop for Pad {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().blink.take() {
            handle.abort();
        }
    }
}

fn note_message(on: bool, note: u8, channel: u8, velocity: u8) -> MidiMessage {
    if on {
        MidiMessage::NoteOn { channel, note, velocity }
    } else {
        MidiMessage::NoteOff { channel, note, velocity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{MemorySink, UnavailableSink};

    fn is_on(message: &MidiMessage) -> bool {
        matches!(message, MidiMessage::NoteOn { .. })
    }

    #[tokio::test(start_paused = true)]
    async fn test_blinking_alternates_until_cancelled() {
        let sink = MemorySink::new();
        let pad = Pad::new(44, 0, sink.clone());

        pad.set_blinking(true, Duration::from_millis(100), FULL_VELOCITY)
            .unwrap();

        // t=0: initial on. Flips at 100 and 200.
        tokio::time::sleep(Duration::from_millis(250)).await;

        let messages = sink.messages();
        assert_eq!(messages.len(), 3);
        assert!(is_on(&messages[0]));
        assert!(!is_on(&messages[1]));
        assert!(is_on(&messages[2]));

        // set_on cancels the blink timer; no further alternation
        pad.set_on(FULL_VELOCITY).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let messages = sink.messages();
        assert_eq!(messages.len(), 4);
        assert!(is_on(&messages[3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reblinking_replaces_timer() {
        let sink = MemorySink::new();
        let pad = Pad::new(44, 0, sink.clone());

        pad.set_blinking(true, Duration::from_millis(100), FULL_VELOCITY)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Re-arming resets the phase and interval; the old timer must not
        // fire at its earlier 100ms boundary.
        pad.set_blinking(false, Duration::from_millis(300), FULL_VELOCITY)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(320)).await;

        let messages = sink.messages();
        // on@0, off@50 (new initial), on@350
        assert_eq!(messages.len(), 3);
        assert!(is_on(&messages[0]));
        assert!(!is_on(&messages[1]));
        assert!(is_on(&messages[2]));
    }

    #[tokio::test]
    async fn test_set_commands_send_one_message() {
        let sink = MemorySink::new();
        let pad = Pad::new(44, 0, sink.clone());

        pad.set_on(100).unwrap();
        pad.set_off(FULL_VELOCITY).unwrap();

        let messages = sink.messages();
        assert_eq!(
            messages,
            vec![
                MidiMessage::NoteOn { channel: 0, note: 44, velocity: 100 },
                MidiMessage::NoteOff { channel: 0, note: 44, velocity: 127 },
            ]
        );
    }

    #[tokio::test]
    async fn test_send_failure_propagates() {
        let pad = Pad::new(44, 0, Arc::new(UnavailableSink));
        assert!(pad.set_on(FULL_VELOCITY).is_err());
    }

    #[tokio::test]
    async fn test_observers_fire_in_subscription_order() {
        let sink = MemorySink::new();
        let pad = Pad::new(44, 0, sink);

        let order: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        for tag in [1u8, 2, 3] {
            let order = Arc::clone(&order);
            pad.on_on(move |_| order.lock().push(tag));
        }

        pad.raise_on(&MidiMessage::NoteOn { channel: 0, note: 44, velocity: 90 });
        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }
}
