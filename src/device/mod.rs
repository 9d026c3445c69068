//! LPD8 device driver
//!
//! Owns the MIDI port for one device, the registries of [`Pad`]/[`Knob`]
//! entities keyed by hardware code, and the inbound dispatch loop. Entities
//! are created lazily on first reference and live as long as the device; the
//! registries grow monotonically and are mutated only here.

mod knob;
mod pad;
mod program;

pub use knob::{Knob, THROTTLE_WINDOW};
pub use pad::{Pad, BLINK_INTERVAL, FULL_VELOCITY};
pub use program::{Program, PROG_1, PROG_2, PROG_3, PROG_4};

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::midi::MidiMessage;
use crate::transport::MidiSink;

/// Device driver for one LPD8
pub struct Lpd8 {
    name: String,
    program: Program,
    channel: u8,
    output: Arc<dyn MidiSink>,
    /// Pads keyed by hardware note code, created on first access
    pads: Mutex<HashMap<u8, Arc<Pad>>>,
    /// Knobs keyed by hardware CC code, created on first access
    knobs: Mutex<HashMap<u8, Arc<Knob>>>,
}

impl Lpd8 {
    pub fn new(
        name: impl Into<String>,
        program: Program,
        channel: u8,
        output: Arc<dyn MidiSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            program,
            channel,
            output,
            pads: Mutex::new(HashMap::new()),
            knobs: Mutex::new(HashMap::new()),
        })
    }

    /// Device name (the MIDI port pattern it was opened with)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a human pad label ("pad 1", "p3", ...) through the active
    /// program. Malformed labels and out-of-range ordinals yield `None`;
    /// callers must check.
    pub fn get_pad(&self, label: &str) -> Option<Arc<Pad>> {
        let ordinal = pad_label_ordinal(label)?;
        let code = self.program.pad_code(ordinal)?;
        Some(self.pad_by_code(code))
    }

    /// Resolve a human knob label ("knob 1", "k3", ...) through the active
    /// program. Malformed labels and out-of-range ordinals yield `None`.
    pub fn get_knob(&self, label: &str) -> Option<Arc<Knob>> {
        let ordinal = knob_label_ordinal(label)?;
        let code = self.program.knob_code(ordinal)?;
        Some(self.knob_by_code(code))
    }

    /// Pad for a hardware note code, created if absent
    pub fn pad_by_code(&self, code: u8) -> Arc<Pad> {
        let mut pads = self.pads.lock();
        Arc::clone(
            pads.entry(code)
                .or_insert_with(|| Pad::new(code, self.channel, Arc::clone(&self.output))),
        )
    }

    /// Knob for a hardware CC code, created if absent
    pub fn knob_by_code(&self, code: u8) -> Arc<Knob> {
        let mut knobs = self.knobs.lock();
        Arc::clone(knobs.entry(code).or_insert_with(|| Knob::new(code)))
    }

    /// Sole outbound path; used by `Pad::set_*` and nothing else
    pub fn send_midi(&self, message: &MidiMessage) -> Result<()> {
        self.output.send(message)
    }

    /// Pump inbound messages through [`dispatch`](Self::dispatch) on a task
    pub fn spawn_dispatch(self: &Arc<Self>, mut rx: mpsc::Receiver<MidiMessage>) -> JoinHandle<()> {
        let device = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                device.dispatch(&message);
            }
            debug!("input channel closed for '{}'", device.name);
        })
    }

    /// Translate one inbound message into an entity event.
    ///
    /// Messages whose code has no registered entity are silently dropped;
    /// unregistered codes are expected noise, not errors.
    pub fn dispatch(&self, message: &MidiMessage) {
        match *message {
            MidiMessage::NoteOn { note, .. } => {
                let pad = self.pads.lock().get(&note).cloned();
                match pad {
                    Some(pad) => pad.raise_on(message),
                    None => trace!("no pad registered for note {}", note),
                }
            }
            MidiMessage::NoteOff { note, .. } => {
                let pad = self.pads.lock().get(&note).cloned();
                match pad {
                    Some(pad) => pad.raise_off(message),
                    None => trace!("no pad registered for note {}", note),
                }
            }
            MidiMessage::ControlChange { controller, value, .. } => {
                let knob = self.knobs.lock().get(&controller).cloned();
                match knob {
                    Some(knob) => knob.input(value),
                    None => trace!("no knob registered for controller {}", controller),
                }
            }
        }
    }
}

/// Parse a pad label: "p" or "pad", optional space, 1-based digit
pub(crate) fn pad_label_ordinal(label: &str) -> Option<u8> {
    label_ordinal(label, "pad", 'p')
}

/// Parse a knob label: "k" or "knob", optional space, 1-based digit
pub(crate) fn knob_label_ordinal(label: &str) -> Option<u8> {
    label_ordinal(label, "knob", 'k')
}

fn label_ordinal(label: &str, long: &str, short: char) -> Option<u8> {
    let lower = label.trim().to_ascii_lowercase();
    let rest = lower
        .strip_prefix(long)
        .or_else(|| lower.strip_prefix(short))?;
    let digit = rest.trim_start().chars().next()?.to_digit(10)?;
    u8::try_from(digit).ok().filter(|&n| n >= 1)
}
