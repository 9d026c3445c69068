//! MIDI transport
//!
//! Wraps a midir input/output pair for a named device. Inbound messages are
//! parsed and forwarded onto a channel for the device driver to consume;
//! outbound messages go through the [`MidiSink`] trait so entities (and
//! tests) never touch midir directly.

use anyhow::{Context, Result};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::midi::{format_hex, MidiMessage};

/// Capacity of the inbound event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Outbound half of a MIDI port.
///
/// The device driver holds this as `Arc<dyn MidiSink>`; send failures
/// propagate to whichever command triggered the send.
pub trait MidiSink: Send + Sync {
    fn send(&self, message: &MidiMessage) -> Result<()>;
}

/// midir-backed output connection
pub struct MidirOutput {
    conn: Mutex<MidiOutputConnection>,
}

impl MidiSink for MidirOutput {
    fn send(&self, message: &MidiMessage) -> Result<()> {
        let data = message.encode();
        self.conn
            .lock()
            .send(&data)
            .context("failed to send MIDI message")?;
        trace!("sent {} | {}", format_hex(&data), message);
        Ok(())
    }
}

/// A connected MIDI input/output pair for one named device.
///
/// Dropping the port closes both connections.
pub struct MidiPort {
    // Held only to keep the input callback alive
    _input_conn: MidiInputConnection<()>,
    output: Arc<MidirOutput>,
    event_rx: Option<mpsc::Receiver<MidiMessage>>,
}

impl MidiPort {
    /// Connect to the first input and output ports whose names contain
    /// `name` (case-insensitive).
    pub fn connect(name: &str) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let midi_in = MidiInput::new("lpd8-host-in").context("failed to create MIDI input")?;
        let (in_port, in_name) = find_input_port(&midi_in, name)
            .ok_or_else(|| anyhow::anyhow!("MIDI input port '{}' not found", name))?;
        debug!("connecting to input port: {}", in_name);

        let input_conn = midi_in
            .connect(
                &in_port,
                "lpd8-host",
                move |_timestamp, data, _| {
                    if let Some(message) = MidiMessage::parse(data) {
                        // Drop on overflow rather than blocking the midir thread
                        let _ = event_tx.try_send(message);
                    } else {
                        trace!("ignoring unhandled MIDI: {}", format_hex(data));
                    }
                },
                (),
            )
            .map_err(|e| anyhow::anyhow!("failed to connect input port: {}", e))?;

        let midi_out = MidiOutput::new("lpd8-host-out").context("failed to create MIDI output")?;
        let (out_port, out_name) = find_output_port(&midi_out, name)
            .ok_or_else(|| anyhow::anyhow!("MIDI output port '{}' not found", name))?;
        debug!("connecting to output port: {}", out_name);

        let output_conn = midi_out
            .connect(&out_port, "lpd8-host")
            .map_err(|e| anyhow::anyhow!("failed to connect output port: {}", e))?;

        Ok(Self {
            _input_conn: input_conn,
            output: Arc::new(MidirOutput {
                conn: Mutex::new(output_conn),
            }),
            event_rx: Some(event_rx),
        })
    }

    /// Outbound half, shared with the device driver
    pub fn output(&self) -> Arc<dyn MidiSink> {
        Arc::clone(&self.output) as Arc<dyn MidiSink>
    }

    /// Take the inbound event receiver (for the dispatch loop to consume)
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<MidiMessage>> {
        self.event_rx.take()
    }
}

/// Find an input port by substring match
fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(midir::MidiInputPort, String)> {
    for port in midi_in.ports() {
        if let Ok(name) = midi_in.port_name(&port) {
            if name.to_lowercase().contains(&pattern.to_lowercase()) {
                return Some((port, name));
            }
        }
    }
    None
}

/// Find an output port by substring match
fn find_output_port(
    midi_out: &MidiOutput,
    pattern: &str,
) -> Option<(midir::MidiOutputPort, String)> {
    for port in midi_out.ports() {
        if let Ok(name) = midi_out.port_name(&port) {
            if name.to_lowercase().contains(&pattern.to_lowercase()) {
                return Some((port, name));
            }
        }
    }
    None
}

/// List available MIDI input port names
pub fn list_input_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new("lpd8-host-scanner")?;
    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect())
}

/// List available MIDI output port names
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("lpd8-host-scanner")?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect())
}

/// Print discovered ports (for `--list-ports`)
pub fn print_ports() {
    println!("\n=== MIDI Input Ports ===");
    if let Ok(ports) = list_input_ports() {
        for (i, name) in ports.iter().enumerate() {
            println!("  {}: {}", i, name);
        }
    }

    println!("\n=== MIDI Output Ports ===");
    if let Ok(ports) = list_output_ports() {
        for (i, name) in ports.iter().enumerate() {
            println!("  {}: {}", i, name);
        }
    }
    println!();
}
