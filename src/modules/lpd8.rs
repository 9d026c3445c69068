//! Built-in lpd8 module
//!
//! Connects the physical device, spawns the inbound dispatch loop, publishes
//! the device handle for other modules, and wires the shared configuration's
//! event bindings.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::actions::{ActionMap, ActionRegistry};
use crate::bindings::bind_events;
use crate::config::AppConfig;
use crate::device::{Lpd8, Program};
use crate::modules::{Module, Teardown};
use crate::transport::MidiPort;

/// Module options from the configuration's `config` object
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lpd8Options {
    /// MIDI port name pattern to match
    pub device_name: String,
    /// MIDI channel for outbound pad messages
    pub channel: u8,
    /// Factory program slot (1-4)
    pub program: u8,
    /// Request a virtual port instead of a hardware one
    #[serde(rename = "virtual")]
    pub virtual_port: bool,
}

impl Default for Lpd8Options {
    fn default() -> Self {
        Self {
            device_name: "LPD8".to_string(),
            channel: 0,
            program: 4,
            virtual_port: false,
        }
    }
}

/// The lpd8 device module
#[derive(Default)]
pub struct Lpd8Module;

impl Module for Lpd8Module {
    fn name(&self) -> &str {
        "lpd8"
    }

    fn init(
        &self,
        config: &Value,
        shared: &AppConfig,
        actions: &Arc<ActionMap>,
    ) -> Result<Option<Teardown>> {
        let opts: Lpd8Options = if config.is_null() {
            Lpd8Options::default()
        } else {
            serde_json::from_value(config.clone()).context("invalid lpd8 module config")?
        };

        if opts.virtual_port {
            warn!("virtual MIDI ports are not supported; opening hardware port");
        }

        let program = Program::slot(opts.program)
            .with_context(|| format!("unknown LPD8 program slot {}", opts.program))?;

        let mut port = MidiPort::connect(&opts.device_name)
            .with_context(|| format!("failed to open MIDI device '{}'", opts.device_name))?;
        let events = port
            .take_events()
            .context("MIDI port event stream already consumed")?;

        let device = Lpd8::new(&opts.device_name, program, opts.channel, port.output());
        let dispatch = device.spawn_dispatch(events);

        // Imperative pad surface for other modules
        actions.register_device("lpd8", Arc::clone(&device));

        bind_events(
            &device,
            &shared.event_bindings,
            Arc::clone(actions) as Arc<dyn ActionRegistry>,
        )?;

        info!(
            "lpd8 module initialized on '{}' (program {})",
            opts.device_name, opts.program
        );

        Ok(Some(Box::new(move || {
            dispatch.abort();
            drop(port);
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_defaults() {
        let opts: Lpd8Options = serde_json::from_value(json!({})).unwrap();
        assert_eq!(opts.device_name, "LPD8");
        assert_eq!(opts.channel, 0);
        assert_eq!(opts.program, 4);
        assert!(!opts.virtual_port);
    }

    #[test]
    fn test_options_parse() {
        let opts: Lpd8Options = serde_json::from_value(json!({
            "deviceName": "LPD8 MIDI 1",
            "channel": 1,
            "program": 2,
            "virtual": true
        }))
        .unwrap();

        assert_eq!(opts.device_name, "LPD8 MIDI 1");
        assert_eq!(opts.channel, 1);
        assert_eq!(opts.program, 2);
        assert!(opts.virtual_port);
    }
}
