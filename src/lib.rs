//! lpd8-host - turns an Akai LPD8 pad/knob controller into stateful logical
//! entities and wires them to application actions through configuration.
//!
//! The device driver ([`device::Lpd8`]) maps raw MIDI messages to addressable
//! [`device::Pad`]/[`device::Knob`] entities with their own behavior state
//! machines; the binding resolver ([`bindings`]) connects their events to
//! action handlers declared in configuration; the module host ([`modules`])
//! loads independently developed modules that provide devices and handlers.

pub mod actions;
pub mod bindings;
pub mod config;
pub mod device;
pub mod midi;
pub mod modules;
pub mod transport;
