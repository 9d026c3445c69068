//! Action registry
//!
//! The binding resolver consumes only the lookup contract
//! ([`ActionRegistry`]); [`ActionMap`] is the in-process implementation that
//! modules register their handlers into. The map also shelves named device
//! handles so modules can drive pads imperatively without depending on each
//! other.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EventBinding;
use crate::device::Lpd8;

/// Payload delivered to an action handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPayload {
    /// Pad/button activation state
    Switch(bool),
    /// Knob value (0-127)
    Level(u8),
}

/// Opaque invokable resolved per binding; the core never inspects it
pub type ActionHandler = Arc<dyn Fn(ActionPayload) + Send + Sync>;

/// Lookup contract consumed by the binding resolver
pub trait ActionRegistry: Send + Sync {
    /// Resolve the handler for a binding descriptor, if one is registered
    fn get_action_handler(&self, binding: &EventBinding) -> Option<ActionHandler>;
}

/// In-process action registry keyed by the binding's `action` field
#[derive(Default)]
pub struct ActionMap {
    handlers: RwLock<HashMap<String, ActionHandler>>,
    devices: RwLock<HashMap<String, Arc<Lpd8>>>,
}

impl ActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under an action name; a later registration for the
    /// same name replaces the earlier one.
    pub fn register<F>(&self, name: &str, handler: F)
    where
        F: Fn(ActionPayload) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .insert(name.to_string(), Arc::new(handler));
    }

    /// Publish a device handle under a name (e.g. "lpd8") for other modules
    pub fn register_device(&self, name: &str, device: Arc<Lpd8>) {
        self.devices.write().insert(name.to_string(), device);
    }

    /// Device handle published by another module, if any
    pub fn device(&self, name: &str) -> Option<Arc<Lpd8>> {
        self.devices.read().get(name).cloned()
    }
}

impl ActionRegistry for ActionMap {
    fn get_action_handler(&self, binding: &EventBinding) -> Option<ActionHandler> {
        let name = binding.action_name()?;
        self.handlers.read().get(name).cloned()
    }
}
