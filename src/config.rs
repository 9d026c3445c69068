//! Configuration for the LPD8 host
//!
//! The JSON configuration file carries two lists: declarative event bindings
//! connecting device controls to action handlers, and the modules to load
//! with their per-module options. Neither is mutated after load.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub event_bindings: Vec<EventBinding>,
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

/// One declarative binding from a device control to an action.
///
/// Exactly one of `pad`/`button`/`knob` is meaningful; `type` selects the
/// device driver the binding belongs to. The remaining fields are the action
/// spec, kept opaque and handed to the action registry for lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventBinding {
    #[serde(rename = "type")]
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knob: Option<String>,
    /// Action spec fields (e.g. `action`), opaque to the core
    #[serde(flatten)]
    pub action: serde_json::Map<String, serde_json::Value>,
}

impl EventBinding {
    /// The `action` field of the action spec, if present
    pub fn action_name(&self) -> Option<&str> {
        self.action.get("action")?.as_str()
    }

    /// Short human description for logs and errors
    pub fn describe(&self) -> String {
        let source = self
            .pad
            .as_deref()
            .map(|l| format!("pad '{}'", l))
            .or_else(|| self.button.as_deref().map(|l| format!("button '{}'", l)))
            .or_else(|| self.knob.as_deref().map(|l| format!("knob '{}'", l)))
            .unwrap_or_else(|| "<no control>".to_string());

        match self.action_name() {
            Some(action) => format!("{} -> {}", source, action),
            None => source,
        }
    }
}

/// One module to load: a stable module identifier plus its options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleEntry {
    pub path: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl AppConfig {
    /// Load configuration from a JSON file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file: {}", path))?;

        let config: AppConfig = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for structural correctness.
    ///
    /// Label resolution against the device program happens later, at binding
    /// time; this pass rejects entries that could never resolve.
    pub fn validate(&self) -> Result<()> {
        for (idx, binding) in self.event_bindings.iter().enumerate() {
            if binding.device.is_empty() {
                bail!("event binding {} ({}) has an empty type", idx, binding.describe());
            }
            if binding.pad.is_none() && binding.button.is_none() && binding.knob.is_none() {
                bail!(
                    "event binding {} ({}) names no pad, button, or knob",
                    idx,
                    binding.describe()
                );
            }
        }

        for (idx, entry) in self.modules.iter().enumerate() {
            if entry.path.is_empty() {
                bail!("module entry {} has an empty path", idx);
            }
        }

        Ok(())
    }
}
