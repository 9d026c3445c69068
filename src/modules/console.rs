//! Built-in console module - logs invocations for the action names listed in
//! its config. Useful for testing bindings without any real application
//! attached.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::actions::{ActionMap, ActionPayload};
use crate::config::AppConfig;
use crate::modules::{Module, Teardown};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConsoleOptions {
    actions: Vec<String>,
}

/// Registers logging handlers under configured action names
#[derive(Default)]
pub struct ConsoleModule;

impl Module for ConsoleModule {
    fn name(&self) -> &str {
        "console"
    }

    fn init(
        &self,
        config: &Value,
        _shared: &AppConfig,
        actions: &Arc<ActionMap>,
    ) -> Result<Option<Teardown>> {
        let opts: ConsoleOptions = if config.is_null() {
            ConsoleOptions::default()
        } else {
            serde_json::from_value(config.clone()).context("invalid console module config")?
        };

        for name in &opts.actions {
            let label = name.clone();
            actions.register(name, move |payload| match payload {
                ActionPayload::Switch(on) => info!("[console] {} <- {}", label, on),
                ActionPayload::Level(value) => info!("[console] {} <- {}", label, value),
            });
        }

        info!("console module registered {} action(s)", opts.actions.len());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionRegistry;
    use crate::config::EventBinding;
    use serde_json::json;

    #[test]
    fn test_registers_configured_actions() {
        let module = ConsoleModule;
        let actions = Arc::new(ActionMap::new());
        let shared = AppConfig::default();

        module
            .init(
                &json!({ "actions": ["lights.toggle", "lights.dim"] }),
                &shared,
                &actions,
            )
            .unwrap();

        let binding: EventBinding = serde_json::from_value(json!({
            "type": "lpd8", "pad": "pad 1", "action": "lights.toggle"
        }))
        .unwrap();

        assert!(actions.get_action_handler(&binding).is_some());
    }

    #[test]
    fn test_null_config_is_fine() {
        let module = ConsoleModule;
        let actions = Arc::new(ActionMap::new());
        let shared = AppConfig::default();

        module.init(&Value::Null, &shared, &actions).unwrap();
    }
}
