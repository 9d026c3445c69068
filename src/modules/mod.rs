//! Module host
//!
//! Generic plugin host: modules register themselves under a stable
//! identifier, and configuration entries select which ones to initialize and
//! with what options. A module id is initialized at most once per process;
//! repeat entries reuse the loaded module. An init failure is contained to
//! its module and never prevents the rest of the system from starting.

pub mod console;
pub mod lpd8;

pub use console::ConsoleModule;
pub use lpd8::Lpd8Module;

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::actions::ActionMap;
use crate::config::{AppConfig, ModuleEntry};

/// Teardown callable optionally returned by a module's init
pub type Teardown = Box<dyn FnOnce() + Send>;

/// Initialization contract every loadable module implements
pub trait Module: Send + Sync {
    /// Stable identifier the configuration's `path` field selects
    fn name(&self) -> &str;

    /// Initialize with module-specific options, the shared configuration,
    /// and the action registry. Called at most once per process.
    fn init(
        &self,
        config: &Value,
        shared: &AppConfig,
        actions: &Arc<ActionMap>,
    ) -> Result<Option<Teardown>>;
}

struct LoadedModule {
    teardown: Option<Teardown>,
}

/// Process-wide module registry with load-once semantics
#[derive(Default)]
pub struct ModuleHost {
    available: HashMap<String, Arc<dyn Module>>,
    loaded: HashMap<String, LoadedModule>,
    // Load order, for deterministic teardown
    load_order: Vec<String>,
}

impl ModuleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a module available for loading by configuration
    pub fn register(&mut self, module: Arc<dyn Module>) {
        let name = module.name().to_string();
        self.available.insert(name, module);
    }

    /// Whether a module id has been initialized
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Number of initialized modules
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Load every configured module entry.
    ///
    /// Failures are logged per module and do not abort the remaining
    /// entries; one broken module must not take the host down.
    pub fn load_all(&mut self, entries: &[ModuleEntry], shared: &AppConfig, actions: &Arc<ActionMap>) {
        for entry in entries {
            match self.load(entry, shared, actions) {
                Ok(()) => {}
                Err(e) => error!("module '{}' failed to load: {:#}", entry.path, e),
            }
        }
    }

    /// Load one module entry, initializing its module if not already loaded
    pub fn load(&mut self, entry: &ModuleEntry, shared: &AppConfig, actions: &Arc<ActionMap>) -> Result<()> {
        if self.is_loaded(&entry.path) {
            debug!("module '{}' already loaded, reusing", entry.path);
            return Ok(());
        }

        let Some(module) = self.available.get(&entry.path) else {
            bail!("unknown module '{}'", entry.path);
        };

        let teardown = module.init(&entry.config, shared, actions)?;
        self.loaded.insert(entry.path.clone(), LoadedModule { teardown });
        self.load_order.push(entry.path.clone());
        info!("module '{}' loaded", entry.path);

        Ok(())
    }

    /// Run every collected teardown, in load order
    pub fn unload_all(&mut self) {
        for name in std::mem::take(&mut self.load_order) {
            if let Some(loaded) = self.loaded.remove(&name) {
                if let Some(teardown) = loaded.teardown {
                    teardown();
                }
                info!("module '{}' unloaded", name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModule {
        name: &'static str,
        inits: Arc<AtomicUsize>,
        teardowns: Arc<AtomicUsize>,
    }

    impl Module for CountingModule {
        fn name(&self) -> &str {
            self.name
        }

        fn init(
            &self,
            _config: &Value,
            _shared: &AppConfig,
            _actions: &Arc<ActionMap>,
        ) -> Result<Option<Teardown>> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            let teardowns = Arc::clone(&self.teardowns);
            Ok(Some(Box::new(move || {
                teardowns.fetch_add(1, Ordering::SeqCst);
            })))
        }
    }

    struct BrokenModule;

    impl Module for BrokenModule {
        fn name(&self) -> &str {
            "broken"
        }

        fn init(
            &self,
            _config: &Value,
            _shared: &AppConfig,
            _actions: &Arc<ActionMap>,
        ) -> Result<Option<Teardown>> {
            bail!("intentional init failure")
        }
    }

    fn entry(path: &str) -> ModuleEntry {
        serde_json::from_value(json!({ "path": path })).unwrap()
    }

    fn counting(name: &'static str) -> (Arc<CountingModule>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let inits = Arc::new(AtomicUsize::new(0));
        let teardowns = Arc::new(AtomicUsize::new(0));
        let module = Arc::new(CountingModule {
            name,
            inits: Arc::clone(&inits),
            teardowns: Arc::clone(&teardowns),
        });
        (module, inits, teardowns)
    }

    #[test]
    fn test_same_module_loads_once() {
        let (module, inits, _) = counting("counter");
        let mut host = ModuleHost::new();
        host.register(module);

        let shared = AppConfig::default();
        let actions = Arc::new(ActionMap::new());
        host.load_all(&[entry("counter"), entry("counter")], &shared, &actions);

        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert_eq!(host.loaded_count(), 1);
    }

    #[test]
    fn test_broken_module_does_not_block_others() {
        let (module, inits, _) = counting("counter");
        let mut host = ModuleHost::new();
        host.register(Arc::new(BrokenModule));
        host.register(module);

        let shared = AppConfig::default();
        let actions = Arc::new(ActionMap::new());
        host.load_all(&[entry("broken"), entry("counter")], &shared, &actions);

        assert!(!host.is_loaded("broken"));
        assert!(host.is_loaded("counter"));
        assert_eq!(inits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_module_is_an_error() {
        let mut host = ModuleHost::new();
        let shared = AppConfig::default();
        let actions = Arc::new(ActionMap::new());

        let err = host.load(&entry("nope"), &shared, &actions).unwrap_err();
        assert!(err.to_string().contains("unknown module"));
    }

    #[test]
    fn test_unload_runs_teardowns() {
        let (module, _, teardowns) = counting("counter");
        let mut host = ModuleHost::new();
        host.register(module);

        let shared = AppConfig::default();
        let actions = Arc::new(ActionMap::new());
        host.load_all(&[entry("counter")], &shared, &actions);

        host.unload_all();
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
        assert_eq!(host.loaded_count(), 0);
    }
}
