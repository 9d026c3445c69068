//! Event binding resolver
//!
//! Wires declarative [`EventBinding`]s to device entities. Pad bindings
//! forward the hardware edge as a boolean; button bindings add momentary
//! semantics (auto-release after a quiet window, release edges treated as
//! another activation); knob bindings forward throttled values. Unresolvable
//! labels are a configuration error and fail loudly at load time.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::actions::{ActionPayload, ActionRegistry};
use crate::config::EventBinding;
use crate::device::{Lpd8, Pad, FULL_VELOCITY};

/// Binding type handled by this resolver
pub const BINDING_TYPE: &str = "lpd8";

/// Quiet window before a button binding releases its pad
pub const RELEASE_DELAY: Duration = Duration::from_millis(100);

/// Configuration errors raised while resolving bindings
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("event binding ({descriptor}) refers to unknown {kind} '{label}'")]
    UnknownControl {
        kind: &'static str,
        label: String,
        descriptor: String,
    },
}

/// Resolve and wire every binding of matching type.
///
/// Handlers are looked up through the registry at event time, so modules
/// loaded after this one may still provide them; a handler missing at event
/// time is logged, not fatal.
pub fn bind_events(
    device: &Lpd8,
    bindings: &[EventBinding],
    actions: Arc<dyn ActionRegistry>,
) -> Result<()> {
    for binding in bindings {
        if binding.device != BINDING_TYPE {
            debug!("skipping binding for other device type '{}'", binding.device);
            continue;
        }

        if let Some(label) = &binding.pad {
            let pad = device.get_pad(label).ok_or_else(|| BindingError::UnknownControl {
                kind: "pad",
                label: label.clone(),
                descriptor: binding.describe(),
            })?;
            bind_pad(&pad, binding, &actions);
        } else if let Some(label) = &binding.button {
            let pad = device.get_pad(label).ok_or_else(|| BindingError::UnknownControl {
                kind: "pad",
                label: label.clone(),
                descriptor: binding.describe(),
            })?;
            bind_button(&pad, binding, &actions);
        } else if let Some(label) = &binding.knob {
            let knob = device.get_knob(label).ok_or_else(|| BindingError::UnknownControl {
                kind: "knob",
                label: label.clone(),
                descriptor: binding.describe(),
            })?;

            let actions = Arc::clone(&actions);
            let descriptor = binding.clone();
            knob.on_change(move |value| invoke(&actions, &descriptor, ActionPayload::Level(value)));
        }
        // Bindings naming no control were rejected by AppConfig::validate
    }

    Ok(())
}

/// Plain pad binding: forward both hardware edges as booleans
fn bind_pad(pad: &Arc<Pad>, binding: &EventBinding, actions: &Arc<dyn ActionRegistry>) {
    let on_actions = Arc::clone(actions);
    let on_descriptor = binding.clone();
    pad.on_on(move |_| invoke(&on_actions, &on_descriptor, ActionPayload::Switch(true)));

    let off_actions = Arc::clone(actions);
    let off_descriptor = binding.clone();
    pad.on_off(move |_| invoke(&off_actions, &off_descriptor, ActionPayload::Switch(false)));
}

/// Momentary button binding.
///
/// Every activation invokes the handler with `true` and arms (or re-arms) an
/// auto-release timer that darkens the pad after [`RELEASE_DELAY`] of quiet;
/// re-arming aborts the previous timer, so a burst of presses yields exactly
/// one release. A hardware release edge relights the pad and runs the same
/// trigger again, so activation is tied to both edges of the physical press.
fn bind_button(pad: &Arc<Pad>, binding: &EventBinding, actions: &Arc<dyn ActionRegistry>) {
    let release: Arc<Mutex<Option<JoinHandle<()>>>> = Arc::new(Mutex::new(None));

    let trigger: Arc<dyn Fn() + Send + Sync> = {
        let pad = Arc::clone(pad);
        let actions = Arc::clone(actions);
        let descriptor = binding.clone();
        let release = Arc::clone(&release);

        Arc::new(move || {
            invoke(&actions, &descriptor, ActionPayload::Switch(true));

            let mut slot = release.lock();
            if let Some(handle) = slot.take() {
                handle.abort();
            }

            let pad = Arc::clone(&pad);
            let descriptor = descriptor.describe();
            *slot = Some(tokio::spawn(async move {
                tokio::time::sleep(RELEASE_DELAY).await;
                if let Err(e) = pad.set_off(FULL_VELOCITY) {
                    warn!("auto-release for {} failed: {:#}", descriptor, e);
                }
            }));
        })
    };

    {
        let trigger = Arc::clone(&trigger);
        pad.on_on(move |_| trigger());
    }

    // Releasing the physical pad counts as another activation: relight the
    // LED, then re-run the trigger so visual state follows activation
    // regardless of which edge arrived.
    {
        let relight = Arc::clone(pad);
        let descriptor = binding.describe();
        pad.on_off(move |_| {
            if let Err(e) = relight.set_on(FULL_VELOCITY) {
                warn!("relight for {} failed: {:#}", descriptor, e);
            }
            trigger();
        });
    }
}

fn invoke(actions: &Arc<dyn ActionRegistry>, binding: &EventBinding, payload: ActionPayload) {
    match actions.get_action_handler(binding) {
        Some(handler) => handler(payload),
        None => warn!("no action handler for binding ({})", binding.describe()),
    }
}
