//! Declarative automations built from configuration
//!
//! Each configured automation logs the events it receives and counts them.

use anyhow::Result;
use hubitat_automation::{
    Automation, AutomationConfig, AutomationDefinition, SharedAutomation, TriggerDefinition,
};
use hubitat_core::Event;
use hubitat_event_router::EventRouter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Automation whose callback logs the triggering event
pub struct LoggedAutomation {
    definition: AutomationDefinition,
    fired: AtomicU64,
}

impl LoggedAutomation {
    pub fn new(definition: AutomationDefinition) -> Self {
        Self {
            definition,
            fired: AtomicU64::new(0),
        }
    }

    /// Automation id
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Free-text description from configuration
    pub fn description(&self) -> Option<&str> {
        self.definition.description.as_deref()
    }

    /// Number of events handled so far
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }
}

impl Automation for LoggedAutomation {
    fn name(&self) -> &str {
        self.definition.display_name()
    }

    fn built_triggers(&self) -> &[TriggerDefinition] {
        &self.definition.triggers
    }

    fn handle_event(&self, event: &Event) -> Result<()> {
        self.fired.fetch_add(1, Ordering::Relaxed);
        info!(
            automation = %self.name(),
            device_id = event.device_id,
            attribute = %event.attribute_name,
            value = %event.new_value,
            previous = %event.previous_value,
            "Automation triggered"
        );
        Ok(())
    }
}

/// Build and register every enabled automation
///
/// The returned handles own the automations; the router only references them.
pub fn register_all(
    router: &mut EventRouter,
    configs: Vec<AutomationConfig>,
) -> Result<Vec<Arc<LoggedAutomation>>> {
    let mut owned = Vec::new();

    for config in configs {
        let definition = AutomationDefinition::from_config(config);
        if !definition.enabled {
            debug!(automation = %definition.display_name(), "Skipping disabled automation");
            continue;
        }

        let automation = Arc::new(LoggedAutomation::new(definition));
        let shared: SharedAutomation = automation.clone();
        router.register(&shared)?;
        debug!(
            automation = %automation.id(),
            description = automation.description().unwrap_or_default(),
            "Automation ready"
        );
        owned.push(automation);
    }

    info!("Loaded {} automations", owned.len());
    Ok(owned)
}
