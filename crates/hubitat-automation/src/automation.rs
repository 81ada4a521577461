//! Automation abstraction
//!
//! The router never owns automations. It holds [`AutomationRef`] handles,
//! which compare by identity and do not keep the automation alive.

use hubitat_core::Event;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::trigger::TriggerDefinition;

/// A registered rule that reacts to matching events
pub trait Automation: Send + Sync {
    /// Human-readable name used in logs and errors
    fn name(&self) -> &str;

    /// Trigger definitions produced by the build step
    ///
    /// Must not change while the automation is registered.
    fn built_triggers(&self) -> &[TriggerDefinition];

    /// Called once per matching event
    fn handle_event(&self, event: &Event) -> anyhow::Result<()>;
}

/// Shared handle the caller keeps for the automation's lifetime
pub type SharedAutomation = Arc<dyn Automation>;

/// Non-owning identity handle to an automation
///
/// Two handles are equal only if they point at the same allocation, so
/// structurally identical automations stay distinct.
#[derive(Clone)]
pub struct AutomationRef(Weak<dyn Automation>);

impl AutomationRef {
    /// Create a handle without taking ownership
    pub fn new(automation: &SharedAutomation) -> Self {
        Self(Arc::downgrade(automation))
    }

    /// Get the automation if the owner still holds it
    pub fn upgrade(&self) -> Option<SharedAutomation> {
        self.0.upgrade()
    }

    /// Check whether the owner still holds the automation
    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Check whether this handle refers to the given automation
    pub fn refers_to(&self, automation: &SharedAutomation) -> bool {
        self.addr() == Arc::as_ptr(automation) as *const ()
    }

    fn addr(&self) -> *const () {
        self.0.as_ptr() as *const ()
    }
}

impl PartialEq for AutomationRef {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for AutomationRef {}

impl Hash for AutomationRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for AutomationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(a) => write!(f, "AutomationRef({} @ {:p})", a.name(), self.addr()),
            None => write!(f, "AutomationRef(<dropped> @ {:p})", self.addr()),
        }
    }
}

/// Automation configuration from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Unique ID (optional, auto-generated if not provided)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Triggers that start the automation
    #[serde(default, alias = "trigger")]
    pub triggers: Vec<TriggerDefinition>,

    /// Whether the automation is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// A built automation definition with a resolved id
#[derive(Debug, Clone)]
pub struct AutomationDefinition {
    /// Unique identifier
    pub id: String,

    /// Human-readable name
    pub alias: Option<String>,

    /// Description
    pub description: Option<String>,

    /// Built triggers
    pub triggers: Vec<TriggerDefinition>,

    /// Whether enabled
    pub enabled: bool,
}

impl AutomationDefinition {
    /// Create from config
    pub fn from_config(config: AutomationConfig) -> Self {
        let id = config.id.unwrap_or_else(|| ulid::Ulid::new().to_string());

        Self {
            id,
            alias: config.alias,
            description: config.description,
            triggers: config.triggers,
            enabled: config.enabled,
        }
    }

    /// Get display name (alias or ID)
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.id)
    }
}
