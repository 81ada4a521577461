//! Trigger matching
//!
//! Decides whether an automation's triggers are satisfied by an event.
//! Matching is pure: it reads the triggers and the event and nothing else.

use hubitat_core::Event;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::automation::Automation;
use crate::trigger::{device_triggers, HubitatDeviceTriggerDefinition, TriggerDefinition};

/// Matches one trigger type against events
///
/// Implementations pattern-match their own variant and return `false` for
/// any other.
pub trait TriggerMatcher: Send + Sync {
    /// Tag of the trigger type this matcher handles
    fn trigger_type(&self) -> &'static str;

    /// Evaluate a single trigger definition
    fn matches(&self, trigger: &TriggerDefinition, event: &Event) -> bool;
}

/// Matcher for device-event triggers
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceTriggerMatcher;

impl DeviceTriggerMatcher {
    /// Evaluate a device trigger
    pub fn matches_definition(trigger: &HubitatDeviceTriggerDefinition, event: &Event) -> bool {
        if !event.is_device_event() {
            return false;
        }

        let attributes_ok = trigger.attributes.is_empty() || trigger.attributes_match(event);

        if trigger.devices.is_empty() {
            return attributes_ok;
        }

        trigger.devices.contains(&event.device_id) && attributes_ok
    }
}

impl TriggerMatcher for DeviceTriggerMatcher {
    fn trigger_type(&self) -> &'static str {
        hubitat_core::events::DEVICE_EVENT
    }

    fn matches(&self, trigger: &TriggerDefinition, event: &Event) -> bool {
        match trigger {
            TriggerDefinition::HubitatDevice(t) => Self::matches_definition(t, event),
            _ => false,
        }
    }
}

/// Check whether any of an automation's device triggers match the event
pub fn matches(automation: &dyn Automation, event: &Event) -> bool {
    let matched = device_triggers(automation.built_triggers())
        .any(|t| DeviceTriggerMatcher::matches_definition(t, event));

    trace!(
        automation = %automation.name(),
        device_id = event.device_id,
        attribute = %event.attribute_name,
        matched,
        "Evaluated device triggers"
    );
    matched
}

/// Trigger evaluator
///
/// Holds one matcher per trigger tag. Triggers whose tag has no matcher are
/// skipped, so new trigger types never break evaluation.
#[derive(Clone)]
pub struct TriggerEvaluator {
    matchers: HashMap<&'static str, Arc<dyn TriggerMatcher>>,
}

impl TriggerEvaluator {
    /// Create an evaluator with no matchers
    pub fn empty() -> Self {
        Self {
            matchers: HashMap::new(),
        }
    }

    /// Register a matcher, replacing any previous one for the same tag
    pub fn with_matcher(mut self, matcher: Arc<dyn TriggerMatcher>) -> Self {
        self.matchers.insert(matcher.trigger_type(), matcher);
        self
    }

    /// Check whether a tag has a matcher
    pub fn handles(&self, trigger_type: &str) -> bool {
        self.matchers.contains_key(trigger_type)
    }

    /// OR across every trigger with a registered matcher
    pub fn automation_matches(&self, automation: &dyn Automation, event: &Event) -> bool {
        automation.built_triggers().iter().any(|trigger| {
            self.matchers
                .get(trigger.trigger_type())
                .is_some_and(|m| m.matches(trigger, event))
        })
    }
}

impl Default for TriggerEvaluator {
    fn default() -> Self {
        Self::empty().with_matcher(Arc::new(DeviceTriggerMatcher))
    }
}

impl fmt::Debug for TriggerEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.matchers.keys().collect();
        tags.sort();
        f.debug_struct("TriggerEvaluator")
            .field("matchers", &tags)
            .finish()
    }
}
