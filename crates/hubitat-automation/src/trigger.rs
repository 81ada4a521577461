//! Trigger types
//!
//! Triggers describe which events an automation wants to be notified about.
//! They are built once per automation and treated as immutable while the
//! automation is registered.

use hubitat_core::events::DEVICE_EVENT;
use hubitat_core::{DeviceId, Event};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Tag for schedule triggers
pub const SCHEDULE_TRIGGER: &str = "schedule";

/// Tag for hub mode triggers
pub const MODE_TRIGGER: &str = "mode";

/// Tag reported for trigger types this crate does not know
pub const UNKNOWN_TRIGGER: &str = "unknown";

/// Trigger definition
///
/// Only [`TriggerDefinition::HubitatDevice`] is relevant to device-event
/// routing. Every other variant is skipped by the registry and the matcher,
/// and unrecognised tags deserialize to [`TriggerDefinition::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum TriggerDefinition {
    /// Fires on device attribute changes
    #[serde(rename = "hubitat_device_event")]
    HubitatDevice(HubitatDeviceTriggerDefinition),

    /// Fires on a cron schedule
    Schedule(ScheduleTriggerDefinition),

    /// Fires when the hub mode changes
    Mode(ModeTriggerDefinition),

    /// Any trigger type added after this crate was built
    #[serde(other)]
    Unknown,
}

impl TriggerDefinition {
    /// Get the trigger type tag
    pub fn trigger_type(&self) -> &'static str {
        match self {
            TriggerDefinition::HubitatDevice(_) => DEVICE_EVENT,
            TriggerDefinition::Schedule(_) => SCHEDULE_TRIGGER,
            TriggerDefinition::Mode(_) => MODE_TRIGGER,
            TriggerDefinition::Unknown => UNKNOWN_TRIGGER,
        }
    }

    /// Borrow the device trigger, if this is one
    pub fn as_device(&self) -> Option<&HubitatDeviceTriggerDefinition> {
        match self {
            TriggerDefinition::HubitatDevice(t) => Some(t),
            _ => None,
        }
    }
}

impl From<HubitatDeviceTriggerDefinition> for TriggerDefinition {
    fn from(trigger: HubitatDeviceTriggerDefinition) -> Self {
        TriggerDefinition::HubitatDevice(trigger)
    }
}

/// Schedule trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTriggerDefinition {
    /// Quartz-style cron expression
    pub cron: String,
}

/// Hub mode trigger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeTriggerDefinition {
    /// Modes to react to (empty means any)
    #[serde(default)]
    pub modes: Vec<String>,
}

/// Keep only the device-event triggers, skipping every other type
pub fn device_triggers(
    triggers: &[TriggerDefinition],
) -> impl Iterator<Item = &HubitatDeviceTriggerDefinition> + '_ {
    triggers.iter().filter_map(TriggerDefinition::as_device)
}

/// Device event trigger
///
/// - no devices and no attributes: every device event
/// - devices listed: only those devices, narrowed by attributes if present
/// - attributes only: any device whose changed attribute matches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubitatDeviceTriggerDefinition {
    /// Device ids to monitor
    #[serde(default)]
    pub devices: IndexSet<DeviceId>,

    /// Attribute filters
    #[serde(default)]
    pub attributes: Vec<AttributeFilter>,
}

impl HubitatDeviceTriggerDefinition {
    /// A trigger that matches every device event
    pub fn catch_all() -> Self {
        Self::default()
    }

    /// A trigger restricted to the given devices
    pub fn for_devices(devices: impl IntoIterator<Item = DeviceId>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute filter
    pub fn with_attribute(mut self, filter: AttributeFilter) -> Self {
        self.attributes.push(filter);
        self
    }

    /// True when neither devices nor attributes restrict the trigger
    pub fn is_catch_all(&self) -> bool {
        self.devices.is_empty() && self.attributes.is_empty()
    }

    /// Union of the attribute names across all filters, in first-seen order
    pub fn all_attribute_names(&self) -> IndexSet<&str> {
        self.attributes
            .iter()
            .flat_map(|f| f.attribute_names.iter().map(String::as_str))
            .collect()
    }

    /// Check the attribute filters against an event
    ///
    /// Some filter naming the event's attribute must have a change group
    /// whose filters all hold.
    pub fn attributes_match(&self, event: &Event) -> bool {
        self.attributes.iter().any(|f| f.matches(event))
    }

    /// Count change filters that can never match
    pub fn invalid_filter_count(&self) -> usize {
        self.attributes
            .iter()
            .flat_map(|a| &a.change_groups)
            .flat_map(|g| &g.filters)
            .filter(|f| !f.is_valid())
            .count()
    }
}

/// Attribute filter: names plus OR-combined change groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    /// Attribute names this filter applies to
    pub attribute_names: IndexSet<String>,

    /// Change groups, any of which may satisfy the filter
    #[serde(default)]
    pub change_groups: Vec<ChangeGroup>,
}

impl AttributeFilter {
    /// Create a filter for the given attribute names
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            attribute_names: names.into_iter().map(Into::into).collect(),
            change_groups: Vec::new(),
        }
    }

    /// Add a change group
    pub fn with_group(mut self, group: ChangeGroup) -> Self {
        self.change_groups.push(group);
        self
    }

    /// Check whether this filter applies to the event and a group holds
    pub fn matches(&self, event: &Event) -> bool {
        self.attribute_names.contains(event.attribute_name.as_str())
            && self.change_groups.iter().any(|g| g.matches(event))
    }
}

/// AND-combined change filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeGroup {
    #[serde(default)]
    pub filters: Vec<ChangeFilter>,
}

impl ChangeGroup {
    /// Create a group from filters
    pub fn new(filters: impl IntoIterator<Item = ChangeFilter>) -> Self {
        Self {
            filters: filters.into_iter().collect(),
        }
    }

    /// An empty group holds vacuously
    pub fn matches(&self, event: &Event) -> bool {
        self.filters.iter().all(|f| f.matches(event))
    }
}

/// Value-change predicate kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    /// Any change
    Changes,
    /// New value equals
    Is,
    /// New value differs
    IsNot,
    /// Previous value equals
    Was,
    /// Previous value differs
    WasNot,
    /// Unrecognised predicate; never matches
    #[serde(other)]
    Invalid,
}

/// Value-change predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub name: ChangeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ChangeFilter {
    fn with_value(name: ChangeKind, value: impl Into<String>) -> Self {
        Self {
            name,
            value: Some(value.into()),
        }
    }

    pub fn changes() -> Self {
        Self {
            name: ChangeKind::Changes,
            value: None,
        }
    }

    pub fn is(value: impl Into<String>) -> Self {
        Self::with_value(ChangeKind::Is, value)
    }

    pub fn is_not(value: impl Into<String>) -> Self {
        Self::with_value(ChangeKind::IsNot, value)
    }

    pub fn was(value: impl Into<String>) -> Self {
        Self::with_value(ChangeKind::Was, value)
    }

    pub fn was_not(value: impl Into<String>) -> Self {
        Self::with_value(ChangeKind::WasNot, value)
    }

    /// False for invalid kinds and value predicates missing their value
    pub fn is_valid(&self) -> bool {
        match self.name {
            ChangeKind::Changes => true,
            ChangeKind::Invalid => false,
            _ => self.value.is_some(),
        }
    }

    /// Evaluate against an event
    pub fn matches(&self, event: &Event) -> bool {
        let value = self.value.as_deref();
        match (self.name, value) {
            (ChangeKind::Changes, _) => true,
            (ChangeKind::Is, Some(v)) => event.new_value == v,
            (ChangeKind::IsNot, Some(v)) => event.new_value != v,
            (ChangeKind::Was, Some(v)) => event.previous_value == v,
            (ChangeKind::WasNot, Some(v)) => event.previous_value != v,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch_event(new: &str, previous: &str) -> Event {
        Event::device(5, "switch", new, previous)
    }

    #[test]
    fn test_device_trigger_deserialize() {
        let json = r#"{
            "trigger_type": "hubitat_device_event",
            "devices": [5, 6],
            "attributes": [
                {
                    "attribute_names": ["switch"],
                    "change_groups": [
                        {"filters": [{"name": "is", "value": "on"}, {"name": "was-not", "value": "on"}]}
                    ]
                }
            ]
        }"#;

        let trigger: TriggerDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(trigger.trigger_type(), DEVICE_EVENT);

        let device = trigger.as_device().unwrap();
        assert_eq!(device.devices.len(), 2);
        assert_eq!(
            device.attributes[0].change_groups[0].filters[1].name,
            ChangeKind::WasNot
        );
    }

    #[test]
    fn test_unknown_trigger_type_is_tolerated() {
        let json = r#"[
            {"trigger_type": "zwave_scene", "scene": 3},
            {"trigger_type": "schedule", "cron": "0 0 7 * * ?"},
            {"trigger_type": "hubitat_device_event"}
        ]"#;

        let triggers: Vec<TriggerDefinition> = serde_json::from_str(json).unwrap();
        assert_eq!(triggers[0], TriggerDefinition::Unknown);
        assert_eq!(triggers[1].trigger_type(), SCHEDULE_TRIGGER);
        assert_eq!(device_triggers(&triggers).count(), 1);
        assert!(device_triggers(&triggers).next().unwrap().is_catch_all());
    }

    #[test]
    fn test_all_attribute_names_is_flattened_union() {
        let trigger = HubitatDeviceTriggerDefinition::catch_all()
            .with_attribute(AttributeFilter::new(["switch", "level"]))
            .with_attribute(AttributeFilter::new(["level", "motion"]));

        let names: Vec<&str> = trigger.all_attribute_names().into_iter().collect();
        assert_eq!(names, vec!["switch", "level", "motion"]);
        assert!(!trigger.is_catch_all());
    }

    #[test]
    fn test_change_filter_table() {
        let event = switch_event("on", "off");

        assert!(ChangeFilter::changes().matches(&event));
        assert!(ChangeFilter::is("on").matches(&event));
        assert!(!ChangeFilter::is("off").matches(&event));
        assert!(ChangeFilter::is_not("off").matches(&event));
        assert!(!ChangeFilter::is_not("on").matches(&event));
        assert!(ChangeFilter::was("off").matches(&event));
        assert!(!ChangeFilter::was("on").matches(&event));
        assert!(ChangeFilter::was_not("on").matches(&event));
        assert!(!ChangeFilter::was_not("off").matches(&event));
    }

    #[test]
    fn test_invalid_change_filter_matches_nothing() {
        let filter: ChangeFilter =
            serde_json::from_str(r#"{"name": "becomes", "value": "on"}"#).unwrap();
        assert_eq!(filter.name, ChangeKind::Invalid);
        assert!(!filter.matches(&switch_event("on", "off")));
        assert!(!filter.is_valid());

        let missing_value = ChangeFilter {
            name: ChangeKind::IsNot,
            value: None,
        };
        assert!(!missing_value.matches(&switch_event("on", "off")));
        assert!(!missing_value.is_valid());
    }

    #[test]
    fn test_change_group_is_and() {
        let group = ChangeGroup::new([ChangeFilter::is("on"), ChangeFilter::was("off")]);

        assert!(group.matches(&switch_event("on", "off")));
        assert!(!group.matches(&switch_event("on", "on")));
        assert!(ChangeGroup::default().matches(&switch_event("x", "y")));
    }

    #[test]
    fn test_attribute_filter_is_or_of_groups() {
        let filter = AttributeFilter::new(["switch"])
            .with_group(ChangeGroup::new([ChangeFilter::is("on")]))
            .with_group(ChangeGroup::new([ChangeFilter::was("on")]));

        assert!(filter.matches(&switch_event("on", "off")));
        assert!(filter.matches(&switch_event("off", "on")));
        assert!(!filter.matches(&switch_event("off", "off")));
        assert!(!filter.matches(&Event::device(5, "level", "on", "off")));
        assert!(!AttributeFilter::new(["switch"]).matches(&switch_event("on", "off")));
    }

    #[test]
    fn test_invalid_filter_count() {
        let trigger = HubitatDeviceTriggerDefinition::catch_all().with_attribute(
            AttributeFilter::new(["switch"]).with_group(ChangeGroup::new([
                ChangeFilter::is("on"),
                ChangeFilter {
                    name: ChangeKind::Invalid,
                    value: None,
                },
            ])),
        );
        assert_eq!(trigger.invalid_filter_count(), 1);
    }
}
