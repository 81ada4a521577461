//! Event types delivered to the rule engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::DEVICE_EVENT;

/// Numeric identifier the hub assigns to a device
pub type DeviceId = i64;

/// Event type identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventType(String);

impl EventType {
    /// Create a new event type
    pub fn new(event_type: impl Into<String>) -> Self {
        Self(event_type.into())
    }

    /// The device-event marker
    pub fn device() -> Self {
        Self(DEVICE_EVENT.to_string())
    }

    /// Get the event type as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the device-event marker
    pub fn is_device_event(&self) -> bool {
        self.0 == DEVICE_EVENT
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A state-change event reported by the hub
///
/// Only events whose type is the device-event marker carry meaningful
/// device fields; the router ignores every other type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The type of event
    pub event_type: EventType,

    /// Device that reported the change
    pub device_id: DeviceId,

    /// Attribute that changed (e.g. "switch", "temperature")
    pub attribute_name: String,

    /// Value after the change
    pub new_value: String,

    /// Value before the change
    #[serde(default)]
    pub previous_value: String,

    /// When the event was fired
    #[serde(default = "Utc::now")]
    pub time_fired: DateTime<Utc>,
}

impl Event {
    /// Create a new event with the current timestamp
    pub fn new(
        event_type: impl Into<EventType>,
        device_id: DeviceId,
        attribute_name: impl Into<String>,
        new_value: impl Into<String>,
        previous_value: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            device_id,
            attribute_name: attribute_name.into(),
            new_value: new_value.into(),
            previous_value: previous_value.into(),
            time_fired: Utc::now(),
        }
    }

    /// Create a device event
    pub fn device(
        device_id: DeviceId,
        attribute_name: impl Into<String>,
        new_value: impl Into<String>,
        previous_value: impl Into<String>,
    ) -> Self {
        Self::new(
            EventType::device(),
            device_id,
            attribute_name,
            new_value,
            previous_value,
        )
    }

    /// Check whether this event should be routed to automations
    pub fn is_device_event(&self) -> bool {
        self.event_type.is_device_event()
    }
}

/// Renders the full payload as JSON, falling back to the debug form
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
