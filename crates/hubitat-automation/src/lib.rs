//! Automation triggers and matching
//!
//! This crate provides the trigger model and the matching logic for the
//! Hubitat rule engine. Automations declare which device events they want
//! through trigger definitions; the matcher decides whether a given event
//! satisfies them.
//!
//! # Architecture
//!
//! ```text
//! OR over triggers
//!   → device id listed (if restricted)
//!   → OR over attribute filters naming the attribute
//!     → OR over change groups
//!       → AND over change filters
//! ```
//!
//! # Key Types
//!
//! - [`TriggerDefinition`] - Tagged trigger declared by an automation
//! - [`HubitatDeviceTriggerDefinition`] - Device/attribute/value-change trigger
//! - [`Automation`] - Callback target registered with the router
//! - [`TriggerEvaluator`] - Per-tag matcher registry

pub mod automation;
pub mod matcher;
pub mod trigger;

pub use automation::{
    Automation, AutomationConfig, AutomationDefinition, AutomationRef, SharedAutomation,
};
pub use matcher::{matches, DeviceTriggerMatcher, TriggerEvaluator, TriggerMatcher};
pub use trigger::{
    device_triggers, AttributeFilter, ChangeFilter, ChangeGroup, ChangeKind,
    HubitatDeviceTriggerDefinition, ModeTriggerDefinition, ScheduleTriggerDefinition,
    TriggerDefinition,
};
