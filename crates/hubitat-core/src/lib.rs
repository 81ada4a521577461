//! Core types for the Hubitat rule engine
//!
//! This crate provides the fundamental types shared by the automation and
//! routing crates: the device [`Event`], its [`EventType`], and [`DeviceId`].

mod event;

pub use event::{DeviceId, Event, EventType};

/// Standard event types understood by the rule engine
pub mod events {
    /// Event type for device attribute changes reported by the hub
    pub const DEVICE_EVENT: &str = "hubitat_device_event";

    /// Event type for hub mode changes
    pub const MODE_CHANGED: &str = "hubitat_mode_changed";
}
