//! Event routing for Hubitat automations
//!
//! This crate provides the [`SubscriptionRegistry`], which indexes registered
//! automations by device id, by attribute name, and as catch-all subscribers,
//! and the [`EventRouter`], which delivers each device event to every
//! matching automation exactly once.
//!
//! # Dispatch order
//!
//! For one event, candidates are visited as catch-all subscribers, then
//! subscribers of the event's device, then subscribers of its attribute.
//! Within a bucket, registration order is kept.
//!
//! The [`Dispatcher`] runs the router on a single worker task so events are
//! handled one at a time.

mod config;
mod dispatcher;
mod error;
mod registry;
mod router;

pub use config::{FailurePolicy, RouterConfig, DEFAULT_QUEUE_CAPACITY};
pub use dispatcher::{DispatchStats, Dispatcher, DispatcherHandle, SharedRouter};
pub use error::{RouterError, RouterResult};
pub use registry::SubscriptionRegistry;
pub use router::{DispatchFailure, DispatchReport, EventRouter};
