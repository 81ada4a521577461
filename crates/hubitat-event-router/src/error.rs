//! Error types for routing

use thiserror::Error;

/// Result type for router operations
pub type RouterResult<T> = Result<T, RouterError>;

/// Errors surfaced by the registry and the router
#[derive(Debug, Error)]
pub enum RouterError {
    /// The automation identity is already subscribed
    #[error("automation '{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// An automation callback failed while handling an event
    #[error("automation '{name}' failed handling event {event}")]
    AutomationCallback {
        name: String,
        event: String,
        #[source]
        source: anyhow::Error,
    },

    /// The dispatch worker is no longer accepting events
    #[error("dispatcher has stopped")]
    DispatcherStopped,
}
