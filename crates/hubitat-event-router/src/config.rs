//! Router configuration

use serde::{Deserialize, Serialize};

/// Default capacity of the dispatch queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// What the router does when an automation callback fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the dispatch cycle and return the error; later candidates miss the event
    #[default]
    FailFast,

    /// Notify every remaining candidate and collect failures in the report
    Continue,
}

/// Router settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Events buffered ahead of the dispatch worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_map() {
        let config: RouterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn test_continue_policy() {
        let config: RouterConfig =
            serde_json::from_str(r#"{"failure_policy": "continue", "queue_capacity": 8}"#)
                .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.queue_capacity, 8);
    }
}
