//! Event router
//!
//! Walks the registry buckets relevant to an event, confirms each candidate
//! with the trigger evaluator, and calls back every matching automation at
//! most once per event.

use hubitat_automation::{AutomationRef, SharedAutomation, TriggerEvaluator};
use hubitat_core::Event;
use std::collections::HashSet;
use tracing::{debug, error, info, trace};

use crate::config::{FailurePolicy, RouterConfig};
use crate::error::{RouterError, RouterResult};
use crate::registry::SubscriptionRegistry;

/// A callback failure recorded under [`FailurePolicy::Continue`]
#[derive(Debug)]
pub struct DispatchFailure {
    pub automation: String,
    pub error: RouterError,
}

/// Outcome of one dispatch cycle
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Automations whose callback succeeded, in notification order
    pub notified: Vec<String>,

    /// Automations whose callback failed
    pub failures: Vec<DispatchFailure>,

    /// True when a failure ended the cycle early
    pub aborted: bool,

    /// Candidates skipped because their owner dropped them
    pub dropped: usize,
}

impl DispatchReport {
    /// Number of callbacks invoked, failed or not
    pub fn invoked(&self) -> usize {
        self.notified.len() + self.failures.len()
    }
}

/// Routes device events to subscribed automations
#[derive(Debug, Default)]
pub struct EventRouter {
    registry: SubscriptionRegistry,
    evaluator: TriggerEvaluator,
    config: RouterConfig,
}

impl EventRouter {
    /// Create a router with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router with the given settings
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replace the trigger evaluator
    pub fn with_evaluator(mut self, evaluator: TriggerEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Router settings
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Read-only view of the subscriptions
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Subscribe an automation
    ///
    /// Fails with [`RouterError::AlreadyRegistered`] if it is already subscribed.
    pub fn register(&mut self, automation: &SharedAutomation) -> RouterResult<()> {
        self.registry.register(automation)?;
        info!(automation = %automation.name(), "Registered automation");
        Ok(())
    }

    /// Unsubscribe an automation
    pub fn unregister(&mut self, automation: &SharedAutomation) -> bool {
        let removed = self.registry.unregister(automation);
        if removed {
            info!(automation = %automation.name(), "Unregistered automation");
        }
        removed
    }

    /// Remove subscriptions of automations their owners have dropped
    pub fn prune_dropped(&mut self) -> usize {
        let removed = self.registry.retain_live();
        if removed > 0 {
            info!(removed, "Pruned dropped automations");
        }
        removed
    }

    /// Deliver an event to every matching automation exactly once
    ///
    /// Events of any type other than the device-event marker are ignored.
    /// Under [`FailurePolicy::FailFast`] the first callback failure ends the
    /// cycle and is returned; candidates not yet visited miss the event.
    pub fn handle_event(&self, event: &Event) -> RouterResult<DispatchReport> {
        let mut report = self.dispatch(event);
        if report.aborted {
            if let Some(failure) = report.failures.pop() {
                return Err(failure.error);
            }
        }
        Ok(report)
    }

    /// Like [`EventRouter::handle_event`], but always returns the report
    ///
    /// An aborted cycle is flagged with [`DispatchReport::aborted`] and its
    /// failure is the last entry of [`DispatchReport::failures`].
    pub fn dispatch(&self, event: &Event) -> DispatchReport {
        let mut report = DispatchReport::default();

        if !event.is_device_event() {
            trace!(event_type = %event.event_type, "Ignoring non-device event");
            return report;
        }

        let mut pending: HashSet<&AutomationRef> = self.registry.all_subscribed().collect();

        let candidates = self
            .registry
            .catch_all_subscribers()
            .chain(self.registry.subscribers_for_device(event.device_id))
            .chain(self.registry.subscribers_for_attribute(&event.attribute_name));

        for candidate in candidates {
            if !pending.contains(candidate) {
                continue;
            }

            let Some(automation) = candidate.upgrade() else {
                debug!(?candidate, "Skipping dropped automation");
                pending.remove(candidate);
                report.dropped += 1;
                continue;
            };

            if !self.evaluator.automation_matches(automation.as_ref(), event) {
                continue;
            }
            pending.remove(candidate);

            let name = automation.name().to_string();
            debug!(
                automation = %name,
                device_id = event.device_id,
                attribute = %event.attribute_name,
                "Dispatching event"
            );

            match automation.handle_event(event) {
                Ok(()) => report.notified.push(name),
                Err(source) => {
                    error!(automation = %name, error = %source, "Automation failed handling event");
                    let error = RouterError::AutomationCallback {
                        name: name.clone(),
                        event: event.to_string(),
                        source,
                    };
                    report.failures.push(DispatchFailure {
                        automation: name,
                        error,
                    });
                    if self.config.failure_policy == FailurePolicy::FailFast {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubitat_automation::{Automation, HubitatDeviceTriggerDefinition, TriggerDefinition};
    use std::sync::{Arc, Mutex};

    struct Counter {
        triggers: Vec<TriggerDefinition>,
        calls: Mutex<usize>,
    }

    impl Automation for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn built_triggers(&self) -> &[TriggerDefinition] {
            &self.triggers
        }

        fn handle_event(&self, _event: &Event) -> anyhow::Result<()> {
            *self.calls.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_dropped_automation_is_skipped() {
        let mut router = EventRouter::new();
        let automation: SharedAutomation = Arc::new(Counter {
            triggers: vec![HubitatDeviceTriggerDefinition::catch_all().into()],
            calls: Mutex::new(0),
        });
        router.register(&automation).unwrap();
        drop(automation);

        let report = router
            .handle_event(&Event::device(1, "switch", "on", "off"))
            .unwrap();
        assert_eq!(report.invoked(), 0);
    }

    #[test]
    fn test_subscribed_twice_notified_once() {
        let mut router = EventRouter::new();
        let counter = Arc::new(Counter {
            triggers: vec![
                HubitatDeviceTriggerDefinition::catch_all().into(),
                HubitatDeviceTriggerDefinition::for_devices([9]).into(),
            ],
            calls: Mutex::new(0),
        });
        let automation: SharedAutomation = counter.clone();
        router.register(&automation).unwrap();

        let report = router
            .handle_event(&Event::device(9, "switch", "on", "off"))
            .unwrap();
        assert_eq!(report.notified, vec!["counter"]);
        assert_eq!(*counter.calls.lock().unwrap(), 1);
    }

    struct Broken(Vec<TriggerDefinition>);

    impl Automation for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn built_triggers(&self) -> &[TriggerDefinition] {
            &self.0
        }

        fn handle_event(&self, _event: &Event) -> anyhow::Result<()> {
            anyhow::bail!("broken")
        }
    }

    #[test]
    fn test_aborted_report_keeps_earlier_notifications() {
        let mut router = EventRouter::new();
        let first: SharedAutomation = Arc::new(Counter {
            triggers: vec![HubitatDeviceTriggerDefinition::catch_all().into()],
            calls: Mutex::new(0),
        });
        let broken: SharedAutomation = Arc::new(Broken(vec![
            HubitatDeviceTriggerDefinition::for_devices([9]).into(),
        ]));
        router.register(&first).unwrap();
        router.register(&broken).unwrap();

        let report = router.dispatch(&Event::device(9, "switch", "on", "off"));
        assert!(report.aborted);
        assert_eq!(report.notified, vec!["counter"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].automation, "broken");

        let err = router
            .handle_event(&Event::device(9, "switch", "on", "off"))
            .unwrap_err();
        assert!(matches!(err, RouterError::AutomationCallback { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_prune_dropped_after_dispatch() {
        let mut router = EventRouter::new();
        let automation: SharedAutomation = Arc::new(Counter {
            triggers: vec![HubitatDeviceTriggerDefinition::for_devices([1]).into()],
            calls: Mutex::new(0),
        });
        router.register(&automation).unwrap();
        drop(automation);

        let report = router.dispatch(&Event::device(1, "switch", "on", "off"));
        assert_eq!(report.dropped, 1);

        assert_eq!(router.prune_dropped(), 1);
        assert!(router.registry().is_empty());
        assert_eq!(router.dispatch(&Event::device(1, "switch", "on", "off")).dropped, 0);
    }
}
