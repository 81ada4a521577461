//! Subscription registry
//!
//! Three independent indices (by device id, by attribute name, catch-all)
//! plus the derived set of every subscribed automation. The derived set is
//! rebuilt from the indices on each unregister.

use hubitat_automation::{device_triggers, AutomationRef, SharedAutomation};
use hubitat_core::DeviceId;
use indexmap::{Equivalent, IndexMap, IndexSet};
use std::hash::Hash;
use tracing::{debug, trace};

use crate::error::{RouterError, RouterResult};

type Bucket = IndexSet<AutomationRef>;

/// Where a device trigger is indexed
enum Slot<'a> {
    CatchAll,
    Devices(&'a IndexSet<DeviceId>),
    Attributes(IndexSet<&'a str>),
}

fn slots(automation: &SharedAutomation) -> impl Iterator<Item = Slot<'_>> {
    device_triggers(automation.built_triggers()).map(|trigger| {
        if trigger.is_catch_all() {
            Slot::CatchAll
        } else if !trigger.devices.is_empty() {
            Slot::Devices(&trigger.devices)
        } else {
            Slot::Attributes(trigger.all_attribute_names())
        }
    })
}

/// Indexed subscriptions of registered automations
///
/// Holds only non-owning [`AutomationRef`] handles; dropping an automation
/// is always the caller's job.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    by_device: IndexMap<DeviceId, Bucket>,
    by_attribute: IndexMap<String, Bucket>,
    catch_all: Bucket,
    subscribed: Bucket,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Index an automation by its device triggers
    ///
    /// Automations whose device triggers index nothing are left out of every
    /// index and of the subscribed set.
    pub fn register(&mut self, automation: &SharedAutomation) -> RouterResult<()> {
        let handle = AutomationRef::new(automation);

        if self.subscribed.contains(&handle) {
            return Err(RouterError::AlreadyRegistered {
                name: automation.name().to_string(),
            });
        }

        let mut indexed = false;
        for slot in slots(automation) {
            match slot {
                Slot::CatchAll => {
                    indexed |= self.catch_all.insert(handle.clone());
                }
                Slot::Devices(devices) => {
                    for device_id in devices {
                        indexed |= self
                            .by_device
                            .entry(*device_id)
                            .or_default()
                            .insert(handle.clone());
                    }
                }
                Slot::Attributes(names) => {
                    for name in names {
                        indexed |= self
                            .by_attribute
                            .entry(name.to_string())
                            .or_default()
                            .insert(handle.clone());
                    }
                }
            }
        }

        // an attribute trigger naming no attributes lands in no bucket
        if indexed {
            self.subscribed.insert(handle.clone());
        }

        trace!(
            automation = %automation.name(),
            subscribed = self.subscribed.contains(&handle),
            "Indexed automation"
        );
        Ok(())
    }

    /// Remove an automation from the buckets its triggers describe
    ///
    /// Returns whether the automation was subscribed before the call.
    pub fn unregister(&mut self, automation: &SharedAutomation) -> bool {
        let handle = AutomationRef::new(automation);
        let was_subscribed = self.subscribed.contains(&handle);

        for slot in slots(automation) {
            match slot {
                Slot::CatchAll => {
                    self.catch_all.shift_remove(&handle);
                }
                Slot::Devices(devices) => {
                    for device_id in devices {
                        remove_from(&mut self.by_device, device_id, &handle);
                    }
                }
                Slot::Attributes(names) => {
                    for name in names {
                        remove_from(&mut self.by_attribute, name, &handle);
                    }
                }
            }
        }

        self.rebuild_subscribed();

        if !was_subscribed {
            debug!(automation = %automation.name(), "Unregistered automation was not subscribed");
        }
        was_subscribed
    }

    /// Drop handles whose automation has been dropped by its owner
    ///
    /// Returns how many automations were removed.
    pub fn retain_live(&mut self) -> usize {
        let before = self.subscribed.len();

        self.catch_all.retain(AutomationRef::is_live);
        retain_live_buckets(&mut self.by_device);
        retain_live_buckets(&mut self.by_attribute);
        self.rebuild_subscribed();

        let removed = before - self.subscribed.len();
        if removed > 0 {
            debug!(removed, "Pruned dropped automations");
        }
        removed
    }

    fn rebuild_subscribed(&mut self) {
        self.subscribed = self
            .catch_all
            .iter()
            .chain(self.by_device.values().flatten())
            .chain(self.by_attribute.values().flatten())
            .cloned()
            .collect();
    }

    /// Subscribers indexed under a device id
    pub fn subscribers_for_device(
        &self,
        device_id: DeviceId,
    ) -> impl Iterator<Item = &AutomationRef> + '_ {
        self.by_device.get(&device_id).into_iter().flatten()
    }

    /// Subscribers indexed under an attribute name
    pub fn subscribers_for_attribute<'a>(
        &'a self,
        attribute_name: &str,
    ) -> impl Iterator<Item = &'a AutomationRef> + 'a {
        self.by_attribute.get(attribute_name).into_iter().flatten()
    }

    /// Subscribers of every device event
    pub fn catch_all_subscribers(&self) -> impl Iterator<Item = &AutomationRef> + '_ {
        self.catch_all.iter()
    }

    /// Every subscribed automation
    pub fn all_subscribed(&self) -> impl Iterator<Item = &AutomationRef> + '_ {
        self.subscribed.iter()
    }

    /// Check whether an automation is subscribed
    pub fn contains(&self, automation: &SharedAutomation) -> bool {
        self.subscribed.contains(&AutomationRef::new(automation))
    }

    /// Number of subscribed automations
    pub fn len(&self) -> usize {
        self.subscribed.len()
    }

    /// Check whether no automation is subscribed
    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty()
    }
}

fn retain_live_buckets<K>(index: &mut IndexMap<K, Bucket>) {
    index.retain(|_, bucket| {
        bucket.retain(AutomationRef::is_live);
        !bucket.is_empty()
    });
}

fn remove_from<K, Q>(index: &mut IndexMap<K, Bucket>, key: &Q, handle: &AutomationRef)
where
    K: Hash + Eq,
    Q: Hash + Equivalent<K> + ?Sized,
{
    if let Some(bucket) = index.get_mut(key) {
        bucket.shift_remove(handle);
        if bucket.is_empty() {
            index.shift_remove(key);
        }
    }
}
