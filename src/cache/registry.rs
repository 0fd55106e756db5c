//! Subscriber registry: identifier allocation, entry bookkeeping, and
//! notification-target selection.
//!
//! Owned exclusively by the engine and only ever touched under its lock;
//! nothing in here synchronises on its own.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::timer::TimerHandle;
use crate::types::{DeliveryPolicy, SubscriberId};

use super::listener::CacheListener;

/// What produced a snapshot update, for deciding who gets notified.
///
/// Push updates reach only `ImmediateOnChange` subscribers; a materialized
/// fetch reaches everyone who is not `Suppressed`. This asymmetry is a
/// contract, not an accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    Push,
    Fetch,
}

impl Trigger {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Trigger::Push => "push",
            Trigger::Fetch => "fetch",
        }
    }
}

/// Whether a subscriber with `policy` is notified for `trigger`.
pub(crate) fn should_notify(policy: DeliveryPolicy, trigger: Trigger) -> bool {
    match (trigger, policy) {
        (Trigger::Push, DeliveryPolicy::ImmediateOnChange) => true,
        (Trigger::Push, DeliveryPolicy::PeriodicOrDefault | DeliveryPolicy::Suppressed) => false,
        (Trigger::Fetch, DeliveryPolicy::ImmediateOnChange | DeliveryPolicy::PeriodicOrDefault) => {
            true
        }
        (Trigger::Fetch, DeliveryPolicy::Suppressed) => false,
    }
}

/// One registered subscriber.
pub(crate) struct Subscriber {
    pub(crate) policy: DeliveryPolicy,
    pub(crate) cadence: Duration,
    /// Present only while the subscriber's own poll timer is armed.
    pub(crate) timer: Option<TimerHandle>,
    pub(crate) listener: Arc<dyn CacheListener>,
}

/// In-memory map from subscriber id to entry, with monotonic id allocation.
pub(crate) struct SubscriberRegistry {
    entries: HashMap<SubscriberId, Subscriber>,
    last_id: u64,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            last_id: 0,
        }
    }

    /// Allocate a fresh id: monotonic counter with an occupancy-checked
    /// retry loop, so wrap-around can never hand out zero or a live id.
    fn alloc_id(&mut self) -> SubscriberId {
        loop {
            self.last_id = self.last_id.wrapping_add(1);
            if let Some(id) = SubscriberId::new(self.last_id)
                && !self.entries.contains_key(&id)
            {
                return id;
            }
        }
    }

    /// Store a subscriber under a fresh id and return the id.
    pub(crate) fn insert(&mut self, subscriber: Subscriber) -> SubscriberId {
        let id = self.alloc_id();
        self.entries.insert(id, subscriber);
        id
    }

    /// Remove a subscriber, returning its entry if it was registered.
    pub(crate) fn remove(&mut self, id: SubscriberId) -> Option<Subscriber> {
        self.entries.remove(&id)
    }

    /// Find the subscriber whose poll timer is `handle`.
    pub(crate) fn subscriber_for_timer(
        &mut self,
        handle: TimerHandle,
    ) -> Option<(SubscriberId, &mut Subscriber)> {
        self.entries
            .iter_mut()
            .find(|(_, sub)| sub.timer == Some(handle))
            .map(|(id, sub)| (*id, sub))
    }

    /// Listeners to invoke for an update produced by `trigger`.
    ///
    /// Cloned out so the engine can drop its lock before calling back.
    pub(crate) fn targets(&self, trigger: Trigger) -> Vec<Arc<dyn CacheListener>> {
        self.entries
            .values()
            .filter(|sub| should_notify(sub.policy, trigger))
            .map(|sub| Arc::clone(&sub.listener))
            .collect()
    }

    /// Every armed subscriber timer, for teardown.
    pub(crate) fn armed_timers(&self) -> Vec<TimerHandle> {
        self.entries.values().filter_map(|sub| sub.timer).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
