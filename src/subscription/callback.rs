// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observer registration and dispatch.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`ObserverRegistry`] - Registry that stores observers and dispatches changes

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::ObserverError;
use crate::registry::DeviceRecord;

/// Unique identifier for a subscription.
///
/// Ids increase monotonically, so they also encode subscription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Observer of accepted state changes.
type StateObserver = Arc<dyn Fn(&DeviceRecord) -> Result<(), ObserverError> + Send + Sync>;

/// Observer of the process-wide stale indicator.
type StalenessObserver = Arc<dyn Fn(bool) + Send + Sync>;

/// Registry of observers notified on every accepted state change.
///
/// Observers run synchronously, in subscription order, on the thread that
/// committed the change. An observer that returns an error or panics is
/// reported and skipped; the remaining observers still run.
///
/// # Examples
///
/// ```
/// use homesync_lib::subscription::ObserverRegistry;
///
/// let observers = ObserverRegistry::new();
/// let id = observers.on_state_changed(|record| {
///     println!("{} is now {}", record.display_name(), record.state());
/// });
/// assert_eq!(observers.observer_count(), 1);
///
/// observers.unsubscribe(id);
/// assert!(observers.is_empty());
/// ```
pub struct ObserverRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// State change observers, ordered by subscription.
    state_observers: RwLock<BTreeMap<SubscriptionId, StateObserver>>,
    /// Stale indicator observers, ordered by subscription.
    staleness_observers: RwLock<BTreeMap<SubscriptionId, StalenessObserver>>,
}

impl ObserverRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_observers: RwLock::new(BTreeMap::new()),
            staleness_observers: RwLock::new(BTreeMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a fallible observer of state changes.
    ///
    /// The observer receives a snapshot of the record after each accepted
    /// change. An `Err` is logged and collected by [`dispatch`](Self::dispatch).
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&DeviceRecord) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_observers.write().insert(id, Arc::new(observer));
        id
    }

    /// Registers an infallible observer of state changes.
    pub fn on_state_changed<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&DeviceRecord) + Send + Sync + 'static,
    {
        self.subscribe(move |record| {
            observer(record);
            Ok(())
        })
    }

    /// Registers an observer of the stale indicator.
    ///
    /// The observer receives `true` when the broker connection is lost and
    /// `false` once it is re-established.
    pub fn on_staleness_changed<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.staleness_observers
            .write()
            .insert(id, Arc::new(observer));
        id
    }

    /// Unregisters an observer by its subscription ID.
    ///
    /// Returns `true` if an observer was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.state_observers.write().remove(&id).is_some() {
            return true;
        }
        self.staleness_observers.write().remove(&id).is_some()
    }

    /// Removes every observer.
    pub fn clear(&self) {
        self.state_observers.write().clear();
        self.staleness_observers.write().clear();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Notifies every state observer of `record`.
    ///
    /// Returns the failures, one per failing observer. The observer list is
    /// copied before dispatch, so observers may subscribe or unsubscribe
    /// from inside a callback.
    pub fn dispatch(&self, record: &DeviceRecord) -> Vec<ObserverError> {
        let observers: Vec<(SubscriptionId, StateObserver)> = self
            .state_observers
            .read()
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect();

        let mut failures = Vec::new();
        for (id, observer) in observers {
            let result = match catch_unwind(AssertUnwindSafe(|| observer(record))) {
                Ok(result) => result.map_err(|e| e.with_subscription(id.value())),
                Err(panic) => Err(ObserverError::Panicked {
                    subscription: id.value(),
                    message: panic_message(panic.as_ref()),
                }),
            };
            if let Err(error) = result {
                tracing::warn!(
                    subscription = %id,
                    topic = %record.topic(),
                    error = %error,
                    "State observer failed"
                );
                failures.push(error);
            }
        }
        failures
    }

    /// Notifies every staleness observer.
    ///
    /// Returns the number of observers that panicked.
    pub fn dispatch_staleness(&self, stale: bool) -> usize {
        let observers: Vec<(SubscriptionId, StalenessObserver)> = self
            .staleness_observers
            .read()
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect();

        let mut panicked = 0;
        for (id, observer) in observers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| observer(stale))) {
                tracing::warn!(
                    subscription = %id,
                    stale,
                    message = %panic_message(panic.as_ref()),
                    "Staleness observer panicked"
                );
                panicked += 1;
            }
        }
        panicked
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.state_observers.read().len() + self.staleness_observers.read().len()
    }

    /// Returns `true` if there are no registered observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observer_count() == 0
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observer_count", &self.observer_count())
            .finish()
    }
}
