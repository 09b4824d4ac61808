// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device registry.
//!
//! The [`DeviceRegistry`] is the authoritative in-memory table of
//! [`DeviceRecord`]s, keyed by topic. Every record sits behind its own
//! lock, so events for unrelated topics never contend with each other
//! while events for one topic are applied one at a time.
//!
//! Records are only mutated by the crate's synchronizer. Callers get
//! snapshots.
//!
//! # Examples
//!
//! ```
//! use homesync_lib::config::DeviceConfig;
//! use homesync_lib::registry::DeviceRegistry;
//! use homesync_lib::types::PowerState;
//!
//! let registry = DeviceRegistry::from_configs([
//!     DeviceConfig::new("home/room1/lamp"),
//!     DeviceConfig::new("home/room2/lamp"),
//! ])
//! .unwrap();
//!
//! let lamp = registry.get("home/room1/lamp").unwrap();
//! assert_eq!(lamp.state(), PowerState::Off);
//! assert_eq!(lamp.revision(), 0);
//! assert!(registry.get("home/attic/lamp").is_none());
//! ```

mod device_id;
mod record;

pub use device_id::DeviceId;
pub use record::{DeviceRecord, UpsertOutcome};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::DeviceConfig;
use crate::error::ValueError;
use crate::types::{ChangeOrigin, PowerState};

type Slot = Arc<Mutex<DeviceRecord>>;

#[derive(Debug, Default)]
struct Table {
    /// Topic to index into `slots`.
    by_topic: HashMap<String, usize>,
    /// Records in registration order.
    slots: Vec<Slot>,
}

/// In-memory table of device records keyed by topic.
///
/// Lookups are O(1). Records are never removed during a session.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    table: RwLock<Table>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from an ordered list of device configurations.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::DuplicateTopic` if two configurations share a topic.
    pub fn from_configs(
        configs: impl IntoIterator<Item = DeviceConfig>,
    ) -> Result<Self, ValueError> {
        let registry = Self::new();
        for config in configs {
            registry.insert(&config)?;
        }
        Ok(registry)
    }

    /// Registers a new device in its initial state.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::DuplicateTopic` if the topic is already registered.
    pub fn insert(&self, config: &DeviceConfig) -> Result<DeviceId, ValueError> {
        let mut table = self.table.write();
        if table.by_topic.contains_key(&config.topic) {
            return Err(ValueError::DuplicateTopic(config.topic.clone()));
        }

        let record = DeviceRecord::from_config(config);
        let id = record.id();
        let index = table.slots.len();
        table.slots.push(Arc::new(Mutex::new(record)));
        table.by_topic.insert(config.topic.clone(), index);

        tracing::debug!(
            topic = %config.topic,
            kind = %config.kind(),
            qos = %config.qos,
            "Registered device"
        );
        Ok(id)
    }

    /// Returns a snapshot of the record for `topic`, if registered.
    #[must_use]
    pub fn get(&self, topic: &str) -> Option<DeviceRecord> {
        self.slot(topic).map(|slot| slot.lock().clone())
    }

    /// Returns `true` if the topic is registered.
    #[must_use]
    pub fn contains(&self, topic: &str) -> bool {
        self.table.read().by_topic.contains_key(topic)
    }

    /// Returns the number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().slots.len()
    }

    /// Returns `true` if no device is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the registered topics in registration order.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .map(|record| record.topic().to_string())
            .collect()
    }

    /// Returns a copy of every record, in registration order.
    ///
    /// Safe to call while other threads mutate records; each record is
    /// copied under its own lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        let slots: Vec<Slot> = self.table.read().slots.clone();
        slots.iter().map(|slot| slot.lock().clone()).collect()
    }

    /// Applies `state` to the record for `topic`.
    ///
    /// Returns `None` for an unknown topic. A state equal to the current
    /// one is a no-op and leaves the revision untouched.
    pub(crate) fn upsert_state(
        &self,
        topic: &str,
        state: PowerState,
        origin: ChangeOrigin,
    ) -> Option<UpsertOutcome> {
        self.update(topic, |record| {
            if record.apply(state, origin, None) {
                UpsertOutcome::Changed(record.clone())
            } else {
                UpsertOutcome::Unchanged(record.clone())
            }
        })
    }

    /// Flips the state of `topic` as a local change.
    ///
    /// Reading the current state and writing its opposite happen under the
    /// same record lock.
    pub(crate) fn toggle(&self, topic: &str) -> Option<UpsertOutcome> {
        self.update(topic, |record| {
            let next = record.state().toggled();
            record.apply(next, ChangeOrigin::Local, None);
            UpsertOutcome::Changed(record.clone())
        })
    }

    /// Applies a state delivered by the broker.
    ///
    /// A delivery carrying a sequence `marker` at or below the current
    /// revision is a duplicate or out-of-date redelivery and is discarded.
    pub(crate) fn apply_remote(
        &self,
        topic: &str,
        state: PowerState,
        marker: Option<u64>,
    ) -> Option<UpsertOutcome> {
        self.update(topic, |record| {
            if let Some(marker) = marker
                && marker <= record.revision()
            {
                return UpsertOutcome::Stale {
                    record: record.clone(),
                    marker,
                };
            }
            if record.apply(state, ChangeOrigin::Remote, marker) {
                UpsertOutcome::Changed(record.clone())
            } else {
                UpsertOutcome::Unchanged(record.clone())
            }
        })
    }

    /// Runs `f` on the record for `topic` if its revision is still
    /// `revision`.
    ///
    /// Returns `None` for an unknown topic or when a later change has been
    /// committed since. `f` runs under the record lock and must not call
    /// back into the registry.
    pub(crate) fn if_current<R>(
        &self,
        topic: &str,
        revision: u64,
        f: impl FnOnce(&DeviceRecord) -> R,
    ) -> Option<R> {
        let slot = self.slot(topic)?;
        let record = slot.lock();
        (record.revision() == revision).then(|| f(&record))
    }

    fn update<F>(&self, topic: &str, f: F) -> Option<UpsertOutcome>
    where
        F: FnOnce(&mut DeviceRecord) -> UpsertOutcome,
    {
        let slot = self.slot(topic)?;
        let mut record = slot.lock();
        Some(f(&mut record))
    }

    fn slot(&self, topic: &str) -> Option<Slot> {
        let table = self.table.read();
        table
            .by_topic
            .get(topic)
            .and_then(|&index| table.slots.get(index))
            .cloned()
    }
}
