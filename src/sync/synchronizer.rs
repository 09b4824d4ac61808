// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The state synchronizer.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::codec::PayloadCodec;
use crate::config::DeviceConfig;
use crate::error::{Error, ValueError};
use crate::protocol::{MessageSink, Transport};
use crate::registry::{DeviceRecord, DeviceRegistry, UpsertOutcome};
use crate::subscription::ObserverRegistry;
use crate::sync::{PublishStatus, RemoteOutcome, ToggleOutcome};
use crate::types::{ChangeOrigin, PowerState};

/// Keeps the device registry and the broker in step.
///
/// Local intents update the registry optimistically, notify observers and
/// publish. Inbound messages update the registry and notify observers but
/// are never published back.
///
/// A `Synchronizer` is `Send + Sync`; share it behind an `Arc` between the
/// control thread and the transport's delivery task.
pub struct Synchronizer<T: Transport> {
    registry: DeviceRegistry,
    codec: PayloadCodec,
    observers: ObserverRegistry,
    transport: T,
    /// Set while the broker connection is down.
    stale: AtomicBool,
    /// Topics whose last local publish failed.
    pending: Mutex<BTreeSet<String>>,
}

impl<T: Transport> Synchronizer<T> {
    /// Creates a synchronizer over an existing registry.
    #[must_use]
    pub fn new(registry: DeviceRegistry, transport: T) -> Self {
        Self {
            registry,
            codec: PayloadCodec::new(),
            observers: ObserverRegistry::new(),
            transport,
            stale: AtomicBool::new(false),
            pending: Mutex::new(BTreeSet::new()),
        }
    }

    /// Creates a synchronizer for an ordered list of devices.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::DuplicateTopic` if two devices share a topic.
    pub fn from_configs(
        configs: impl IntoIterator<Item = DeviceConfig>,
        transport: T,
    ) -> Result<Self, ValueError> {
        Ok(Self::new(DeviceRegistry::from_configs(configs)?, transport))
    }

    /// Replaces the payload codec.
    #[must_use]
    pub fn with_codec(mut self, codec: PayloadCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Returns the device registry.
    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Returns the observer registry.
    #[must_use]
    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the payload codec.
    #[must_use]
    pub fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    /// Returns `true` while the broker connection is lost.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Returns the topics waiting for a publish retry, sorted.
    #[must_use]
    pub fn pending_topics(&self) -> Vec<String> {
        self.pending.lock().iter().cloned().collect()
    }

    // =========================================================================
    // Local intents
    // =========================================================================

    /// Flips the state of a device and publishes the new state.
    ///
    /// Observers are notified after the registry update and before the
    /// publish. A failed publish does not roll back the local state; it is
    /// reported in the outcome and retried on reconnection.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDevice` if the topic is not registered.
    pub fn on_local_toggle(&self, topic: &str) -> Result<ToggleOutcome, Error> {
        let Some(outcome) = self.registry.toggle(topic) else {
            tracing::warn!(topic = %topic, "Local toggle for unknown device");
            return Err(Error::UnknownDevice(topic.to_string()));
        };
        Ok(self.commit_local(outcome))
    }

    /// Sets a device to `state` and publishes it if it changed.
    ///
    /// Setting the current state is a no-op: no notification, no publish.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDevice` if the topic is not registered.
    pub fn set_state(&self, topic: &str, state: PowerState) -> Result<ToggleOutcome, Error> {
        let Some(outcome) = self.registry.upsert_state(topic, state, ChangeOrigin::Local) else {
            tracing::warn!(topic = %topic, state = %state, "Local set for unknown device");
            return Err(Error::UnknownDevice(topic.to_string()));
        };
        Ok(self.commit_local(outcome))
    }

    fn commit_local(&self, outcome: UpsertOutcome) -> ToggleOutcome {
        let UpsertOutcome::Changed(record) = outcome else {
            let record = outcome.into_record();
            tracing::debug!(topic = %record.topic(), "Local state already current");
            return ToggleOutcome {
                record,
                changed: false,
                publish: PublishStatus::Skipped,
                observer_failures: Vec::new(),
            };
        };

        tracing::debug!(
            topic = %record.topic(),
            state = %record.state(),
            revision = record.revision(),
            "Local change accepted"
        );

        let observer_failures = self.observers.dispatch(&record);
        let publish = self.publish(&record);

        ToggleOutcome {
            record,
            changed: true,
            publish,
            observer_failures,
        }
    }

    /// Publishes `record` unless a newer change to the device was committed
    /// in the meantime.
    ///
    /// The publish runs under the record lock, so publishes for one topic
    /// leave in revision order and the last one carries the latest state.
    fn publish(&self, record: &DeviceRecord) -> PublishStatus {
        let payload = self.codec.encode(record, record.state());
        let status = self
            .registry
            .if_current(record.topic(), record.revision(), |current| {
                match self.transport.publish(current.topic(), &payload, current.qos()) {
                    Ok(()) => {
                        self.pending.lock().remove(current.topic());
                        PublishStatus::Published
                    }
                    Err(e) => {
                        self.pending.lock().insert(current.topic().to_string());
                        PublishStatus::Pending(e)
                    }
                }
            });

        match status {
            Some(PublishStatus::Pending(e)) => {
                tracing::warn!(
                    topic = %record.topic(),
                    qos = %record.qos(),
                    error = %e,
                    "Publish failed, keeping local state"
                );
                PublishStatus::Pending(e)
            }
            Some(status) => status,
            None => {
                tracing::debug!(
                    topic = %record.topic(),
                    revision = record.revision(),
                    "Newer change committed, publish skipped"
                );
                PublishStatus::Superseded
            }
        }
    }

    // =========================================================================
    // Remote messages
    // =========================================================================

    /// Reconciles an inbound message with the registry.
    ///
    /// A state equal to the current one (such as the echo of our own
    /// publish) is a no-op. A different state is adopted and observers are
    /// notified. Nothing is ever published from here.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownDevice` if the topic is not registered
    /// - `Error::MalformedPayload` if the payload cannot be decoded
    ///
    /// The registry is untouched in both cases.
    pub fn on_remote_message(&self, topic: &str, payload: &[u8]) -> Result<RemoteOutcome, Error> {
        let Some(device) = self.registry.get(topic) else {
            tracing::warn!(topic = %topic, "Message for unknown device discarded");
            return Err(Error::UnknownDevice(topic.to_string()));
        };

        let decoded = self.codec.decode(&device, payload).map_err(|e| {
            tracing::warn!(
                topic = %topic,
                payload = %String::from_utf8_lossy(payload),
                error = %e,
                "Malformed payload discarded"
            );
            e
        })?;

        let outcome = self
            .registry
            .apply_remote(topic, decoded.state, decoded.marker)
            .ok_or_else(|| Error::UnknownDevice(topic.to_string()))?;

        Ok(match outcome {
            UpsertOutcome::Changed(record) => {
                tracing::debug!(
                    topic = %topic,
                    state = %record.state(),
                    revision = record.revision(),
                    "Remote change accepted"
                );
                // The broker now holds a newer state than the failed publish
                self.pending.lock().remove(topic);
                let observer_failures = self.observers.dispatch(&record);
                RemoteOutcome::Applied {
                    record,
                    observer_failures,
                }
            }
            UpsertOutcome::Unchanged(record) => {
                tracing::debug!(
                    topic = %topic,
                    revision = record.revision(),
                    "Echo suppressed"
                );
                RemoteOutcome::Unchanged(record)
            }
            UpsertOutcome::Stale { record, marker } => {
                tracing::debug!(
                    topic = %topic,
                    marker,
                    revision = record.revision(),
                    "Stale delivery discarded"
                );
                RemoteOutcome::Stale { record, marker }
            }
        })
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Subscribes the transport to every registered topic at its own QoS.
    ///
    /// Returns the number of subscriptions requested.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on the first subscription that fails.
    pub fn subscribe_all(&self) -> Result<usize, Error> {
        let devices = self.registry.snapshot();
        for device in &devices {
            self.transport.subscribe(device.topic(), device.qos())?;
            tracing::debug!(topic = %device.topic(), qos = %device.qos(), "Subscribed");
        }
        tracing::info!(count = devices.len(), "Subscribed to all device topics");
        Ok(devices.len())
    }

    /// Marks the process stale after the broker connection was lost.
    ///
    /// Device records are left as they are.
    pub fn on_connection_lost(&self, cause: &str) {
        tracing::info!(cause = %cause, "Broker connection lost, device states are stale");
        if !self.stale.swap(true, Ordering::AcqRel) {
            self.observers.dispatch_staleness(true);
        }
    }

    /// Clears the stale indicator and republishes pending topics.
    ///
    /// Returns the number of topics republished.
    pub fn on_reconnected(&self) -> usize {
        tracing::info!("Broker connection re-established");
        if self.stale.swap(false, Ordering::AcqRel) {
            self.observers.dispatch_staleness(false);
        }
        self.retry_pending()
    }

    /// Republishes the current state of every pending topic.
    ///
    /// Topics whose publish fails again stay pending. Returns the number of
    /// topics republished.
    pub fn retry_pending(&self) -> usize {
        let topics = std::mem::take(&mut *self.pending.lock());
        if topics.is_empty() {
            return 0;
        }

        let mut republished = 0;
        for topic in topics {
            let Some(record) = self.registry.get(&topic) else {
                continue;
            };
            if matches!(self.publish(&record), PublishStatus::Published) {
                republished += 1;
            }
        }

        tracing::info!(
            republished,
            pending = self.pending.lock().len(),
            "Retried pending publishes"
        );
        republished
    }
}

impl<T: Transport> MessageSink for Synchronizer<T> {
    fn on_message(&self, topic: &str, payload: &[u8]) {
        // Failures are logged where they occur
        let _ = self.on_remote_message(topic, payload);
    }

    fn on_connection_lost(&self, cause: &str) {
        Synchronizer::on_connection_lost(self, cause);
    }

    fn on_reconnected(&self) {
        Synchronizer::on_reconnected(self);
    }
}

impl<T: Transport> std::fmt::Debug for Synchronizer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("devices", &self.registry.len())
            .field("observers", &self.observers.observer_count())
            .field("stale", &self.is_stale())
            .field("pending", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}
