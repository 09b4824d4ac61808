// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport capability consumed by the synchronizer.
//!
//! The synchronizer only needs to publish a payload on a topic, subscribe
//! to a topic, and be told when a message arrives or the connection drops.
//! Those two directions are the [`Transport`] and [`MessageSink`] traits.
//!
//! # Implementations
//!
//! - [`MqttTransport`]: MQTT broker connection built on `rumqttc` (feature `mqtt`)
//! - [`MemoryTransport`]: in-process transport that records every request

mod memory;
#[cfg(feature = "mqtt")]
mod mqtt_transport;

pub use memory::{MemoryTransport, PublishedMessage};
#[cfg(feature = "mqtt")]
pub use mqtt_transport::{BrokerConfig, MqttTransport, MqttTransportBuilder};

use std::sync::Arc;

use crate::error::TransportError;
use crate::types::DeliveryQos;

/// Outbound side of a publish/subscribe client.
///
/// Both operations are fire-and-forget: they hand the request to the client
/// and return without waiting for a broker acknowledgment, whatever the
/// delivery-quality level.
///
/// `publish` is called while the device record is locked. It must not block
/// and must not deliver messages to a [`MessageSink`] from the calling
/// thread.
pub trait Transport: Send + Sync {
    /// Publishes `payload` on `topic` with the given delivery quality.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request could not be queued.
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: DeliveryQos,
    ) -> Result<(), TransportError>;

    /// Subscribes to `topic` with the given delivery quality.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request could not be queued.
    fn subscribe(&self, topic: &str, qos: DeliveryQos) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: DeliveryQos,
    ) -> Result<(), TransportError> {
        (**self).publish(topic, payload, qos)
    }

    fn subscribe(&self, topic: &str, qos: DeliveryQos) -> Result<(), TransportError> {
        (**self).subscribe(topic, qos)
    }
}

/// Inbound side of a publish/subscribe client.
///
/// Implementations are invoked on the transport's own delivery task, so
/// they must not block for long.
pub trait MessageSink: Send + Sync {
    /// Called for every message matching an active subscription.
    fn on_message(&self, topic: &str, payload: &[u8]);

    /// Called when the broker connection is lost.
    fn on_connection_lost(&self, cause: &str);

    /// Called when the broker connection is re-established after a loss.
    fn on_reconnected(&self) {}
}
