// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::protocol::Transport;
use crate::types::DeliveryQos;

/// A message handed to [`MemoryTransport::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Destination topic.
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Requested delivery quality.
    pub qos: DeliveryQos,
}

#[derive(Debug, Default)]
struct MemoryInner {
    published: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<(String, DeliveryQos)>>,
    offline: AtomicBool,
}

/// Transport that keeps every request in memory.
///
/// Useful to run the synchronizer without a broker, and to assert on what
/// would have been sent. Clones share the same record.
///
/// # Examples
///
/// ```
/// use homesync_lib::protocol::{MemoryTransport, Transport};
/// use homesync_lib::types::DeliveryQos;
///
/// let transport = MemoryTransport::new();
/// transport.publish("home/room1/lamp", b"ON", DeliveryQos::AtMostOnce).unwrap();
/// assert_eq!(transport.publish_count(), 1);
///
/// transport.set_offline(true);
/// assert!(transport.publish("home/room1/lamp", b"OFF", DeliveryQos::AtMostOnce).is_err());
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    inner: Arc<MemoryInner>,
}

impl MemoryTransport {
    /// Creates an empty, online transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent request fail with `TransportError::NotConnected`.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::Release);
    }

    /// Returns `true` while requests are being refused.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.inner.offline.load(Ordering::Acquire)
    }

    /// Returns a copy of every accepted publish, oldest first.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.inner.published.lock().clone()
    }

    /// Returns the number of accepted publishes.
    #[must_use]
    pub fn publish_count(&self) -> usize {
        self.inner.published.lock().len()
    }

    /// Removes and returns every accepted publish.
    pub fn take_published(&self) -> Vec<PublishedMessage> {
        std::mem::take(&mut *self.inner.published.lock())
    }

    /// Returns every accepted subscription, oldest first.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<(String, DeliveryQos)> {
        self.inner.subscriptions.lock().clone()
    }
}

impl Transport for MemoryTransport {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: DeliveryQos,
    ) -> Result<(), TransportError> {
        if self.is_offline() {
            return Err(TransportError::NotConnected);
        }
        self.inner.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
        });
        Ok(())
    }

    fn subscribe(&self, topic: &str, qos: DeliveryQos) -> Result<(), TransportError> {
        if self.is_offline() {
            return Err(TransportError::NotConnected);
        }
        self.inner
            .subscriptions
            .lock()
            .push((topic.to_string(), qos));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_publishes_in_order() {
        let transport = MemoryTransport::new();
        transport
            .publish("a", b"1", DeliveryQos::AtMostOnce)
            .unwrap();
        transport
            .publish("b", b"2", DeliveryQos::ExactlyOnce)
            .unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].topic, "a");
        assert_eq!(published[1].qos, DeliveryQos::ExactlyOnce);
    }

    #[test]
    fn take_published_drains() {
        let transport = MemoryTransport::new();
        transport
            .publish("a", b"1", DeliveryQos::AtMostOnce)
            .unwrap();
        assert_eq!(transport.take_published().len(), 1);
        assert_eq!(transport.publish_count(), 0);
    }

    #[test]
    fn offline_refuses_requests() {
        let transport = MemoryTransport::new();
        transport.set_offline(true);
        assert!(matches!(
            transport.subscribe("a", DeliveryQos::AtLeastOnce),
            Err(TransportError::NotConnected)
        ));
        assert!(transport.subscriptions().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let transport = MemoryTransport::new();
        let clone = transport.clone();
        clone
            .subscribe("a", DeliveryQos::AtLeastOnce)
            .unwrap();
        assert_eq!(
            transport.subscriptions(),
            [("a".to_string(), DeliveryQos::AtLeastOnce)]
        );
    }
}
