// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static configuration of a single device.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::types::{DeliveryQos, DeviceKind};

/// Configuration for a synchronized device.
///
/// The library does not read configuration files itself; callers
/// materialize a list of `DeviceConfig` (by hand, or by deserializing it
/// with `serde`) and hand it to the registry.
///
/// # Examples
///
/// ```
/// use homesync_lib::config::DeviceConfig;
/// use homesync_lib::types::{DeliveryQos, DeviceKind};
///
/// let config = DeviceConfig::new("home/foyer/entrance")
///     .with_qos(DeliveryQos::AtLeastOnce)
///     .with_display_name("Foyer Entrance");
///
/// assert_eq!(config.kind(), DeviceKind::Entrance);
/// assert_eq!(config.display_name(), "Foyer Entrance");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// The pub/sub topic addressing the device.
    pub topic: String,
    /// Delivery-quality level used for both publish and subscribe.
    #[serde(default)]
    pub qos: DeliveryQos,
    /// Device category; inferred from the topic suffix when absent.
    #[serde(default)]
    pub kind: Option<DeviceKind>,
    /// Human-readable name; the topic is used when absent.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl DeviceConfig {
    /// Creates a configuration for the given topic with QoS 0.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            qos: DeliveryQos::default(),
            kind: None,
            display_name: None,
        }
    }

    /// Sets the delivery-quality level.
    #[must_use]
    pub fn with_qos(mut self, qos: DeliveryQos) -> Self {
        self.qos = qos;
        self
    }

    /// Sets the device kind explicitly.
    #[must_use]
    pub fn with_kind(mut self, kind: DeviceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets a human-readable name for the device.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Returns the device kind.
    ///
    /// Falls back to the topic suffix and then to [`DeviceKind::Lamp`].
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        if let Some(kind) = self.kind {
            return kind;
        }
        DeviceKind::from_topic(&self.topic).unwrap_or_else(|_| {
            tracing::debug!(topic = %self.topic, "No kind for topic suffix, assuming lamp");
            DeviceKind::Lamp
        })
    }

    /// Returns the display name, or the topic if none was set.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.topic)
    }
}

impl TryFrom<(&str, u8, DeviceKind, &str)> for DeviceConfig {
    type Error = ValueError;

    /// Builds a configuration from a `(topic, qos, kind, display_name)` tuple.
    fn try_from(
        (topic, qos, kind, name): (&str, u8, DeviceKind, &str),
    ) -> Result<Self, Self::Error> {
        Ok(Self::new(topic)
            .with_qos(DeliveryQos::try_from(qos)?)
            .with_kind(kind)
            .with_display_name(name))
    }
}
