// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Delivery-quality levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Broker delivery guarantee for a device topic.
///
/// The level is fixed per device for its lifetime. It governs broker-side
/// redelivery only; publishing never waits for an acknowledgment.
///
/// # Examples
///
/// ```
/// use homesync_lib::types::DeliveryQos;
///
/// let qos = DeliveryQos::try_from(1).unwrap();
/// assert_eq!(qos, DeliveryQos::AtLeastOnce);
/// assert_eq!(qos.level(), 1);
/// assert!(DeliveryQos::try_from(3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DeliveryQos {
    /// QoS 0: fire and forget.
    #[default]
    AtMostOnce,
    /// QoS 1: acknowledged delivery, duplicates possible.
    AtLeastOnce,
    /// QoS 2: four-step handshake, no duplicates.
    ExactlyOnce,
}

impl DeliveryQos {
    /// Returns the numeric MQTT level (0-2).
    #[must_use]
    pub const fn level(&self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for DeliveryQos {
    type Error = ValueError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(ValueError::InvalidQos(other)),
        }
    }
}

impl From<DeliveryQos> for u8 {
    fn from(qos: DeliveryQos) -> Self {
        qos.level()
    }
}

#[cfg(feature = "mqtt")]
impl From<DeliveryQos> for rumqttc::QoS {
    fn from(qos: DeliveryQos) -> Self {
        match qos {
            DeliveryQos::AtMostOnce => rumqttc::QoS::AtMostOnce,
            DeliveryQos::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            DeliveryQos::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

impl fmt::Display for DeliveryQos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QoS{}", self.level())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_levels() {
        for level in 0..=2 {
            let qos = DeliveryQos::try_from(level).unwrap();
            assert_eq!(qos.level(), level);
        }
    }

    #[test]
    fn qos_invalid_level() {
        assert_eq!(DeliveryQos::try_from(7), Err(ValueError::InvalidQos(7)));
    }

    #[test]
    fn qos_display() {
        assert_eq!(DeliveryQos::ExactlyOnce.to_string(), "QoS2");
    }

    #[test]
    fn qos_serde_as_number() {
        let json = serde_json::to_string(&DeliveryQos::AtLeastOnce).unwrap();
        assert_eq!(json, "1");
        assert!(serde_json::from_str::<DeliveryQos>("5").is_err());
    }

    #[cfg(feature = "mqtt")]
    #[test]
    fn qos_into_rumqttc() {
        assert_eq!(
            rumqttc::QoS::from(DeliveryQos::AtLeastOnce),
            rumqttc::QoS::AtLeastOnce
        );
    }
}
