// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device configuration input.
//!
//! The device set is supplied at startup as an ordered list of
//! [`DeviceConfig`]. [`reference_home`] returns the ten-device floor plan
//! used by the demo installation.

mod device_config;

pub use device_config::DeviceConfig;

pub use crate::codec::CodecOptions;
#[cfg(feature = "mqtt")]
pub use crate::protocol::BrokerConfig;

use crate::types::{DeliveryQos, DeviceKind};

/// Returns the reference home floor plan.
///
/// Six lamps, the foyer entrance, two environment sensors and the kitchen
/// smoke detector. The entrance and the smoke detector use at-least-once
/// delivery, everything else at-most-once.
#[must_use]
pub fn reference_home() -> Vec<DeviceConfig> {
    const DEVICES: [(&str, DeliveryQos, DeviceKind, &str); 10] = [
        ("home/room1/lamp", DeliveryQos::AtMostOnce, DeviceKind::Lamp, "Lamp 1"),
        ("home/room2/lamp", DeliveryQos::AtMostOnce, DeviceKind::Lamp, "Lamp 2"),
        ("home/kitchen/lamp", DeliveryQos::AtMostOnce, DeviceKind::Lamp, "Kitchen Lamp"),
        (
            "home/livingroom/lamp",
            DeliveryQos::AtMostOnce,
            DeviceKind::Lamp,
            "Living Room Lamp",
        ),
        ("home/foyer/lamp", DeliveryQos::AtMostOnce, DeviceKind::Lamp, "Foyer Lamp"),
        (
            "home/bathroom/lamp",
            DeliveryQos::AtMostOnce,
            DeviceKind::Lamp,
            "Bathroom Lamp",
        ),
        (
            "home/foyer/entrance",
            DeliveryQos::AtLeastOnce,
            DeviceKind::Entrance,
            "Foyer Entrance",
        ),
        (
            "home/bathroom/humidity",
            DeliveryQos::AtMostOnce,
            DeviceKind::HumiditySensor,
            "Bathroom Humidity Sensor",
        ),
        (
            "home/livingroom/temperature",
            DeliveryQos::AtMostOnce,
            DeviceKind::TemperatureSensor,
            "Living Room Temperature Sensor",
        ),
        (
            "home/kitchen/smoke",
            DeliveryQos::AtLeastOnce,
            DeviceKind::SmokeDetector,
            "Kitchen Smoke Detector",
        ),
    ];

    DEVICES
        .iter()
        .map(|&(topic, qos, kind, name)| {
            DeviceConfig::new(topic)
                .with_qos(qos)
                .with_kind(kind)
                .with_display_name(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_home_has_unique_topics() {
        let devices = reference_home();
        assert_eq!(devices.len(), 10);

        let mut topics: Vec<_> = devices.iter().map(|d| d.topic.as_str()).collect();
        topics.sort_unstable();
        topics.dedup();
        assert_eq!(topics.len(), 10);
    }

    #[test]
    fn reference_home_kinds_match_suffixes() {
        for device in reference_home() {
            assert_eq!(
                DeviceKind::from_topic(&device.topic).ok(),
                device.kind,
                "{}",
                device.topic
            );
        }
    }

    #[test]
    fn reference_home_qos() {
        let devices = reference_home();
        let at_least_once: Vec<_> = devices
            .iter()
            .filter(|d| d.qos == DeliveryQos::AtLeastOnce)
            .map(|d| d.topic.as_str())
            .collect();
        assert_eq!(at_least_once, ["home/foyer/entrance", "home/kitchen/smoke"]);
    }
}
