// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device categories and their presentation colors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Category of a device.
///
/// The kind selects the default indicator color and the set of payload
/// tokens the decoder accepts for the device.
///
/// # Examples
///
/// ```
/// use homesync_lib::types::{DeviceKind, IndicatorColor};
///
/// let kind = DeviceKind::from_topic("home/kitchen/smoke").unwrap();
/// assert_eq!(kind, DeviceKind::SmokeDetector);
/// assert_eq!(kind.idle_color(), IndicatorColor::Orange);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// A switchable lamp.
    Lamp,
    /// A door or gate.
    Entrance,
    /// A temperature sensor.
    TemperatureSensor,
    /// A humidity sensor.
    HumiditySensor,
    /// A smoke detector.
    SmokeDetector,
}

impl DeviceKind {
    /// All device kinds, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Lamp,
        Self::Entrance,
        Self::TemperatureSensor,
        Self::HumiditySensor,
        Self::SmokeDetector,
    ];

    /// Returns the snake-case name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lamp => "lamp",
            Self::Entrance => "entrance",
            Self::TemperatureSensor => "temperature_sensor",
            Self::HumiditySensor => "humidity_sensor",
            Self::SmokeDetector => "smoke_detector",
        }
    }

    /// Returns the last topic segment conventionally used for this kind.
    #[must_use]
    pub const fn topic_suffix(&self) -> &'static str {
        match self {
            Self::Lamp => "lamp",
            Self::Entrance => "entrance",
            Self::TemperatureSensor => "temperature",
            Self::HumiditySensor => "humidity",
            Self::SmokeDetector => "smoke",
        }
    }

    /// Infers the kind from the last segment of a topic.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidKind` if the suffix matches no kind.
    pub fn from_topic(topic: &str) -> Result<Self, ValueError> {
        let suffix = topic.rsplit('/').next().unwrap_or(topic);
        Self::ALL
            .into_iter()
            .find(|kind| suffix.eq_ignore_ascii_case(kind.topic_suffix()))
            .ok_or_else(|| ValueError::InvalidKind(topic.to_string()))
    }

    /// Returns the indicator color used while the device is off.
    #[must_use]
    pub const fn idle_color(&self) -> IndicatorColor {
        match self {
            Self::Lamp => IndicatorColor::Yellow,
            Self::Entrance => IndicatorColor::LightGreen,
            Self::TemperatureSensor => IndicatorColor::Red,
            Self::HumiditySensor => IndicatorColor::SkyBlue,
            Self::SmokeDetector => IndicatorColor::Orange,
        }
    }

    /// Returns `true` for kinds that only report state (never actuated).
    #[must_use]
    pub const fn is_sensor(&self) -> bool {
        matches!(
            self,
            Self::TemperatureSensor | Self::HumiditySensor | Self::SmokeDetector
        )
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| {
                s.eq_ignore_ascii_case(kind.as_str()) || s.eq_ignore_ascii_case(kind.topic_suffix())
            })
            .ok_or_else(|| ValueError::InvalidKind(s.to_string()))
    }
}

/// Named indicator color for presenting a device.
///
/// Rendering is left to the caller; this only carries the color choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorColor {
    /// Idle lamp.
    Yellow,
    /// Idle entrance.
    LightGreen,
    /// Idle temperature sensor.
    Red,
    /// Idle humidity sensor.
    SkyBlue,
    /// Idle smoke detector.
    Orange,
    /// Any device that is on.
    Green,
}

impl IndicatorColor {
    /// Returns the color as a `#rrggbb` hex string.
    #[must_use]
    pub const fn hex(&self) -> &'static str {
        match self {
            Self::Yellow => "#ffff00",
            Self::LightGreen => "#90ee90",
            Self::Red => "#ff0000",
            Self::SkyBlue => "#87ceeb",
            Self::Orange => "#ffa500",
            Self::Green => "#008000",
        }
    }
}
