// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary state of a device.

use std::fmt;
use std::ops::Not;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::grammar;
use crate::error::ValueError;

/// The canonical ON/OFF state of a device.
///
/// Actuators (lamps, entrances) and binary sensors share this state type.
///
/// # Examples
///
/// ```
/// use homesync_lib::types::PowerState;
///
/// assert_eq!(PowerState::On.as_str(), "ON");
/// assert_eq!(!PowerState::On, PowerState::Off);
/// assert!(bool::from(PowerState::On));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    /// Device is off (or the sensor is idle).
    #[default]
    Off,
    /// Device is on (or the sensor is triggered).
    On,
}

impl PowerState {
    /// Returns the wire token for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Returns `true` for [`PowerState::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    /// Returns the opposite state.
    #[must_use]
    pub const fn toggled(&self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }
}

impl Not for PowerState {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.toggled()
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    /// Accepts the tokens every device kind understands on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        grammar::parse_common(s.trim())
            .ok_or_else(|| ValueError::InvalidPowerState(s.to_string()))
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<PowerState> for bool {
    fn from(state: PowerState) -> Self {
        state.is_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_state_as_str() {
        assert_eq!(PowerState::Off.as_str(), "OFF");
        assert_eq!(PowerState::On.as_str(), "ON");
    }

    #[test]
    fn power_state_from_str() {
        assert_eq!("ON".parse::<PowerState>().unwrap(), PowerState::On);
        assert_eq!("off".parse::<PowerState>().unwrap(), PowerState::Off);
        assert_eq!("1".parse::<PowerState>().unwrap(), PowerState::On);
        assert_eq!(" false ".parse::<PowerState>().unwrap(), PowerState::Off);
    }

    #[test]
    fn power_state_parses_every_wire_token() {
        for token in crate::codec::accepted_tokens(crate::types::DeviceKind::Lamp) {
            assert!(token.parse::<PowerState>().is_ok(), "{token} rejected");
            assert!(
                token.to_lowercase().parse::<PowerState>().is_ok(),
                "{token} rejected in lower case"
            );
        }
        // Kind-specific words are not plain power states
        assert!("OPEN".parse::<PowerState>().is_err());
    }

    #[test]
    fn power_state_from_str_invalid() {
        let result = "toggle".parse::<PowerState>();
        assert!(matches!(
            result.unwrap_err(),
            ValueError::InvalidPowerState(_)
        ));
    }

    #[test]
    fn power_state_toggle() {
        assert_eq!(PowerState::Off.toggled(), PowerState::On);
        assert_eq!(!PowerState::On, PowerState::Off);
    }

    #[test]
    fn power_state_bool_conversions() {
        assert_eq!(PowerState::from(true), PowerState::On);
        assert_eq!(PowerState::from(false), PowerState::Off);
        assert!(!bool::from(PowerState::default()));
    }

    #[test]
    fn power_state_serde() {
        let json = serde_json::to_string(&PowerState::On).unwrap();
        assert_eq!(json, "\"ON\"");
        let parsed: PowerState = serde_json::from_str("\"OFF\"").unwrap();
        assert_eq!(parsed, PowerState::Off);
    }
}
