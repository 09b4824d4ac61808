// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device record and upsert outcome.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DeviceConfig;
use crate::types::{ChangeOrigin, DeliveryQos, DeviceKind, IndicatorColor, PowerState};

use super::DeviceId;

/// Current state of one device, as held by the registry.
///
/// Records handed out by the registry are snapshots: later changes to the
/// device are not reflected in a record already returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    id: DeviceId,
    topic: String,
    display_name: String,
    qos: DeliveryQos,
    kind: DeviceKind,
    state: PowerState,
    last_origin: ChangeOrigin,
    revision: u64,
    updated_at: DateTime<Utc>,
}

impl DeviceRecord {
    /// Creates a record in its initial state (off, revision 0).
    #[must_use]
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            id: DeviceId::generate(),
            topic: config.topic.clone(),
            display_name: config.display_name().to_string(),
            qos: config.qos,
            kind: config.kind(),
            state: PowerState::Off,
            last_origin: ChangeOrigin::Initial,
            revision: 0,
            updated_at: Utc::now(),
        }
    }

    /// Returns the stable device identifier.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Returns the topic addressing the device.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the human-readable device name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the delivery-quality level of the device.
    #[must_use]
    pub fn qos(&self) -> DeliveryQos {
        self.qos
    }

    /// Returns the device kind.
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Returns `true` if the device is on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.is_on()
    }

    /// Returns the origin of the most recent state change.
    #[must_use]
    pub fn last_origin(&self) -> ChangeOrigin {
        self.last_origin
    }

    /// Returns the revision, bumped on every accepted state change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns when the record last changed (or was created).
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the indicator color for the current state.
    ///
    /// Green while on, the kind's idle color while off.
    #[must_use]
    pub fn display_color(&self) -> IndicatorColor {
        if self.is_on() {
            IndicatorColor::Green
        } else {
            self.kind.idle_color()
        }
    }

    /// Applies a state, returning `true` if the record changed.
    ///
    /// The revision advances by one, or jumps to `marker` when a larger
    /// sequence marker was supplied. It never decreases.
    pub(crate) fn apply(
        &mut self,
        state: PowerState,
        origin: ChangeOrigin,
        marker: Option<u64>,
    ) -> bool {
        if self.state == state {
            return false;
        }
        let next = self.revision.saturating_add(1);
        self.revision = marker.map_or(next, |m| m.max(next));
        self.state = state;
        self.last_origin = origin;
        self.updated_at = Utc::now();
        true
    }
}

/// Result of applying a state to a registry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The state differed and was committed; holds the updated record.
    Changed(DeviceRecord),
    /// The state was already current; nothing was modified.
    Unchanged(DeviceRecord),
    /// A remote delivery carried a sequence marker at or below the current
    /// revision and was discarded.
    Stale {
        /// The untouched record.
        record: DeviceRecord,
        /// The marker carried by the discarded delivery.
        marker: u64,
    },
}

impl UpsertOutcome {
    /// Returns `true` if the registry was modified.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }

    /// Returns the record revision after the operation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.record().revision()
    }

    /// Returns the record snapshot after the operation.
    #[must_use]
    pub fn record(&self) -> &DeviceRecord {
        match self {
            Self::Changed(record) | Self::Unchanged(record) | Self::Stale { record, .. } => record,
        }
    }

    /// Consumes the outcome, returning the record snapshot.
    #[must_use]
    pub fn into_record(self) -> DeviceRecord {
        match self {
            Self::Changed(record) | Self::Unchanged(record) | Self::Stale { record, .. } => record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> DeviceRecord {
        DeviceRecord::from_config(&DeviceConfig::new("home/room1/lamp").with_display_name("Lamp 1"))
    }

    #[test]
    fn initial_record() {
        let record = lamp();
        assert_eq!(record.state(), PowerState::Off);
        assert_eq!(record.revision(), 0);
        assert_eq!(record.last_origin(), ChangeOrigin::Initial);
        assert_eq!(record.kind(), DeviceKind::Lamp);
        assert_eq!(record.display_name(), "Lamp 1");
    }

    #[test]
    fn apply_bumps_revision_once() {
        let mut record = lamp();
        assert!(record.apply(PowerState::On, ChangeOrigin::Local, None));
        assert_eq!(record.revision(), 1);
        assert_eq!(record.last_origin(), ChangeOrigin::Local);

        assert!(!record.apply(PowerState::On, ChangeOrigin::Remote, None));
        assert_eq!(record.revision(), 1);
        assert_eq!(record.last_origin(), ChangeOrigin::Local);
    }

    #[test]
    fn apply_adopts_larger_marker() {
        let mut record = lamp();
        assert!(record.apply(PowerState::On, ChangeOrigin::Remote, Some(10)));
        assert_eq!(record.revision(), 10);
    }

    #[test]
    fn apply_never_decreases_revision() {
        let mut record = lamp();
        record.apply(PowerState::On, ChangeOrigin::Local, Some(5));
        record.apply(PowerState::Off, ChangeOrigin::Remote, Some(2));
        assert_eq!(record.revision(), 6);
    }

    #[test]
    fn display_color_follows_state() {
        let mut record = lamp();
        assert_eq!(record.display_color(), IndicatorColor::Yellow);
        record.apply(PowerState::On, ChangeOrigin::Local, None);
        assert_eq!(record.display_color(), IndicatorColor::Green);
    }
}
