// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Results of synchronizer operations.

use crate::error::{Error, ObserverError, TransportError};
use crate::registry::DeviceRecord;

/// What happened to the outbound publish of a local change.
#[derive(Debug)]
pub enum PublishStatus {
    /// The payload was handed to the transport.
    Published,
    /// Nothing was published because the state did not change.
    Skipped,
    /// A newer change to the same device was committed before this one
    /// went out; that change publishes instead.
    Superseded,
    /// The transport refused the payload. The local state stands and the
    /// topic is retried on reconnection.
    Pending(TransportError),
}

/// Result of a local toggle or set.
#[derive(Debug)]
pub struct ToggleOutcome {
    pub(crate) record: DeviceRecord,
    pub(crate) changed: bool,
    pub(crate) publish: PublishStatus,
    pub(crate) observer_failures: Vec<ObserverError>,
}

impl ToggleOutcome {
    /// Returns the record snapshot after the change.
    #[must_use]
    pub fn record(&self) -> &DeviceRecord {
        &self.record
    }

    /// Returns `true` if the registry was modified.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Returns the publish status.
    #[must_use]
    pub fn publish_status(&self) -> &PublishStatus {
        &self.publish
    }

    /// Returns `true` if the payload was handed to the transport.
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self.publish, PublishStatus::Published)
    }

    /// Returns the transport error if the publish failed.
    #[must_use]
    pub fn publish_error(&self) -> Option<&TransportError> {
        match &self.publish {
            PublishStatus::Pending(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the failures of observers notified of this change.
    #[must_use]
    pub fn observer_failures(&self) -> &[ObserverError] {
        &self.observer_failures
    }

    /// Converts into the record, or the transport error if the publish
    /// failed.
    ///
    /// The local state is kept either way.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the publish failed.
    pub fn into_result(self) -> Result<DeviceRecord, Error> {
        match self.publish {
            PublishStatus::Pending(e) => Err(Error::Transport(e)),
            PublishStatus::Published | PublishStatus::Skipped | PublishStatus::Superseded => {
                Ok(self.record)
            }
        }
    }
}

/// Result of an inbound message that matched a registered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The state differed and was adopted; observers were notified.
    Applied {
        /// The record after the change.
        record: DeviceRecord,
        /// Observers that failed while being notified.
        observer_failures: Vec<ObserverError>,
    },
    /// The state was already current, typically our own echo.
    Unchanged(DeviceRecord),
    /// The message carried a sequence marker at or below the current
    /// revision and was discarded.
    Stale {
        /// The untouched record.
        record: DeviceRecord,
        /// The discarded marker.
        marker: u64,
    },
}

impl RemoteOutcome {
    /// Returns `true` if the registry was modified.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Returns the record snapshot after the message was handled.
    #[must_use]
    pub fn record(&self) -> &DeviceRecord {
        match self {
            Self::Applied { record, .. } | Self::Unchanged(record) | Self::Stale { record, .. } => {
                record
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;

    fn lamp() -> DeviceRecord {
        DeviceRecord::from_config(&DeviceConfig::new("home/room1/lamp"))
    }

    #[test]
    fn pending_publish_converts_to_transport_error() {
        let outcome = ToggleOutcome {
            record: lamp(),
            changed: true,
            publish: PublishStatus::Pending(TransportError::NotConnected),
            observer_failures: Vec::new(),
        };
        assert!(!outcome.is_published());
        assert!(matches!(
            outcome.publish_error(),
            Some(TransportError::NotConnected)
        ));
        assert!(matches!(
            outcome.into_result(),
            Err(Error::Transport(TransportError::NotConnected))
        ));
    }

    #[test]
    fn skipped_publish_is_ok() {
        let outcome = ToggleOutcome {
            record: lamp(),
            changed: false,
            publish: PublishStatus::Skipped,
            observer_failures: Vec::new(),
        };
        assert!(outcome.publish_error().is_none());
        assert_eq!(outcome.into_result().unwrap().topic(), "home/room1/lamp");
    }

    #[test]
    fn remote_outcome_changed() {
        let applied = RemoteOutcome::Applied {
            record: lamp(),
            observer_failures: Vec::new(),
        };
        assert!(applied.changed());
        assert!(!RemoteOutcome::Unchanged(lamp()).changed());
        assert!(
            !RemoteOutcome::Stale {
                record: lamp(),
                marker: 0
            }
            .changed()
        );
    }
}
