// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session identity of a registered device.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity assigned to a device record when it is registered.
///
/// A topic can be renamed in configuration between sessions, an id cannot
/// be chosen at all: the registry draws a fresh random one for every
/// record it creates. It serializes as the bare UUID string so records can
/// be exported as JSON.
///
/// ```
/// use homesync_lib::config::DeviceConfig;
/// use homesync_lib::registry::DeviceRegistry;
///
/// let registry = DeviceRegistry::new();
/// let id = registry.insert(&DeviceConfig::new("home/room1/lamp")).unwrap();
/// assert_eq!(registry.get("home/room1/lamp").unwrap().id(), id);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the UUID behind this id.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Leading group only
        write!(f, "DeviceId({:08x})", self.0.as_fields().0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl From<Uuid> for DeviceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
