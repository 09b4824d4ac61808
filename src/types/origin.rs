// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Source of a state change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the most recent state change of a device came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// The state is still the one set at registration.
    #[default]
    Initial,
    /// A local control action (toggle or explicit set).
    Local,
    /// A message delivered by the broker.
    Remote,
}

impl ChangeOrigin {
    /// Returns the lowercase name of the origin.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for ChangeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
