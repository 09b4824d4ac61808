// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed token sets accepted per device kind.

use crate::types::{DeviceKind, PowerState};

/// Tokens every kind accepts, paired with the state they denote.
const COMMON: [(&str, PowerState); 6] = [
    ("ON", PowerState::On),
    ("OFF", PowerState::Off),
    ("TRUE", PowerState::On),
    ("FALSE", PowerState::Off),
    ("1", PowerState::On),
    ("0", PowerState::Off),
];

const ENTRANCE: [(&str, PowerState); 2] = [("OPEN", PowerState::On), ("CLOSED", PowerState::Off)];

const SMOKE: [(&str, PowerState); 2] = [("ALARM", PowerState::On), ("CLEAR", PowerState::Off)];

fn kind_specific(kind: DeviceKind) -> &'static [(&'static str, PowerState)] {
    match kind {
        DeviceKind::Entrance => &ENTRANCE,
        DeviceKind::SmokeDetector => &SMOKE,
        DeviceKind::Lamp | DeviceKind::TemperatureSensor | DeviceKind::HumiditySensor => &[],
    }
}

/// Resolves a token from the set every kind accepts, ignoring ASCII case.
pub(crate) fn parse_common(token: &str) -> Option<PowerState> {
    find(&COMMON, token)
}

/// Resolves a state token for `kind`, ignoring ASCII case.
pub(crate) fn parse_token(kind: DeviceKind, token: &str) -> Option<PowerState> {
    parse_common(token).or_else(|| find(kind_specific(kind), token))
}

fn find(table: &[(&str, PowerState)], token: &str) -> Option<PowerState> {
    table
        .iter()
        .find(|(candidate, _)| token.eq_ignore_ascii_case(candidate))
        .map(|&(_, state)| state)
}

/// Returns every token the decoder accepts for `kind`.
#[must_use]
pub fn accepted_tokens(kind: DeviceKind) -> Vec<&'static str> {
    COMMON
        .iter()
        .chain(kind_specific(kind))
        .map(|&(token, _)| token)
        .collect()
}
