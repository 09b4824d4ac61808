// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the library.
//!
//! # Types
//!
//! - [`PowerState`] - ON/OFF state of a device
//! - [`DeliveryQos`] - Per-device delivery-quality level (0-2)
//! - [`DeviceKind`] - Device category (lamp, entrance, sensors)
//! - [`IndicatorColor`] - Presentation color derived from kind and state
//! - [`ChangeOrigin`] - Source of the most recent state change

mod kind;
mod origin;
mod power;
mod qos;

pub use kind::{DeviceKind, IndicatorColor};
pub use origin::ChangeOrigin;
pub use power::PowerState;
pub use qos::DeliveryQos;
