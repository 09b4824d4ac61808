// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State synchronization between the device registry and the broker.
//!
//! The [`Synchronizer`] is the single writer of device state. It has two
//! entry points:
//!
//! - [`Synchronizer::on_local_toggle`] / [`Synchronizer::set_state`]: a local
//!   intent. The registry is updated, observers are notified, and the new
//!   state is published. This is the only path that publishes.
//! - [`Synchronizer::on_remote_message`]: a broker delivery. The payload is
//!   decoded and reconciled with the registry. A state equal to the current
//!   one (including the echo of our own publish) is a no-op; a different
//!   state is adopted and observers are notified. Remote changes are never
//!   published back.
//!
//! # Examples
//!
//! ```
//! use homesync_lib::config::reference_home;
//! use homesync_lib::protocol::MemoryTransport;
//! use homesync_lib::sync::Synchronizer;
//!
//! let sync = Synchronizer::from_configs(reference_home(), MemoryTransport::new()).unwrap();
//!
//! let outcome = sync.on_local_toggle("home/room1/lamp").unwrap();
//! assert!(outcome.record().is_on());
//! assert_eq!(sync.transport().publish_count(), 1);
//!
//! // The broker loops our own publish back: nothing happens
//! let echo = sync
//!     .on_remote_message("home/room1/lamp", b"home/room1/lamp: ON")
//!     .unwrap();
//! assert!(!echo.changed());
//! assert_eq!(sync.transport().publish_count(), 1);
//! ```

mod outcome;
mod synchronizer;

pub use outcome::{PublishStatus, RemoteOutcome, ToggleOutcome};
pub use synchronizer::Synchronizer;
