// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notification fan-out for device state changes.
//!
//! Observers are plain callbacks registered on an [`ObserverRegistry`]. The
//! synchronizer dispatches to them once per accepted state change, whatever
//! its origin, after the registry mutation is committed.
//!
//! ```
//! use homesync_lib::config::reference_home;
//! use homesync_lib::sync::Synchronizer;
//! use homesync_lib::protocol::MemoryTransport;
//!
//! let sync = Synchronizer::from_configs(reference_home(), MemoryTransport::new()).unwrap();
//!
//! let sub_id = sync.observers().on_state_changed(|record| {
//!     println!("{} -> {:?}", record.topic(), record.display_color());
//! });
//!
//! sync.observers().unsubscribe(sub_id);
//! ```

mod callback;

pub use callback::{ObserverRegistry, SubscriptionId};
