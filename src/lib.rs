// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `HomeSync` Lib - Bidirectional device state synchronization over MQTT.
//!
//! This library keeps an in-memory registry of device states (lamps,
//! entrances, environment sensors, smoke detectors) consistent with the
//! state visible on a publish/subscribe broker.
//!
//! # Guarantees
//!
//! - **No feedback loops**: the echo of our own publish is a no-op
//! - **No broadcast storms**: remote changes are never published back
//! - **Per-device delivery quality**: each device publishes and subscribes
//!   at its own QoS level
//! - **Per-topic ordering**: events for one topic are applied one at a time,
//!   unrelated topics never contend
//!
//! # Quick Start
//!
//! ## Without a broker
//!
//! ```
//! use homesync_lib::config::reference_home;
//! use homesync_lib::protocol::MemoryTransport;
//! use homesync_lib::sync::Synchronizer;
//!
//! let sync = Synchronizer::from_configs(reference_home(), MemoryTransport::new()).unwrap();
//!
//! sync.observers().on_state_changed(|record| {
//!     println!("{} is now {}", record.display_name(), record.state());
//! });
//!
//! sync.on_local_toggle("home/kitchen/lamp").unwrap();
//! ```
//!
//! ## MQTT broker
//!
//! ```no_run
//! use std::sync::Arc;
//! use homesync_lib::config::reference_home;
//! use homesync_lib::protocol::MqttTransport;
//! use homesync_lib::sync::Synchronizer;
//!
//! #[tokio::main]
//! async fn main() -> homesync_lib::Result<()> {
//!     let transport = MqttTransport::builder()
//!         .from_url("mqtt://192.168.1.50:1883")?
//!         .build()
//!         .await?;
//!
//!     let sync = Arc::new(Synchronizer::from_configs(reference_home(), transport.clone())?);
//!     transport.attach(&sync);
//!     sync.subscribe_all()?;
//!
//!     sync.observers().on_staleness_changed(|stale| {
//!         println!("broker connection {}", if stale { "lost" } else { "restored" });
//!     });
//!
//!     sync.on_local_toggle("home/foyer/entrance")?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod subscription;
pub mod sync;
pub mod types;

pub use codec::{CodecOptions, DecodedPayload, PayloadCodec};
pub use config::DeviceConfig;
pub use error::{Error, ObserverError, PayloadError, Result, TransportError, ValueError};
#[cfg(feature = "mqtt")]
pub use protocol::{BrokerConfig, MqttTransport, MqttTransportBuilder};
pub use protocol::{MemoryTransport, MessageSink, Transport};
pub use registry::{DeviceId, DeviceRecord, DeviceRegistry, UpsertOutcome};
pub use subscription::{ObserverRegistry, SubscriptionId};
pub use sync::{PublishStatus, RemoteOutcome, Synchronizer, ToggleOutcome};
pub use types::{ChangeOrigin, DeliveryQos, DeviceKind, IndicatorColor, PowerState};
