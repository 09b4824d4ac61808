// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `homesync` library.
//!
//! None of these errors is fatal to the process. Each one is recovered at
//! the point where it occurs (logged, the offending message discarded) and
//! returned to the caller so it can decide whether to surface it.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The topic is not present in the device registry.
    #[error("unknown device topic: {0}")]
    UnknownDevice(String),

    /// An inbound payload could not be decoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    /// Publishing or subscribing through the transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A delivery-quality level outside 0-2 was provided.
    #[error("invalid QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    /// A device kind name or topic suffix was not recognized.
    #[error("invalid device kind: {0}")]
    InvalidKind(String),

    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// Two device configurations share the same topic.
    #[error("duplicate device topic: {0}")]
    DuplicateTopic(String),
}

/// Errors raised while decoding an inbound payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload carried no bytes (or only whitespace).
    #[error("payload is empty")]
    Empty,

    /// The payload is not valid UTF-8 text.
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// The state token is not part of the grammar for this device kind.
    #[error("unrecognized token {token:?} for {kind}")]
    UnrecognizedToken {
        /// The device kind the payload was decoded for.
        kind: String,
        /// The offending token.
        token: String,
    },

    /// The trailing `#<revision>` marker is not a valid number.
    #[error("invalid sequence marker: {0}")]
    InvalidSequence(String),

    /// JSON payload parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from a JSON payload.
    #[error("missing field in payload: {0}")]
    MissingField(String),
}

/// Errors related to the publish/subscribe transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// MQTT client request failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The transport is not connected to a broker.
    #[error("transport is not connected")]
    NotConnected,
}

/// Errors reported by observers of state changes.
///
/// An observer failure is isolated: it is logged and collected, the
/// remaining observers still run and the registry is unaffected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserverError {
    /// The observer returned an error.
    #[error("observer {subscription} failed: {message}")]
    Failed {
        /// Raw id of the failing subscription.
        subscription: u64,
        /// Description of the failure.
        message: String,
    },

    /// The observer panicked.
    #[error("observer {subscription} panicked: {message}")]
    Panicked {
        /// Raw id of the failing subscription.
        subscription: u64,
        /// The panic message, when it was a string.
        message: String,
    },
}

impl ObserverError {
    /// Creates an observer failure carrying only a message.
    ///
    /// The subscription id is filled in by the registry when the error is
    /// reported.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            subscription: 0,
            message: message.into(),
        }
    }

    /// Returns the subscription id the error was reported for.
    #[must_use]
    pub fn subscription(&self) -> u64 {
        match self {
            Self::Failed { subscription, .. } | Self::Panicked { subscription, .. } => {
                *subscription
            }
        }
    }

    pub(crate) fn with_subscription(self, id: u64) -> Self {
        match self {
            Self::Failed { message, .. } => Self::Failed {
                subscription: id,
                message,
            },
            Self::Panicked { message, .. } => Self::Panicked {
                subscription: id,
                message,
            },
        }
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
