// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Payload encoding and decoding.
//!
//! Outbound payloads use the historical `"<topic>: ON"` form. Inbound
//! payloads are decoded with a small grammar so that bare tokens,
//! name-prefixed tokens and JSON objects all interoperate:
//!
//! ```text
//! payload := [prefix ":"] token ["#" revision]
//!          | "{" json-object "}"
//! ```
//!
//! The token is the text after the last `:` and must belong to the closed
//! set for the device kind (see [`accepted_tokens`]). Matching ignores
//! ASCII case and surrounding whitespace, never substrings.
//!
//! # Examples
//!
//! ```
//! use homesync_lib::codec::PayloadCodec;
//! use homesync_lib::config::DeviceConfig;
//! use homesync_lib::registry::DeviceRecord;
//! use homesync_lib::types::PowerState;
//!
//! let codec = PayloadCodec::new();
//! let lamp = DeviceRecord::from_config(&DeviceConfig::new("home/room1/lamp"));
//!
//! let payload = codec.encode(&lamp, PowerState::On);
//! assert_eq!(payload, b"home/room1/lamp: ON");
//!
//! assert_eq!(codec.decode(&lamp, b"OFF").unwrap().state, PowerState::Off);
//! assert_eq!(codec.decode(&lamp, &payload).unwrap().state, PowerState::On);
//! ```

pub(crate) mod grammar;

pub use grammar::accepted_tokens;

use serde::Deserialize;

use crate::error::PayloadError;
use crate::registry::DeviceRecord;
use crate::types::{DeviceKind, PowerState};

/// Options controlling the outbound payload format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
    /// Append ` #<revision>` to outbound payloads.
    ///
    /// Only useful when every publisher on the topics shares one revision
    /// counter; revisions are otherwise local to each process.
    pub sequence_marker: bool,
}

/// A decoded inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPayload {
    /// The state the payload represents.
    pub state: PowerState,
    /// Sequence marker carried by the payload, if any.
    pub marker: Option<u64>,
}

/// Translates device states to and from wire payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCodec {
    options: CodecOptions,
}

impl PayloadCodec {
    /// Creates a codec with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec with the given options.
    #[must_use]
    pub fn with_options(options: CodecOptions) -> Self {
        Self { options }
    }

    /// Returns the codec options.
    #[must_use]
    pub fn options(&self) -> CodecOptions {
        self.options
    }

    /// Encodes `state` for `device`.
    ///
    /// The output only depends on the device topic, the state, and (with
    /// [`CodecOptions::sequence_marker`]) the device revision.
    #[must_use]
    pub fn encode(&self, device: &DeviceRecord, state: PowerState) -> Vec<u8> {
        let mut payload = format!("{}: {}", device.topic(), state.as_str());
        if self.options.sequence_marker {
            payload.push_str(&format!(" #{}", device.revision()));
        }
        payload.into_bytes()
    }

    /// Decodes an inbound payload for `device`.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError` if the payload is empty, not UTF-8, carries a
    /// token outside the device kind's grammar, or has an invalid marker.
    pub fn decode(
        &self,
        device: &DeviceRecord,
        payload: &[u8],
    ) -> Result<DecodedPayload, PayloadError> {
        let text = std::str::from_utf8(payload).map_err(|_| PayloadError::NotUtf8)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(PayloadError::Empty);
        }

        if text.starts_with('{') {
            return decode_json(device.kind(), text);
        }

        let body = text.rsplit_once(':').map_or(text, |(_, body)| body);
        let (token, marker) = match body.rsplit_once('#') {
            Some((token, marker)) => (token, Some(parse_marker(marker)?)),
            None => (body, None),
        };

        let state = parse_state(device.kind(), token.trim())?;
        Ok(DecodedPayload { state, marker })
    }
}

/// JSON payload, e.g. `{"state":"ON","revision":4}` or `{"POWER":"OFF"}`.
#[derive(Debug, Deserialize)]
struct JsonPayload {
    #[serde(default, alias = "POWER", alias = "power", alias = "STATE")]
    state: Option<serde_json::Value>,
    #[serde(default, alias = "seq")]
    revision: Option<u64>,
}

fn decode_json(kind: DeviceKind, text: &str) -> Result<DecodedPayload, PayloadError> {
    let payload: JsonPayload = serde_json::from_str(text)?;
    let value = payload
        .state
        .ok_or_else(|| PayloadError::MissingField("state".to_string()))?;

    let state = match value {
        serde_json::Value::Bool(on) => PowerState::from(on),
        serde_json::Value::String(token) => parse_state(kind, token.trim())?,
        serde_json::Value::Number(n) => parse_state(kind, &n.to_string())?,
        other => parse_state(kind, &other.to_string())?,
    };

    Ok(DecodedPayload {
        state,
        marker: payload.revision,
    })
}

fn parse_state(kind: DeviceKind, token: &str) -> Result<PowerState, PayloadError> {
    grammar::parse_token(kind, token).ok_or_else(|| PayloadError::UnrecognizedToken {
        kind: kind.to_string(),
        token: token.to_string(),
    })
}

fn parse_marker(marker: &str) -> Result<u64, PayloadError> {
    marker
        .trim()
        .parse()
        .map_err(|_| PayloadError::InvalidSequence(marker.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeviceConfig, reference_home};

    fn record(topic: &str) -> DeviceRecord {
        DeviceRecord::from_config(&DeviceConfig::new(topic))
    }

    #[test]
    fn encode_uses_topic_prefix() {
        let codec = PayloadCodec::new();
        let lamp = record("home/kitchen/lamp");
        assert_eq!(codec.encode(&lamp, PowerState::Off), b"home/kitchen/lamp: OFF");
    }

    #[test]
    fn encode_with_sequence_marker() {
        let codec = PayloadCodec::with_options(CodecOptions {
            sequence_marker: true,
        });
        let lamp = record("home/kitchen/lamp");
        assert_eq!(codec.encode(&lamp, PowerState::On), b"home/kitchen/lamp: ON #0");
    }

    #[test]
    fn round_trip_every_reference_device() {
        for options in [
            CodecOptions::default(),
            CodecOptions {
                sequence_marker: true,
            },
        ] {
            let codec = PayloadCodec::with_options(options);
            for config in reference_home() {
                let device = DeviceRecord::from_config(&config);
                for state in [PowerState::On, PowerState::Off] {
                    let decoded = codec.decode(&device, &codec.encode(&device, state)).unwrap();
                    assert_eq!(decoded.state, state, "{}", device.topic());
                }
            }
        }
    }

    #[test]
    fn decode_bare_and_prefixed_tokens() {
        let codec = PayloadCodec::new();
        let lamp = record("home/room1/lamp");
        assert_eq!(codec.decode(&lamp, b"ON").unwrap().state, PowerState::On);
        assert_eq!(
            codec.decode(&lamp, b"Lamp 1: off\n").unwrap().state,
            PowerState::Off
        );
        assert_eq!(
            codec.decode(&lamp, b"home/room1/lamp: ON").unwrap().marker,
            None
        );
    }

    #[test]
    fn decode_marker() {
        let codec = PayloadCodec::new();
        let lamp = record("home/room1/lamp");
        let decoded = codec.decode(&lamp, b"home/room1/lamp: ON #12").unwrap();
        assert_eq!(decoded.state, PowerState::On);
        assert_eq!(decoded.marker, Some(12));
    }

    #[test]
    fn decode_invalid_marker() {
        let codec = PayloadCodec::new();
        let lamp = record("home/room1/lamp");
        let err = codec.decode(&lamp, b"ON #twelve").unwrap_err();
        assert!(matches!(err, PayloadError::InvalidSequence(m) if m == "twelve"));
    }

    #[test]
    fn decode_rejects_substring_matches() {
        let codec = PayloadCodec::new();
        let lamp = record("home/room1/lamp");
        let err = codec.decode(&lamp, b"home/room1/lamp: ONLINE").unwrap_err();
        assert!(matches!(err, PayloadError::UnrecognizedToken { .. }));
    }

    #[test]
    fn decode_kind_specific_tokens() {
        let codec = PayloadCodec::new();
        let entrance = record("home/foyer/entrance");
        let smoke = record("home/kitchen/smoke");
        assert_eq!(
            codec.decode(&entrance, b"Foyer Entrance: OPEN").unwrap().state,
            PowerState::On
        );
        assert_eq!(codec.decode(&smoke, b"alarm").unwrap().state, PowerState::On);
        assert!(codec.decode(&record("home/room1/lamp"), b"alarm").is_err());
    }

    #[test]
    fn decode_empty_and_binary() {
        let codec = PayloadCodec::new();
        let lamp = record("home/room1/lamp");
        assert!(matches!(codec.decode(&lamp, b"  "), Err(PayloadError::Empty)));
        assert!(matches!(
            codec.decode(&lamp, &[0xff, 0xfe]),
            Err(PayloadError::NotUtf8)
        ));
    }

    #[test]
    fn decode_json_payloads() {
        let codec = PayloadCodec::new();
        let lamp = record("home/room1/lamp");

        let decoded = codec.decode(&lamp, br#"{"state":"ON","revision":4}"#).unwrap();
        assert_eq!(decoded.state, PowerState::On);
        assert_eq!(decoded.marker, Some(4));

        let decoded = codec.decode(&lamp, br#"{"POWER":"OFF"}"#).unwrap();
        assert_eq!(decoded.state, PowerState::Off);

        let decoded = codec.decode(&lamp, br#"{"state":true}"#).unwrap();
        assert_eq!(decoded.state, PowerState::On);
    }

    #[test]
    fn decode_json_missing_state() {
        let codec = PayloadCodec::new();
        let lamp = record("home/room1/lamp");
        let err = codec.decode(&lamp, br#"{"Dimmer":40}"#).unwrap_err();
        assert!(matches!(err, PayloadError::MissingField(_)));
    }

    #[test]
    fn decode_malformed_json() {
        let codec = PayloadCodec::new();
        let lamp = record("home/room1/lamp");
        assert!(matches!(
            codec.decode(&lamp, b"{not json"),
            Err(PayloadError::Json(_))
        ));
    }
}
