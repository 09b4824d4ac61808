// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker transport.
//!
//! Wraps a `rumqttc` client and its event loop. Publishing and subscribing
//! only queue requests on the client (`try_publish`/`try_subscribe`), so they
//! never wait for the broker. Inbound messages and connection changes are
//! forwarded to the attached [`MessageSink`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use homesync_lib::config::reference_home;
//! use homesync_lib::protocol::MqttTransport;
//! use homesync_lib::sync::Synchronizer;
//!
//! # async fn example() -> homesync_lib::Result<()> {
//! let transport = MqttTransport::builder()
//!     .host("localhost")
//!     .port(1883)
//!     .build()
//!     .await?;
//!
//! let sync = Arc::new(Synchronizer::from_configs(reference_home(), transport.clone())?);
//! transport.attach(&sync);
//! sync.subscribe_all()?;
//!
//! sync.on_local_toggle("home/room1/lamp")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet};
use tokio::sync::oneshot;

use crate::error::TransportError;
use crate::protocol::{MessageSink, Transport};
use crate::types::DeliveryQos;

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    client_id: Option<String>,
    keep_alive: Duration,
    connection_timeout: Duration,
    reconnect_delay: Duration,
    retain: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            client_id: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            retain: false,
        }
    }
}

impl BrokerConfig {
    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns whether authentication is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Returns the delay between reconnection attempts.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Returns whether published messages carry the retain flag.
    #[must_use]
    pub fn retain(&self) -> bool {
        self.retain
    }
}

/// A transport over a persistent MQTT broker connection.
///
/// `MqttTransport` is cheaply cloneable (via `Arc`); clones share the
/// connection, the remembered subscriptions and the attached sink.
#[derive(Clone)]
pub struct MqttTransport {
    inner: Arc<MqttTransportInner>,
}

struct MqttTransportInner {
    client: AsyncClient,
    client_id: String,
    config: BrokerConfig,
    connected: AtomicBool,
    shutdown: AtomicBool,
    /// Subscriptions to restore after every ConnAck.
    subscriptions: RwLock<HashMap<String, DeliveryQos>>,
    sink: RwLock<Option<Weak<dyn MessageSink>>>,
}

impl MqttTransport {
    /// Creates a new builder for configuring an MQTT transport.
    #[must_use]
    pub fn builder() -> MqttTransportBuilder {
        MqttTransportBuilder::default()
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the client identifier presented to the broker.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    /// Returns the connection configuration.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// Returns the number of remembered subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }

    /// Attaches the sink that receives inbound messages.
    ///
    /// Only a weak reference is kept, so the sink may own this transport
    /// without creating a cycle. Replaces any previously attached sink.
    pub fn attach<S>(&self, sink: &Arc<S>)
    where
        S: MessageSink + 'static,
    {
        let weak: Weak<S> = Arc::downgrade(sink);
        let weak: Weak<dyn MessageSink> = weak;
        *self.inner.sink.write() = Some(weak);
    }

    /// Detaches the current sink; inbound messages are dropped afterwards.
    pub fn detach(&self) {
        *self.inner.sink.write() = None;
    }

    /// Disconnects from the broker and stops the event loop.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be sent.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.connected.store(false, Ordering::Release);
        self.inner.client.disconnect().await?;
        Ok(())
    }

    fn sink(&self) -> Option<Arc<dyn MessageSink>> {
        self.inner.sink.read().as_ref().and_then(Weak::upgrade)
    }

    fn resubscribe(&self) {
        let subscriptions: Vec<(String, DeliveryQos)> = self
            .inner
            .subscriptions
            .read()
            .iter()
            .map(|(topic, qos)| (topic.clone(), *qos))
            .collect();

        for (topic, qos) in subscriptions {
            if let Err(e) = self.inner.client.try_subscribe(topic.as_str(), qos.into()) {
                tracing::warn!(topic = %topic, error = %e, "Failed to restore subscription");
            }
        }
    }

    fn handle_event(
        &self,
        event: Result<Event, ConnectionError>,
        state: &mut LoopState,
    ) -> LoopFlow {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                self.inner.connected.store(true, Ordering::Release);
                if let Some(tx) = state.connack_tx.take() {
                    let _ = tx.send(());
                }
                self.resubscribe();

                if state.lost {
                    state.lost = false;
                    tracing::info!(host = %self.inner.config.host, "Reconnected to MQTT broker");
                    if let Some(sink) = self.sink() {
                        sink.on_reconnected();
                    }
                }
                LoopFlow::Continue
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
                LoopFlow::Continue
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "MQTT message received"
                );
                match self.sink() {
                    Some(sink) => sink.on_message(&publish.topic, &publish.payload),
                    None => tracing::debug!(topic = %publish.topic, "No sink attached, dropping message"),
                }
                LoopFlow::Continue
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker sent disconnect");
                self.mark_lost("broker sent disconnect", state);
                LoopFlow::Continue
            }
            Ok(_) => LoopFlow::Continue,
            Err(e) => {
                if self.inner.shutdown.load(Ordering::Acquire) {
                    return LoopFlow::Stop;
                }
                // Initial connection failed: let the builder report it
                if state.connack_tx.take().is_some() {
                    tracing::error!(error = %e, "MQTT connection failed");
                    return LoopFlow::Stop;
                }
                self.mark_lost(&e.to_string(), state);
                LoopFlow::Backoff(self.inner.config.reconnect_delay)
            }
        }
    }

    fn mark_lost(&self, cause: &str, state: &mut LoopState) {
        if self.inner.connected.swap(false, Ordering::AcqRel) {
            state.lost = true;
            tracing::warn!(cause = %cause, "MQTT broker connection lost");
            if let Some(sink) = self.sink() {
                sink.on_connection_lost(cause);
            }
        } else {
            tracing::debug!(cause = %cause, "MQTT reconnection attempt failed");
        }
    }
}

impl Transport for MqttTransport {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: DeliveryQos,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        tracing::debug!(topic = %topic, qos = %qos, bytes = payload.len(), "Publishing MQTT message");

        self.inner
            .client
            .try_publish(topic, qos.into(), self.inner.config.retain, payload.to_vec())?;
        Ok(())
    }

    fn subscribe(&self, topic: &str, qos: DeliveryQos) -> Result<(), TransportError> {
        self.inner
            .subscriptions
            .write()
            .insert(topic.to_string(), qos);

        // Remembered subscriptions are sent on the next ConnAck
        if self.is_connected() {
            self.inner.client.try_subscribe(topic, qos.into())?;
            tracing::debug!(topic = %topic, qos = %qos, "Subscribed to topic");
        }
        Ok(())
    }
}

impl std::fmt::Debug for MqttTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttTransport")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("client_id", &self.inner.client_id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Event loop bookkeeping that outlives a single event.
struct LoopState {
    connack_tx: Option<oneshot::Sender<()>>,
    lost: bool,
}

enum LoopFlow {
    Continue,
    Backoff(Duration),
    Stop,
}

/// Drives the `rumqttc` event loop until shutdown or until every transport
/// handle has been dropped.
async fn run_event_loop(
    mut event_loop: EventLoop,
    transport: Weak<MqttTransportInner>,
    connack_tx: oneshot::Sender<()>,
) {
    let mut state = LoopState {
        connack_tx: Some(connack_tx),
        lost: false,
    };

    loop {
        let event = event_loop.poll().await;
        let Some(inner) = transport.upgrade() else {
            tracing::debug!("MQTT transport dropped, stopping event loop");
            break;
        };
        let flow = MqttTransport { inner }.handle_event(event, &mut state);

        match flow {
            LoopFlow::Continue => {}
            LoopFlow::Backoff(delay) => tokio::time::sleep(delay).await,
            LoopFlow::Stop => break,
        }
    }
}

/// Builder for creating an MQTT transport.
///
/// # Examples
///
/// ```no_run
/// use homesync_lib::protocol::MqttTransport;
/// use std::time::Duration;
///
/// # async fn example() -> homesync_lib::Result<()> {
/// let transport = MqttTransport::builder()
///     .from_url("tcp://192.168.1.50:1883")?
///     .credentials("user", "password")
///     .keep_alive(Duration::from_secs(60))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttTransportBuilder {
    config: BrokerConfig,
}

impl MqttTransportBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets host and port from a URL such as `tcp://host:1883`.
    ///
    /// Accepts the `mqtt://` and `tcp://` schemes or no scheme at all.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidAddress` if the port is not a number.
    pub fn from_url(mut self, url: &str) -> Result<Self, TransportError> {
        let (host, port) = parse_broker_url(url)?;
        self.config.host = host;
        self.config.port = port;
        Ok(self)
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the client identifier (default: `homesync_<pid>_<n>`).
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Sets the delay between reconnection attempts (default: 5 seconds).
    #[must_use]
    pub fn reconnect_delay(mut self, duration: Duration) -> Self {
        self.config.reconnect_delay = duration;
        self
    }

    /// Sets the retain flag on published messages (default: false).
    #[must_use]
    pub fn retain(mut self, retain: bool) -> Self {
        self.config.retain = retain;
        self
    }

    /// Builds the transport and connects to the broker.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<MqttTransport, TransportError> {
        if self.config.host.is_empty() {
            return Err(TransportError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let client_id = self.config.client_id.clone().unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("homesync_{}_{}", std::process::id(), counter)
        });

        let mut mqtt_options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 64);

        let transport = MqttTransport {
            inner: Arc::new(MqttTransportInner {
                client,
                client_id,
                config: self.config.clone(),
                connected: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                subscriptions: RwLock::new(HashMap::new()),
                sink: RwLock::new(None),
            }),
        };

        let (connack_tx, connack_rx) = oneshot::channel();
        tokio::spawn(run_event_loop(
            event_loop,
            Arc::downgrade(&transport.inner),
            connack_tx,
        ));

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    client_id = %transport.client_id(),
                    "Connected to MQTT broker"
                );
                Ok(transport)
            }
            Ok(Err(_)) => Err(TransportError::ConnectionFailed(
                "MQTT event loop terminated before connecting".to_string(),
            )),
            Err(_) => {
                transport.inner.shutdown.store(true, Ordering::Release);
                Err(TransportError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )))
            }
        }
    }
}

fn parse_broker_url(url: &str) -> Result<(String, u16), TransportError> {
    let url = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port) = if let Some((h, p)) = url.rsplit_once(':') {
        let port = p
            .parse()
            .map_err(|_| TransportError::InvalidAddress(format!("Invalid port: {p}")))?;
        (h.to_string(), port)
    } else {
        (url.to_string(), 1883)
    };

    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default_values() {
        let builder = MqttTransportBuilder::default();
        assert_eq!(builder.config.port, 1883);
        assert!(builder.config.host.is_empty());
        assert!(builder.config.credentials.is_none());
        assert_eq!(builder.config.keep_alive, Duration::from_secs(30));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(10));
        assert_eq!(builder.config.reconnect_delay, Duration::from_secs(5));
        assert!(!builder.config.retain);
    }

    #[test]
    fn builder_chain() {
        let builder = MqttTransportBuilder::default()
            .host("192.168.1.50")
            .port(8883)
            .credentials("admin", "secret")
            .client_id("floorplan")
            .keep_alive(Duration::from_secs(45))
            .connection_timeout(Duration::from_secs(15))
            .reconnect_delay(Duration::from_secs(1))
            .retain(true);

        assert_eq!(builder.config.host(), "192.168.1.50");
        assert_eq!(builder.config.port(), 8883);
        assert!(builder.config.has_credentials());
        assert_eq!(builder.config.client_id.as_deref(), Some("floorplan"));
        assert_eq!(builder.config.reconnect_delay(), Duration::from_secs(1));
        assert!(builder.config.retain());
    }

    #[test]
    fn builder_from_url() {
        let builder = MqttTransportBuilder::default()
            .from_url("tcp://localhost:1884")
            .unwrap();
        assert_eq!(builder.config.host(), "localhost");
        assert_eq!(builder.config.port(), 1884);
    }

    #[test]
    fn parse_url_default_port() {
        let (host, port) = parse_broker_url("192.168.1.50").unwrap();
        assert_eq!(host, "192.168.1.50");
        assert_eq!(port, 1883);
    }

    #[test]
    fn parse_url_mqtt_scheme() {
        let (host, port) = parse_broker_url("mqtt://broker.local:8883").unwrap();
        assert_eq!(host, "broker.local");
        assert_eq!(port, 8883);
    }

    #[test]
    fn parse_url_invalid_port() {
        let err = parse_broker_url("tcp://broker:abc").unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn builder_missing_host_fails() {
        let result = MqttTransportBuilder::default().build().await;
        assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }
}
