// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT transport using mockforge-mqtt.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use homesync_lib::config::reference_home;
use homesync_lib::error::TransportError;
use homesync_lib::protocol::{MqttTransport, Transport};
use homesync_lib::sync::Synchronizer;
use homesync_lib::types::{ChangeOrigin, DeliveryQos, PowerState};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::time::sleep;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to start, bind to port, and be ready to accept connections
    sleep(Duration::from_millis(500)).await;
}

async fn connect(port: u16) -> MqttTransport {
    MqttTransport::builder()
        .host("127.0.0.1")
        .port(port)
        .build()
        .await
        .expect("Failed to connect to mock broker")
}

/// Polls `condition` until it holds or `timeout` elapses.
async fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    condition()
}

/// Transport that counts the publishes it forwards to MQTT.
struct CountingTransport {
    inner: MqttTransport,
    publishes: AtomicUsize,
}

impl Transport for CountingTransport {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: DeliveryQos,
    ) -> Result<(), TransportError> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        self.inner.publish(topic, payload, qos)
    }

    fn subscribe(&self, topic: &str, qos: DeliveryQos) -> Result<(), TransportError> {
        self.inner.subscribe(topic, qos)
    }
}

// ============================================================================
// MqttTransport Connection Tests
// ============================================================================

mod transport_connection {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let transport = connect(port).await;

        assert!(transport.is_connected());
        assert_eq!(transport.config().port(), port);
        assert!(transport.client_id().starts_with("homesync_"));
    }

    #[tokio::test]
    async fn connect_from_url() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let result = MqttTransport::builder()
            .from_url(&format!("tcp://127.0.0.1:{port}"))
            .unwrap()
            .client_id("homesync_floorplan")
            .build()
            .await;

        assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
        assert_eq!(result.unwrap().client_id(), "homesync_floorplan");
    }

    #[tokio::test]
    async fn connect_without_broker_fails() {
        let port = get_test_port();

        let result = MqttTransport::builder()
            .host("127.0.0.1")
            .port(port)
            .connection_timeout(Duration::from_secs(2))
            .build()
            .await;

        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn publish_after_disconnect_is_refused() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let transport = connect(port).await;
        transport
            .publish("home/room1/lamp", b"ON", DeliveryQos::AtMostOnce)
            .unwrap();

        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.publish("home/room1/lamp", b"OFF", DeliveryQos::AtMostOnce),
            Err(TransportError::NotConnected)
        ));
    }
}

// ============================================================================
// Synchronizer over MQTT Tests
// ============================================================================

mod synchronizer_mqtt {
    use super::*;

    #[tokio::test]
    async fn subscribe_all_remembers_every_topic() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let transport = connect(port).await;
        let sync = Arc::new(Synchronizer::from_configs(reference_home(), transport.clone()).unwrap());
        transport.attach(&sync);

        assert_eq!(sync.subscribe_all().unwrap(), 10);
        assert_eq!(transport.subscription_count(), 10);
    }

    #[tokio::test]
    async fn local_toggle_publishes() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let transport = connect(port).await;
        let sync = Arc::new(Synchronizer::from_configs(reference_home(), transport.clone()).unwrap());
        transport.attach(&sync);

        let outcome = sync.on_local_toggle("home/foyer/entrance").unwrap();
        assert!(outcome.is_published());
        assert!(sync.pending_topics().is_empty());
    }

    #[tokio::test]
    async fn toggle_while_disconnected_stays_pending() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let transport = connect(port).await;
        let sync = Arc::new(Synchronizer::from_configs(reference_home(), transport.clone()).unwrap());
        transport.attach(&sync);
        transport.disconnect().await.unwrap();

        let outcome = sync.on_local_toggle("home/kitchen/lamp").unwrap();
        assert!(outcome.record().is_on());
        assert!(matches!(
            outcome.publish_error(),
            Some(TransportError::NotConnected)
        ));
        assert_eq!(sync.pending_topics(), ["home/kitchen/lamp"]);
    }

    #[tokio::test]
    async fn loopback_echo_is_suppressed_and_external_change_applied() {
        const LAMP: &str = "home/room1/lamp";

        let port = get_test_port();
        start_mock_broker(port).await;

        let mqtt = connect(port).await;
        let transport = CountingTransport {
            inner: mqtt.clone(),
            publishes: AtomicUsize::new(0),
        };
        let sync = Arc::new(Synchronizer::from_configs(reference_home(), transport).unwrap());
        mqtt.attach(&sync);

        let notifications = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notifications);
        sync.observers().on_state_changed(move |_| {
            n.fetch_add(1, Ordering::SeqCst);
        });

        sync.subscribe_all().unwrap();
        sleep(Duration::from_millis(300)).await;

        let outcome = sync.on_local_toggle(LAMP).unwrap();
        assert!(outcome.is_published());

        // Give the broker time to loop our publish back
        sleep(Duration::from_millis(500)).await;
        let record = sync.registry().get(LAMP).unwrap();
        assert_eq!(record.revision(), 1);
        assert_eq!(record.last_origin(), ChangeOrigin::Local);
        assert_eq!(notifications.load(Ordering::SeqCst), 1);

        // Another client switches the lamp off
        let other = connect(port).await;
        other.publish(LAMP, b"OFF", DeliveryQos::AtMostOnce).unwrap();

        let applied = wait_for(Duration::from_secs(3), || {
            sync.registry()
                .get(LAMP)
                .is_some_and(|record| record.state() == PowerState::Off)
        })
        .await;
        assert!(applied, "external change never arrived");

        let record = sync.registry().get(LAMP).unwrap();
        assert_eq!(record.last_origin(), ChangeOrigin::Remote);
        assert_eq!(record.revision(), 2);
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
        assert_eq!(sync.transport().publishes.load(Ordering::SeqCst), 1);
    }
}
