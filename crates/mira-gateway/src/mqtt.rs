//! MQTT transport: broker-delimited messages, base64 payloads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapter::{AdapterError, GatewayAdapter, PayloadCallback};

/// Topic the gateway publishes swarm-bound payloads to.
pub const UPLINK_TOPIC: &str = "/mira-swarm/uplink";
/// Topic carrying payloads from the swarm back to the gateway.
pub const DOWNLINK_TOPIC: &str = "/mira-swarm/downlink";

/// Broker keep-alive interval.
const KEEP_ALIVE: Duration = Duration::from_secs(30);

// ============================================================================
// Configuration
// ============================================================================

/// MQTT broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Username for authentication (optional).
    pub username: Option<String>,
    /// Password for authentication (optional).
    pub password: Option<String>,
    /// Client ID (derived from the process id if absent).
    pub client_id: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: None,
        }
    }
}

// ============================================================================
// MQTT Adapter
// ============================================================================

/// Broker-backed gateway transport.
///
/// The broker already preserves message boundaries, so no framing layer is
/// involved. Payloads cross the broker base64 encoded; incoming messages
/// that fail to decode are logged and dropped.
pub struct MqttAdapter {
    config: MqttConfig,
    client: Option<Client>,
    worker: Option<JoinHandle<()>>,
    cancel_flag: Arc<AtomicBool>,
}

impl MqttAdapter {
    /// Create an adapter for the given broker. No I/O happens until `init`.
    pub fn new(config: MqttConfig) -> Self {
        MqttAdapter {
            config,
            client: None,
            worker: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configuration this adapter was created with.
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }
}

impl GatewayAdapter for MqttAdapter {
    fn init(&mut self, on_payload: PayloadCallback) -> Result<(), AdapterError> {
        if self.client.is_some() {
            return Err(AdapterError::AlreadyInitialized);
        }
        self.cancel_flag.store(false, Ordering::Relaxed);

        let client_id = self
            .config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("mira-edge-{:x}", std::process::id()));
        let mut options = MqttOptions::new(client_id, &self.config.host, self.config.port);
        options.set_keep_alive(KEEP_ALIVE);
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            options.set_credentials(username, password);
        }

        let (client, connection) = Client::new(options, 100);
        info!(
            "connecting to broker at {}:{}",
            self.config.host, self.config.port
        );

        let worker = spawn_event_loop(
            connection,
            client.clone(),
            self.cancel_flag.clone(),
            on_payload,
        );
        self.client = Some(client);
        self.worker = Some(worker);
        Ok(())
    }

    fn close(&mut self) -> Result<(), AdapterError> {
        self.cancel_flag.store(true, Ordering::Relaxed);
        if let Some(client) = self.client.take() {
            let _ = client.disconnect();
            info!("disconnected from broker");
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        Ok(())
    }

    fn send_data(&mut self, payload: &[u8]) -> Result<(), AdapterError> {
        let client = self.client.as_ref().ok_or(AdapterError::NotInitialized)?;
        client.publish(UPLINK_TOPIC, QoS::AtMostOnce, false, BASE64.encode(payload))?;
        debug!("published payload ({} bytes) to {}", payload.len(), UPLINK_TOPIC);
        Ok(())
    }
}

impl Drop for MqttAdapter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ============================================================================
// Event Loop Thread
// ============================================================================

fn spawn_event_loop(
    mut connection: Connection,
    client: Client,
    cancel_flag: Arc<AtomicBool>,
    mut on_payload: PayloadCallback,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for event in connection.iter() {
            if cancel_flag.load(Ordering::Relaxed) {
                break;
            }
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    // Subscribing on every session acknowledgement keeps the
                    // downlink alive across broker reconnects.
                    debug!("broker session established, subscribing to {}", DOWNLINK_TOPIC);
                    if let Err(e) = client.subscribe(DOWNLINK_TOPIC, QoS::AtMostOnce) {
                        warn!("downlink subscribe failed: {}", e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match BASE64.decode(&publish.payload) {
                        Ok(payload) => {
                            debug!(
                                "received payload ({} bytes) on {}",
                                payload.len(),
                                publish.topic
                            );
                            on_payload(payload);
                        }
                        Err(e) => {
                            warn!("discarding message on {}: {}", publish.topic, e);
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("broker connection error: {}", e);
                    std::thread::sleep(Duration::from_secs(1));
                }
            }
        }
    })
}
