//! MQTT client for remote stage control
//!
//! Connects to an MQTT broker and subscribes to a topic. JSON payloads
//! carrying environment/filter/lighting/effect fields are forwarded to the
//! main loop; anything else is ignored.

use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const DEFAULT_PORT: u16 = 1883;
const DEFAULT_TOPIC: &str = "pixelstage";

/// A control payload. Every field is optional; set fields are applied in
/// the order environment, filters, lighting, effect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlMessage {
    pub environment: Option<String>,
    pub filters: Option<String>,
    pub lighting: Option<LightingField>,
    pub effect: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightingField {
    pub color: String,
    pub intensity: f32,
}

/// MQTT client that receives control messages in a background thread
pub struct MqttClient {
    receiver: Receiver<ControlMessage>,
    _thread: thread::JoinHandle<()>,
}

impl MqttClient {
    /// Create a new MQTT client and connect to the broker.
    /// Fails immediately if connection cannot be established.
    pub fn new(host: &str, topic: &str) -> Result<Self, String> {
        let topic = if topic.is_empty() { DEFAULT_TOPIC } else { topic };

        let mut options = MqttOptions::new("pixelstage", host, DEFAULT_PORT);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut connection) = Client::new(options, 10);

        client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| format!("Failed to subscribe to topic '{}': {}", topic, e))?;

        // Test connection by polling once - fail fast if broker unreachable
        match connection.iter().next() {
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                return Err(format!(
                    "Failed to connect to MQTT broker at {}:{} - {}",
                    host, DEFAULT_PORT, e
                ));
            }
            None => {
                return Err(format!(
                    "Failed to connect to MQTT broker at {}:{} - connection closed",
                    host, DEFAULT_PORT
                ));
            }
        }

        let (sender, receiver) = mpsc::channel();
        let topic_owned = topic.to_string();

        let handle = thread::spawn(move || {
            Self::message_loop(connection, sender, &topic_owned);
        });

        eprintln!(
            "MQTT: Connected to {}:{}, subscribed to '{}'",
            host, DEFAULT_PORT, topic
        );

        Ok(Self {
            receiver,
            _thread: handle,
        })
    }

    fn message_loop(
        mut connection: rumqttc::Connection,
        sender: Sender<ControlMessage>,
        topic: &str,
    ) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if publish.topic != topic {
                        continue;
                    }
                    let Ok(text) = String::from_utf8(publish.payload.to_vec()) else {
                        continue;
                    };
                    // Non-JSON payloads are ignored rather than erroring
                    if let Ok(msg) = serde_json::from_str::<ControlMessage>(text.trim()) {
                        if sender.send(msg).is_err() {
                            // Main thread gone, exit
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("MQTT error: {}", e);
                    // Keep polling - connection may recover
                }
            }
        }
    }

    /// Poll for pending control messages (non-blocking)
    pub fn poll(&self) -> Vec<ControlMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Default MQTT topic
    pub fn default_topic() -> &'static str {
        DEFAULT_TOPIC
    }
}
