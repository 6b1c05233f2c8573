//! MQTT side of the bridge: broker session and publish helpers.
//!
//! One [`MqttService`] wraps a rumqttc client plus the poll task that
//! drives its event loop. Broker traffic is forwarded into the bridge
//! inbox as [`BridgeEvent`]s; the service itself holds no bridge state.
//!
//! Topic layout: `{prefix}/{device}/{id}/{attribute}` for devices that
//! come in numbers, `{prefix}/{device}/{attribute}` for the singletons
//! (master light, parking). All state publishes are retained.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::BridgeEvent;
use crate::config::BridgeConfig;

const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Back-off after an event loop error so a dead broker does not spin
/// the task hot.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Topic for a device instance attribute: `devcommax/outlet/05/state`.
pub fn state_topic(prefix: &str, device: &str, id: &str, attribute: &str) -> String {
    format!("{}/{}/{}/{}", prefix, device, id, attribute)
}

/// Topic for a singleton device attribute: `devcommax/master_light/state`.
pub fn singleton_topic(prefix: &str, device: &str, attribute: &str) -> String {
    format!("{}/{}/{}", prefix, device, attribute)
}

/// Retained online/offline topic every discovery config points at.
pub fn availability_topic(prefix: &str) -> String {
    format!("{}/availability", prefix)
}

/// Broker session handle. Cheap to share by reference; the underlying
/// client is already an `Arc` internally.
pub struct MqttService {
    client: AsyncClient,
    poll_task: JoinHandle<()>,
}

impl MqttService {
    /// Start the broker session and the poll task.
    ///
    /// The session is lazy: the actual TCP connect happens inside the
    /// poll loop, and every (re)connect triggers a fresh subscribe to
    /// `{prefix}/#` plus an `MqttConnected` event.
    pub fn connect(config: &BridgeConfig, events: mpsc::Sender<BridgeEvent>) -> Self {
        let client_id = format!("commax_bridge_{:08x}", rand_suffix());
        let mut options = MqttOptions::new(
            client_id,
            config.mqtt_broker_url.clone(),
            config.mqtt_port,
        );
        options.set_credentials(config.mqtt_username.clone(), config.mqtt_password.clone());
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut event_loop) = AsyncClient::new(options, 10);
        let subscriber = client.clone();
        let filter = format!("{}/#", config.mqtt_topic_prefix);

        let poll_task = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("MQTT connected, subscribing to {}", filter);
                        if let Err(e) = subscriber.subscribe(filter.clone(), QoS::AtLeastOnce).await
                        {
                            tracing::error!("MQTT subscribe failed: {}", e);
                        }
                        if events.send(BridgeEvent::MqttConnected).await.is_err() {
                            return;
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = BridgeEvent::MqttMessage {
                            topic: publish.topic.clone(),
                            payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                        };
                        if events.send(message).await.is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("MQTT error: {}", e);
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                }
            }
        });

        Self { client, poll_task }
    }

    /// Publish without retain. Failures are logged, never propagated;
    /// a hiccup on one state topic must not stall frame processing.
    pub async fn publish(&self, topic: &str, payload: &str) {
        self.publish_inner(topic, payload, false).await;
    }

    /// Publish retained.
    pub async fn publish_retained(&self, topic: &str, payload: &str) {
        self.publish_inner(topic, payload, true).await;
    }

    async fn publish_inner(&self, topic: &str, payload: &str, retain: bool) {
        if let Err(e) = self
            .client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
        {
            tracing::error!("Failed to publish {}: {}", topic, e);
        }
    }

    /// Disconnect from the broker and stop the poll task.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!("MQTT disconnect: {}", e);
        }
        self.poll_task.abort();
    }
}

/// Simple random id suffix using system time and process ID.
fn rand_suffix() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let pid = std::process::id() as u64;
    (nanos.wrapping_mul(0x517cc1b727220a95) ^ pid) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_topic_shape() {
        assert_eq!(
            state_topic("devcommax", "outlet", "05", "state"),
            "devcommax/outlet/05/state"
        );
        assert_eq!(
            state_topic("devcommax", "outlet", "05", "standby_power/set"),
            "devcommax/outlet/05/standby_power/set"
        );
    }

    #[test]
    fn test_singleton_topic_has_no_id() {
        assert_eq!(
            singleton_topic("devcommax", "master_light", "state"),
            "devcommax/master_light/state"
        );
    }

    #[test]
    fn test_availability_topic() {
        assert_eq!(availability_topic("devcommax"), "devcommax/availability");
    }
}
