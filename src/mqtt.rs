//! MQTT output for daemon mode: publishes each poll outcome to a broker.

use airunit_lib::{poller::Poller, transport::Transport};
use anyhow::{Context, Result};
use log::*;
use paho_mqtt as mqtt;
use serde::Deserialize;
use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker URL, e.g. "tcp://localhost:1883".
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Optional identifier inserted into the topic path, useful when
    /// multiple units publish to the same broker.
    pub entity_id: Option<String>,
    /// Quality of service code to use
    #[serde(default = "default_qos")]
    qos: u8,
    #[serde(default = "default_keep_alive", with = "humantime_serde")]
    pub keep_alive: Duration,
}

fn default_qos() -> u8 {
    0
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(20)
}

impl MqttConfig {
    pub const DEFAULT_CONFIG_FILE: &'static str = "mqtt.yaml";

    pub fn qos(&self) -> i32 {
        assert!((0..=2).contains(&self.qos));
        self.qos as i32
    }

    pub fn load(path: &str) -> Result<Self> {
        debug!("Loading MQTT config file from {path:?}");
        let config_file =
            File::open(path).with_context(|| format!("Cannot open MQTT config file {path:?}"))?;
        let config: MqttConfig = serde_yaml::from_reader(&config_file)
            .with_context(|| format!("Cannot parse MQTT config file {path:?}"))?;
        Ok(config)
    }
}

const MQTT_APPENDIX_AVAILABILITY: &str = "availability";

fn get_topic(entity_id: Option<&str>, appendix: &str) -> String {
    if let Some(entity_id) = entity_id {
        format!("airunit/{entity_id}/{appendix}")
    } else {
        format!("airunit/{appendix}")
    }
}

fn go_online(client: &mut mqtt::Client, config: &MqttConfig) -> Result<()> {
    let msg = mqtt::Message::new(
        get_topic(config.entity_id.as_deref(), MQTT_APPENDIX_AVAILABILITY),
        "online",
        config.qos(),
    );
    client
        .publish(msg)
        .with_context(|| "Cannot publish mqtt message")
}

fn go_offline(client: &mqtt::Client, config: &MqttConfig) -> Result<()> {
    let msg = mqtt::Message::new_retained(
        get_topic(config.entity_id.as_deref(), MQTT_APPENDIX_AVAILABILITY),
        "offline",
        config.qos(),
    );
    client
        .publish(msg)
        .with_context(|| "Cannot publish mqtt message")
}

fn publish_cycle<T: Transport>(
    client: &mut mqtt::Client,
    config: &MqttConfig,
    poller: &mut Poller<T>,
) -> Result<()> {
    for outcome in poller.poll_cycle() {
        match outcome {
            Ok(observation) => {
                let topic = get_topic(config.entity_id.as_deref(), observation.reading.name());
                let msg = mqtt::Message::new(topic, observation.value.to_string(), config.qos());
                client
                    .publish(msg)
                    .with_context(|| "Cannot publish mqtt message")?;
            }
            Err(diagnostic) => {
                // Already logged by the poller; expose the failure kind on
                // a per-reading error topic.
                let topic = format!(
                    "{}/error",
                    get_topic(config.entity_id.as_deref(), diagnostic.reading.name())
                );
                let msg = mqtt::Message::new(topic, diagnostic.kind.to_string(), config.qos());
                client
                    .publish(msg)
                    .with_context(|| "Cannot publish mqtt message")?;
            }
        }
    }
    Ok(())
}

/// Runs the poll loop until `running` is cleared, publishing every
/// per-reading outcome to the configured broker.
pub fn run_daemon<T: Transport>(
    poller: &mut Poller<T>,
    poll_interval: &Duration,
    config_file: &str,
    running: &Arc<AtomicBool>,
) -> Result<()> {
    let config = MqttConfig::load(config_file)?;
    trace!("MQTT config: {config:?}");

    let mut client =
        mqtt::Client::new(config.url.clone()).with_context(|| "Error creating mqtt client")?;

    // Use 5sec timeouts for sync broker calls.
    client.set_timeout(Duration::from_secs(5));

    let mut conn_builder = mqtt::ConnectOptionsBuilder::new();
    let mut conn_builder = conn_builder
        .keep_alive_interval(config.keep_alive)
        .clean_session(true);

    if let Some(user_name) = &config.username {
        conn_builder = conn_builder.user_name(user_name)
    }
    if let Some(password) = &config.password {
        conn_builder = conn_builder.password(password)
    }
    let conn_ops = conn_builder.finalize();

    client
        .connect(conn_ops)
        .with_context(|| "Mqtt client unable to connect")?;

    go_online(&mut client, &config)?;

    while running.load(Ordering::SeqCst) {
        publish_cycle(&mut client, &config, poller)?;

        if !running.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(*poll_interval);
    }

    go_offline(&client, &config)?;
    client
        .disconnect(None)
        .with_context(|| "Error disconnect mqtt client")?;
    Ok(())
}
