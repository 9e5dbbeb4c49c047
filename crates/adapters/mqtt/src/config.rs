//! MQTT connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use rumqttc::{MqttOptions, Transport};
use serde::Deserialize;

use crate::error::MqttError;

/// Connection settings for one broker session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier. Each session needs its own; when unset the
    /// source and the sink pick distinct defaults.
    pub client_id: Option<String>,
    /// Username, if the broker requires authentication.
    pub username: Option<String>,
    /// Password, if the broker requires authentication.
    pub password: Option<String>,
    /// Connect over TLS.
    pub tls: bool,
    /// PEM file with the CA used to verify the broker. Without it, the
    /// platform's root certificates are used.
    pub ca_file: Option<PathBuf>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Capacity of the client's request channel.
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: None,
            username: None,
            password: None,
            tls: false,
            ca_file: None,
            keep_alive_secs: 30,
            request_capacity: 16,
        }
    }
}

impl MqttConfig {
    /// The configured client id, or `fallback`.
    #[must_use]
    pub fn client_id_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.client_id.as_deref().unwrap_or(fallback)
    }

    /// Build client options, reading the CA file if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Tls`] if the CA file cannot be read.
    pub fn options(&self, default_client_id: &str) -> Result<MqttOptions, MqttError> {
        let mut options = MqttOptions::new(
            self.client_id_or(default_client_id),
            &self.broker_host,
            self.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs)));

        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }

        if self.tls {
            let transport = match &self.ca_file {
                Some(path) => {
                    let ca = std::fs::read(path).map_err(|source| MqttError::Tls {
                        path: path.clone(),
                        source,
                    })?;
                    Transport::tls(ca, None, None)
                }
                None => Transport::tls_with_default_config(),
            };
            options.set_transport(transport);
        }

        Ok(options)
    }

    /// `host:port`, for logging.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.broker_host, self.broker_port)
    }
}
