//! Broker connection settings shared by producers and consumers.
//!
//! The pipeline never originates credentials itself: they arrive from the
//! outside (CLI flags, environment) and are applied verbatim to the rdkafka
//! client configuration.

use rdkafka::config::{ClientConfig, RDKafkaLogLevel};
use std::fmt;

use crate::error::{Error, Result};

/// SASL mechanism used when credentials are supplied.
pub const DEFAULT_SASL_MECHANISM: &str = "PLAIN";

/// Where the brokers are and how to authenticate against them.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Kafka brokers (host:port)
    pub brokers: Vec<String>,
    /// Client identifier reported to the brokers
    pub client_id: String,
    /// Encryption and authentication
    pub security: SecurityConfig,
    /// Raise librdkafka's own logging to debug level
    pub verbose: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            client_id: "kafka-avro-pipeline".to_string(),
            security: SecurityConfig::default(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Encrypt the connection with TLS
    pub tls: bool,
    /// Verify the broker certificate chain; only meaningful with `tls`
    pub verify_certificates: bool,
    /// SASL credentials; `None` disables SASL
    pub sasl: Option<SaslCredentials>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            tls: false,
            verify_certificates: true,
            sasl: None,
        }
    }
}

impl SecurityConfig {
    /// Value for librdkafka's `security.protocol`.
    pub fn protocol(&self) -> &'static str {
        match (self.tls, self.sasl.is_some()) {
            (true, true) => "sasl_ssl",
            (true, false) => "ssl",
            (false, true) => "sasl_plaintext",
            (false, false) => "plaintext",
        }
    }
}

#[derive(Clone)]
pub struct SaslCredentials {
    pub mechanism: String,
    pub username: String,
    pub password: String,
}

impl SaslCredentials {
    pub fn plain(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mechanism: DEFAULT_SASL_MECHANISM.to_string(),
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs and panic messages.
impl fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("mechanism", &self.mechanism)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectionConfig {
    /// Parse a comma-separated broker list, ignoring blanks.
    pub fn parse_brokers(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.brokers.is_empty() {
            return Err(Error::MissingSetting("brokers".to_string()));
        }
        if let Some(sasl) = &self.security.sasl {
            if sasl.username.is_empty() {
                return Err(Error::InvalidConfig(
                    "SASL is enabled but the username is empty".to_string(),
                ));
            }
            if sasl.password.is_empty() {
                return Err(Error::InvalidConfig(
                    "SASL is enabled but the password is empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Build the rdkafka client configuration shared by producers and consumers.
    pub fn client_config(&self) -> Result<ClientConfig> {
        self.validate()?;

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.brokers.join(","))
            .set("client.id", &self.client_id)
            .set("security.protocol", self.security.protocol());

        if self.security.tls {
            config.set(
                "enable.ssl.certificate.verification",
                self.security.verify_certificates.to_string(),
            );
        }

        if let Some(sasl) = &self.security.sasl {
            config
                .set("sasl.mechanism", &sasl.mechanism)
                .set("sasl.username", &sasl.username)
                .set("sasl.password", &sasl.password);
        }

        if self.verbose {
            config.set_log_level(RDKafkaLogLevel::Debug);
            config.set("debug", "broker,topic,msg,cgrp");
        }

        tracing::debug!(
            brokers = %self.brokers.join(","),
            protocol = self.security.protocol(),
            "Built Kafka client configuration"
        );

        Ok(config)
    }
}
