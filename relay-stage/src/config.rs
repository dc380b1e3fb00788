use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Empty service name")]
    EmptyServiceName,

    #[error("Relay URL must use http or https, got {0}")]
    UnsupportedRelayScheme(String),

    #[error("Shutdown timeout must be greater than 0")]
    InvalidShutdownTimeout,

    #[error("Header read timeout must be greater than 0")]
    InvalidHeaderReadTimeout,

    #[error("Relay timeout must be greater than 0")]
    InvalidRelayTimeout,
}

/// What a relay stage tells its caller when forwarding downstream fails.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelayFailurePolicy {
    /// Keep the record and acknowledge the request anyway.
    #[default]
    Accept,
    /// Keep the record but answer 502 so the caller knows the value went no further.
    Reject,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Downstream stage this stage forwards to.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// Full URL of the next stage's `/post` endpoint.
    pub url: Url,
    #[serde(default)]
    pub on_failure: RelayFailurePolicy,
    /// Per-call timeout. The HTTP client default (no timeout) applies when unset.
    pub timeout_secs: Option<u64>,
}

/// Configuration of a single stage process.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Identity stamped on every stored record and sent when relaying.
    pub service_name: String,
    #[serde(default)]
    pub listener: Listener,
    /// Listener for `/health` and `/ready`.
    pub admin_listener: Option<Listener>,
    /// Present on relay stages, absent on the terminal stage.
    pub relay: Option<RelayConfig>,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Connections that have not sent a complete request head within this window are closed.
    #[serde(default = "default_header_read_timeout_ms")]
    pub header_read_timeout_ms: u64,
}

fn default_shutdown_timeout_ms() -> u64 {
    30_000
}

fn default_header_read_timeout_ms() -> u64 {
    5_000
}

impl Config {
    /// Convenience constructor for a stage with default settings.
    pub fn new(service_name: &str, listener: Listener) -> Self {
        Config {
            service_name: service_name.into(),
            listener,
            admin_listener: None,
            relay: None,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            header_read_timeout_ms: default_header_read_timeout_ms(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.relay.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.service_name.is_empty() {
            return Err(ValidationError::EmptyServiceName);
        }

        self.listener.validate()?;
        if let Some(admin) = &self.admin_listener {
            admin.validate()?;
        }

        if let Some(relay) = &self.relay {
            if !matches!(relay.url.scheme(), "http" | "https") {
                return Err(ValidationError::UnsupportedRelayScheme(
                    relay.url.scheme().to_string(),
                ));
            }
            if relay.timeout_secs == Some(0) {
                return Err(ValidationError::InvalidRelayTimeout);
            }
        }

        if self.shutdown_timeout_ms == 0 {
            return Err(ValidationError::InvalidShutdownTimeout);
        }
        if self.header_read_timeout_ms == 0 {
            return Err(ValidationError::InvalidHeaderReadTimeout);
        }

        Ok(())
    }
}
