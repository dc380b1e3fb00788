use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Empty service name")]
    EmptyServiceName,

    #[error("Interval must be greater than 0")]
    InvalidInterval,

    #[error("max_value must be greater than 0")]
    InvalidMaxValue,
}

/// Configuration of the value generator.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Sent as `serviceName` with every value.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// `/post` endpoint of the first stage.
    pub target: Url,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Values are drawn from `0..max_value`.
    #[serde(default = "default_max_value")]
    pub max_value: i64,
    /// Stop after this many values. Runs until a shutdown signal when unset.
    pub count: Option<u64>,
}

fn default_service_name() -> String {
    "serviceA".into()
}

fn default_interval_ms() -> u64 {
    500
}

fn default_max_value() -> i64 {
    10
}

impl Config {
    pub fn new(target: Url) -> Self {
        Config {
            service_name: default_service_name(),
            target,
            interval_ms: default_interval_ms(),
            max_value: default_max_value(),
            count: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.service_name.is_empty() {
            return Err(ValidationError::EmptyServiceName);
        }
        if self.interval_ms == 0 {
            return Err(ValidationError::InvalidInterval);
        }
        if self.max_value <= 0 {
            return Err(ValidationError::InvalidMaxValue);
        }
        Ok(())
    }
}
