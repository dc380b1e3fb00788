use generator::config::Config as GeneratorConfig;
use relay_stage::config::Config as StageConfig;
use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub stage: Option<StageConfig>,
    pub generator: Option<GeneratorConfig>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_stage::config::RelayFailurePolicy;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    fn load(s: &str) -> Config {
        let tmp = write_tmp_file(s);
        Config::from_file(tmp.path()).expect("load config")
    }

    #[test]
    fn relay_stage_config() {
        let config = load(include_str!("../../configs/service-b.yaml"));
        assert_eq!(config.common, CommonConfig::default());
        assert!(config.generator.is_none());

        let stage = config.stage.expect("stage config");
        assert!(stage.validate().is_ok());
        assert_eq!(stage.service_name, "serviceB");
        assert_eq!(stage.listener.port, 9000);
        let relay = stage.relay.expect("relay config");
        assert_eq!(relay.url.as_str(), "http://localhost:15000/post");
        assert_eq!(relay.on_failure, RelayFailurePolicy::Accept);
    }

    #[test]
    fn terminal_stage_config() {
        let config = load(include_str!("../../configs/service-c.yaml"));
        assert_eq!(
            config.common.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
            })
        );

        let stage = config.stage.expect("stage config");
        assert!(stage.validate().is_ok());
        assert!(stage.is_terminal());
        assert_eq!(stage.listener.port, 15000);
    }

    #[test]
    fn generator_config() {
        let config = load(include_str!("../../configs/service-a.yaml"));
        assert!(config.stage.is_none());

        let generator = config.generator.expect("generator config");
        assert!(generator.validate().is_ok());
        assert_eq!(generator.target.as_str(), "http://localhost:9000/post");
        assert_eq!(generator.interval_ms, 500);
    }

    #[test]
    fn logging_config() {
        let config = load(
            r#"
            logging:
                sentry_dsn: https://public@sentry.example.com/1
            "#,
        );
        assert_eq!(
            config.common.logging,
            Some(LoggingConfig {
                sentry_dsn: "https://public@sentry.example.com/1".into()
            })
        );
    }

    #[test]
    fn invalid_config() {
        let tmp = write_tmp_file("stage: [not, a, mapping]");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));

        assert!(matches!(
            Config::from_file(std::path::Path::new("/nonexistent/relaychain.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
