//! Tracker configuration.
//!
//! Loaded from a TOML file (`goat.toml` by default) merged with `GOAT_`
//! prefixed environment variables (`GOAT_PORT`, `GOAT_SSL__ENABLED`, ...).
//! Missing keys fall back to the defaults below, so an empty or absent file
//! yields a working public tracker on port 6969.
//!
//! ```toml
//! port = 6969
//! http = true
//! udp = true
//! passkey = false
//! whitelist = false
//! interval = 3600
//! api = true
//!
//! [ssl]
//! enabled = false
//! port = 6970
//! certificate = ""
//! key = ""
//!
//! [redis]
//! enabled = false
//! host = "127.0.0.1:6379"
//! password = ""
//!
//! [store]
//! driver = "Sqlite3"
//! path = "./goat.db"
//! ```
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::databases::driver::Driver;

/// Default configuration file path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "goat.toml";

/// HTTPS listener settings.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SslConfig {
    pub enabled: bool,
    pub port: u16,
    /// Path to the PEM certificate file.
    pub certificate: String,
    /// Path to the PEM private key file.
    pub key: String,
}

impl Default for SslConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 6970,
            certificate: String::new(),
            key: String::new(),
        }
    }
}

/// Redis settings for the admin API rate-limit counter.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct RedisConfig {
    pub enabled: bool,
    pub host: String,
    pub password: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1:6379".to_string(),
            password: String::new(),
        }
    }
}

/// Backing database settings.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct StoreConfig {
    pub driver: Driver,
    /// A file path for `Sqlite3`, a connection URL for `MySQL`.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Sqlite3,
            path: "./goat.db".to_string(),
        }
    }
}

/// The tracker configuration.
#[allow(clippy::struct_excessive_bools)]
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Configuration {
    /// Port shared by the HTTP and UDP listeners.
    pub port: u16,
    /// Whether to start the HTTP listener.
    pub http: bool,
    /// Whether to start the UDP listener.
    pub udp: bool,
    /// Whether announce URLs must carry a passkey path segment.
    pub passkey: bool,
    /// Whether announcing clients must have a whitelisted user-agent.
    pub whitelist: bool,
    /// Announce interval in seconds, also the reaper cadence. Must be
    /// greater than 600.
    pub interval: u32,
    /// Whether the `/api` routes are served.
    pub api: bool,
    /// Admin API requests allowed per client IP per minute.
    pub api_limit: u64,
    /// Upper bound for the `numwant` announce parameter.
    pub max_numwant: u32,
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: Option<String>,
    pub ssl: SslConfig,
    pub redis: RedisConfig,
    pub store: StoreConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            port: 6969,
            http: true,
            udp: true,
            passkey: false,
            whitelist: false,
            interval: 3600,
            api: true,
            api_limit: 60,
            max_numwant: 100,
            log_level: Some("info".to_string()),
            ssl: SslConfig::default(),
            redis: RedisConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Configuration {
    /// It loads the configuration from a TOML file merged with `GOAT_`
    /// prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Will return an error if the file or the environment contain malformed
    /// values.
    pub fn load(path: &str) -> Result<Configuration, Error> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("GOAT_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// Startup sanity checks. Violations abort the process.
    ///
    /// # Errors
    ///
    /// Will return an error if the announce interval is 600 seconds or less,
    /// or if SSL is enabled without certificate and key paths.
    pub fn validate(&self) -> Result<(), Error> {
        if self.interval <= 600 {
            return Err(Error::IntervalTooSmall { interval: self.interval });
        }

        if self.ssl.enabled && (self.ssl.certificate.is_empty() || self.ssl.key.is_empty()) {
            return Err(Error::MissingTlsFiles);
        }

        Ok(())
    }

    /// Clients must not reannounce more frequently than this.
    #[must_use]
    pub fn min_interval(&self) -> u32 {
        self.interval / 2
    }
}

/// Errors loading or validating the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not load configuration: {0}")]
    Load(#[from] figment::Error),
    #[error("announce interval must be greater than 600 seconds, got {interval}")]
    IntervalTooSmall { interval: u32 },
    #[error("ssl is enabled but the certificate or key path is empty")]
    MissingTlsFiles,
}

#[cfg(test)]
mod tests {
    use figment::providers::{Format, Serialized, Toml};
    use figment::Figment;

    use super::Configuration;

    #[test]
    fn the_default_configuration_should_be_valid() {
        let configuration = Configuration::default();

        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.min_interval(), 1800);
    }

    #[test]
    fn an_announce_interval_of_600_seconds_or_less_should_be_rejected() {
        let configuration = Configuration {
            interval: 600,
            ..Configuration::default()
        };

        assert!(configuration.validate().is_err());
    }

    #[test]
    fn ssl_without_certificate_paths_should_be_rejected() {
        let mut configuration = Configuration::default();
        configuration.ssl.enabled = true;

        assert!(configuration.validate().is_err());
    }

    #[test]
    fn a_missing_file_should_yield_the_defaults() {
        let configuration = Configuration::load("/nonexistent/goat.toml").unwrap();

        assert_eq!(configuration, Configuration::default());
    }

    #[test]
    fn toml_sections_should_override_the_defaults() {
        let toml = r#"
            port = 7070
            passkey = true

            [ssl]
            enabled = true
            certificate = "localhost.crt"
            key = "localhost.key"

            [store]
            driver = "MySQL"
            path = "mysql://root@localhost:3306/goat"
        "#;

        let configuration: Configuration = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap();

        assert_eq!(configuration.port, 7070);
        assert!(configuration.passkey);
        assert!(configuration.ssl.enabled);
        assert_eq!(configuration.store.path, "mysql://root@localhost:3306/goat");
    }
}
