//! Configuration structures for vmwatch.
//!
//! This module provides configuration types for the watcher and its
//! connection:
//!
//! - [`ConnectionConfig`] - Endpoint and credentials
//! - [`WatchConfig`] - Poll bounds and reported properties
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs the fields it
//! overrides.

use std::fmt;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{DEFAULT_MAX_WAIT_SECONDS, PropertySpec, WaitOptions};

/// Credentials used to open a session.
///
/// The password is never printed by the [`Debug`] implementation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Endpoint host name, optionally with a port.
    pub host: String,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials for `host`.
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings.
///
/// # Examples
///
/// ```
/// use vw_core::ConnectionConfig;
///
/// let config = ConnectionConfig::default();
/// assert!(config.host.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Endpoint host name.
    pub host: String,

    /// User name.
    pub user: String,

    /// Password. Read from configuration but never written back out.
    #[serde(skip_serializing)]
    pub password: String,
}

impl ConnectionConfig {
    /// Returns the credentials described by this configuration.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.host, &self.user, &self.password)
    }
}

/// Configuration for the change watcher.
///
/// # Examples
///
/// ```
/// use vw_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.max_wait_seconds, Some(5));
/// assert_eq!(config.properties.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Upper bound for a single wait call in seconds.
    ///
    /// `None` lets the collector block until a change arrives, which also
    /// delays observing cancellation until then.
    pub max_wait_seconds: Option<u32>,

    /// Page size for large responses. `None` leaves paging to the collector.
    pub max_object_updates: Option<u32>,

    /// Report changes below a property's top level path by path, e.g.
    /// `summary.runtime.powerState`, instead of the whole new value.
    pub partial_updates: bool,

    /// Properties to report, per managed object type.
    pub properties: Vec<PropertySpec>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            max_wait_seconds: Some(DEFAULT_MAX_WAIT_SECONDS),
            max_object_updates: None,
            partial_updates: false,
            properties: vec![PropertySpec::virtual_machine_summary()],
        }
    }
}

impl WatchConfig {
    /// Returns the wait options described by this configuration.
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            max_wait_seconds: self.max_wait_seconds,
            max_object_updates: self.max_object_updates,
        }
    }

    /// Checks that the configuration can be used to build a filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.properties.is_empty() {
            return Err(ConfigError::invalid_option(
                "watch.properties",
                "at least one property selection is required",
            ));
        }
        if let Some(spec) = self.properties.iter().find(|p| p.path_set.is_empty()) {
            return Err(ConfigError::invalid_option(
                "watch.properties",
                format!("no property paths given for type {}", spec.kind),
            ));
        }
        if self.max_object_updates == Some(0) {
            return Err(ConfigError::invalid_option(
                "watch.max_object_updates",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Root configuration for vmwatch.
///
/// # Examples
///
/// ```
/// use vw_core::Config;
///
/// let config = Config::from_json_str(r#"{"connection": {"host": "vc.example.com"}}"#).unwrap();
/// assert_eq!(config.connection.host, "vc.example.com");
/// assert_eq!(config.watch.max_wait_seconds, Some(5));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection configuration.
    pub connection: ConnectionConfig,

    /// Watcher configuration.
    pub watch: WatchConfig,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.watch.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_owned()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.max_wait_seconds, Some(5));
        assert!(config.max_object_updates.is_none());
        assert!(!config.partial_updates);
        assert_eq!(config.properties, vec![PropertySpec::virtual_machine_summary()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wait_options_from_config() {
        let config = WatchConfig {
            max_wait_seconds: None,
            max_object_updates: Some(50),
            ..WatchConfig::default()
        };
        let options = config.wait_options();
        assert!(!options.is_bounded());
        assert_eq!(options.max_object_updates, Some(50));
    }

    #[test]
    fn test_watch_config_snapshot() {
        insta::assert_json_snapshot!(WatchConfig::default(), @r#"
        {
          "max_wait_seconds": 5,
          "max_object_updates": null,
          "partial_updates": false,
          "properties": [
            {
              "type": "VirtualMachine",
              "pathSet": [
                "summary"
              ]
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"watch": {"max_wait_seconds": 30}}"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.watch.max_wait_seconds, Some(30));
        assert_eq!(config.watch.properties.len(), 1);
        assert!(config.connection.user.is_empty());
    }

    #[test]
    fn test_config_partial_updates_from_json() {
        let config = Config::from_json_str(r#"{"watch": {"partial_updates": true}}"#).unwrap();
        assert!(config.watch.partial_updates);
    }

    #[test]
    fn test_config_null_wait_means_unbounded() {
        let config = Config::from_json_str(r#"{"watch": {"max_wait_seconds": null}}"#).unwrap();
        assert!(config.watch.max_wait_seconds.is_none());
    }

    #[test]
    fn test_password_not_serialized() {
        let mut config = Config::default();
        config.connection.password = "hunter2".to_owned();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("vc", "admin", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_empty_properties_rejected() {
        let result = Config::from_json_str(r#"{"watch": {"properties": []}}"#);
        assert!(matches!(result, Err(ConfigError::InvalidOption { .. })));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let config = WatchConfig {
            max_object_updates: Some(0),
            ..WatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("vmwatch.json")).unwrap();
        std::fs::write(&path, r#"{"connection": {"host": "vc01", "password": "pw"}}"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.connection.host, "vc01");
        assert_eq!(config.connection.credentials().password, "pw");
    }

    #[test]
    fn test_from_json_file_missing() {
        let result = Config::from_json_file(Utf8Path::new("/nonexistent/vmwatch.json"));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }
}
