//! Configuration for the MikroTik exporter.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use mikrotik_exporter_common::config::LoggingConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::{Credential, DEFAULT_FETCH_TIMEOUT};
use crate::metric::is_valid_metric_name;
use crate::probe::{DEFAULT_PROBE_TIMEOUT, MAX_PROBE_TIMEOUT};

/// Port used when the listen address names only a host.
pub const DEFAULT_LISTEN_PORT: u16 = 9261;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] mikrotik_exporter_common::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Address to listen on (default: "0.0.0.0:9261").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Prefix of every device metric name (default: "mikrotik_exporter").
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// How probes reach devices.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Named credential profiles, selected with the `auth` probe parameter.
    #[serde(default)]
    pub auths: HashMap<String, AuthConfig>,

    /// Named collector selections, selected with the `module` probe parameter.
    #[serde(default)]
    pub modules: HashMap<String, ModuleConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_listen() -> String {
    format!("0.0.0.0:{}", DEFAULT_LISTEN_PORT)
}

fn default_namespace() -> String {
    "mikrotik_exporter".to_string()
}

/// Device access settings shared by all probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Deadline for a whole probe, across all collectors (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Timeout of a single REST request (seconds).
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// URL scheme of the REST API: "http" or "https".
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Accept self-signed device certificates over https.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_secs()
}

fn default_scheme() -> String {
    "http".to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            scheme: default_scheme(),
            accept_invalid_certs: false,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Username and password for one auth profile.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which collectors a module enables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default)]
    pub collectors: HashMap<String, bool>,
}

impl ExporterConfig {
    /// Load and validate configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON5 file without validating it.
    ///
    /// Callers apply their overrides and then call [`validate`](Self::validate).
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(mikrotik_exporter_common::load_config(path)?)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = mikrotik_exporter_common::parse_config(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        if !is_valid_metric_name(&self.namespace) {
            return Err(ConfigError::Validation(format!(
                "Invalid metric namespace: {}",
                self.namespace
            )));
        }

        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "probe.timeout_secs must be > 0".to_string(),
            ));
        }

        if self.probe.fetch_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "probe.fetch_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.probe.timeout_secs > MAX_PROBE_TIMEOUT.as_secs() {
            return Err(ConfigError::Validation(format!(
                "probe.timeout_secs must not exceed {}",
                MAX_PROBE_TIMEOUT.as_secs()
            )));
        }

        if self.probe.fetch_timeout_secs > self.probe.timeout_secs {
            return Err(ConfigError::Validation(
                "probe.fetch_timeout_secs must not exceed probe.timeout_secs".to_string(),
            ));
        }

        if !matches!(self.probe.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "probe.scheme must be \"http\" or \"https\", got \"{}\"",
                self.probe.scheme
            )));
        }

        self.logging.level_filter()?;

        Ok(())
    }

    /// Replace the listen address from `host:port` or a bare host.
    ///
    /// A bare IP address takes `port`, or [`DEFAULT_LISTEN_PORT`]. A full
    /// address takes `port` when one is given. Anything else is stored as is
    /// and rejected by [`validate`](Self::validate).
    pub fn override_listen(&mut self, listen: Option<&str>, port: Option<u16>) {
        let listen = listen.unwrap_or(self.listen.as_str());
        let resolved = if let Ok(mut addr) = listen.parse::<SocketAddr>() {
            if let Some(port) = port {
                addr.set_port(port);
            }
            addr.to_string()
        } else if let Ok(ip) = listen.parse::<IpAddr>() {
            SocketAddr::new(ip, port.unwrap_or(DEFAULT_LISTEN_PORT)).to_string()
        } else {
            listen.to_string()
        };
        self.listen = resolved;
    }

    /// Parsed listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen.parse().map_err(|_| {
            ConfigError::Validation(format!("Invalid listen address: {}", self.listen))
        })
    }

    /// Credential of a named auth profile.
    pub fn auth(&self, name: &str) -> Option<Credential> {
        self.auths
            .get(name)
            .map(|auth| Credential::new(&auth.username, &auth.password))
    }

    /// A named module.
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.get(name)
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            namespace: default_namespace(),
            probe: ProbeConfig::default(),
            auths: HashMap::new(),
            modules: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mikrotik_exporter_common::LogFormat;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.listen, "0.0.0.0:9261");
        assert_eq!(config.namespace, "mikrotik_exporter");
        assert_eq!(config.probe.timeout(), Duration::from_secs(30));
        assert_eq!(config.probe.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.probe.scheme, "http");
        assert!(!config.probe.accept_invalid_certs);
        assert!(config.auths.is_empty());
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            listen: "127.0.0.1:9300",
            namespace: "routeros",
            probe: {
                timeout_secs: 20,
                fetch_timeout_secs: 5,
                scheme: "https",
                accept_invalid_certs: true,
            },
            auths: {
                default: { username: "prometheus", password: "changeme" },
                core: { username: "monitor", password: "s3cret" },
            },
            modules: {
                default: {
                    collectors: { interfaces: true, system: true, bgp: false },
                },
                edge: {
                    collectors: { firewall: true },
                },
            },
            logging: {
                level: "debug",
                format: "json",
            },
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.listen_addr().unwrap().port(), 9300);
        assert_eq!(config.namespace, "routeros");
        assert_eq!(config.probe.timeout_secs, 20);
        assert_eq!(config.probe.scheme, "https");
        assert!(config.probe.accept_invalid_certs);

        let core = config.auth("core").unwrap();
        assert_eq!(core.username, "monitor");
        assert_eq!(core.password, "s3cret");
        assert!(config.auth("missing").is_none());

        let module = config.module("default").unwrap();
        assert_eq!(module.collectors.get("interfaces"), Some(&true));
        assert_eq!(module.collectors.get("bgp"), Some(&false));
        assert!(config.module("missing").is_none());

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_invalid_listen() {
        let result = ExporterConfig::parse(r#"{ listen: "not-an-address" }"#);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_namespace() {
        let result = ExporterConfig::parse(r#"{ namespace: "mikrotik-exporter" }"#);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid metric namespace")
        );
    }

    #[test]
    fn test_validate_timeouts() {
        assert!(ExporterConfig::parse("{ probe: { timeout_secs: 0 } }").is_err());
        assert!(ExporterConfig::parse("{ probe: { fetch_timeout_secs: 0 } }").is_err());

        let result =
            ExporterConfig::parse("{ probe: { timeout_secs: 5, fetch_timeout_secs: 10 } }");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must not exceed")
        );
    }

    #[test]
    fn test_validate_timeout_upper_bound() {
        let result = ExporterConfig::parse("{ probe: { timeout_secs: 18446744073709551615 } }");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must not exceed 86400")
        );

        assert!(ExporterConfig::parse("{ probe: { timeout_secs: 86400 } }").is_ok());
    }

    #[test]
    fn test_defaults_match_runtime_constants() {
        let probe = ProbeConfig::default();
        assert_eq!(probe.timeout(), DEFAULT_PROBE_TIMEOUT);
        assert_eq!(probe.fetch_timeout(), DEFAULT_FETCH_TIMEOUT);
    }

    #[test]
    fn test_validate_log_level() {
        let result = ExporterConfig::parse(r#"{ logging: { level: "loud" } }"#);
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_override_listen() {
        let mut config = ExporterConfig::default();
        config.override_listen(Some("127.0.0.1:9300"), None);
        assert_eq!(config.listen, "127.0.0.1:9300");

        config.override_listen(Some("10.0.0.5"), None);
        assert_eq!(config.listen, "10.0.0.5:9261");

        config.override_listen(Some("10.0.0.5"), Some(9400));
        assert_eq!(config.listen, "10.0.0.5:9400");

        config.override_listen(None, Some(9500));
        assert_eq!(config.listen, "10.0.0.5:9500");

        config.override_listen(Some("::1"), None);
        assert_eq!(config.listen, "[::1]:9261");

        config.override_listen(Some("router.local"), None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_rescue_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ listen: 'nowhere', namespace: 'bad-name' }}").unwrap();

        assert!(ExporterConfig::load_from_file(file.path()).is_err());

        let mut config = ExporterConfig::read_from_file(file.path()).unwrap();
        config.override_listen(Some("0.0.0.0"), Some(9261));
        config.namespace = "routeros".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_scheme() {
        let result = ExporterConfig::parse(r#"{ probe: { scheme: "ftp" } }"#);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_error_is_load_error() {
        let result = ExporterConfig::parse("{ listen: ");
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "{{ auths: {{ default: {{ username: 'admin', password: '' }} }} }}"
        )
        .unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.auth("default").unwrap().username, "admin");
    }

    #[test]
    fn test_sample_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/mikrotik.json5");
        let config = ExporterConfig::load_from_file(path).unwrap();

        assert!(config.auth("default").is_some());
        assert!(config.module("default").is_some());
    }

    #[test]
    fn test_auth_debug_redacts_password() {
        let auth = AuthConfig {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };

        assert!(!format!("{:?}", auth).contains("hunter2"));
    }
}
