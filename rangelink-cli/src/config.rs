//! Configuration file support for rangelink roles
//!
//! Two formats are accepted. A path ending in `.toml` is read as TOML with an
//! `[endpoints]` table and an optional `[session]` table. Any other path is
//! read as the legacy whitespace-delimited five-tuple
//!
//! ```text
//! <sender_ip> <sender_port> <server_ip> <receiver_port> <receiver_ip>
//! ```
//!
//! with every session setting at its default.

use rangelink_protocol::{CalibrationPolicy, IntegrityScheme, MonitorConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "config.txt";

/// Network addresses of the three roles
///
/// The sender transmits to `server_ip:sender_port`, where the relay listens.
/// The relay forwards to `receiver_ip:receiver_port`, where the receiver
/// listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Local address the sender sends from
    pub sender_ip: IpAddr,
    /// Port the relay listens on for the sender
    pub sender_port: u16,
    /// Address the relay listens on
    pub server_ip: IpAddr,
    /// Port the receiver listens on
    pub receiver_port: u16,
    /// Address the receiver listens on
    pub receiver_ip: IpAddr,
}

impl Endpoints {
    /// Sender's local bind address; the port is left to the OS
    pub fn sender_bind(&self) -> SocketAddr {
        SocketAddr::new(self.sender_ip, 0)
    }

    /// Where the sender sends and the relay listens
    pub fn relay_listen(&self) -> SocketAddr {
        SocketAddr::new(self.server_ip, self.sender_port)
    }

    /// Where the relay forwards and the receiver listens
    pub fn receiver_listen(&self) -> SocketAddr {
        SocketAddr::new(self.receiver_ip, self.receiver_port)
    }

    /// Local address for the relay's forwarding socket
    pub fn relay_forward_bind(&self) -> SocketAddr {
        SocketAddr::new(self.server_ip, 0)
    }
}

/// Integrity scheme as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityMode {
    /// Wire v1, XOR checksum
    #[default]
    Xor,
    /// Wire v2, truncated SHA-256
    Digest,
}

impl From<IntegrityMode> for IntegrityScheme {
    fn from(mode: IntegrityMode) -> Self {
        match mode {
            IntegrityMode::Xor => IntegrityScheme::Xor,
            IntegrityMode::Digest => IntegrityScheme::Digest,
        }
    }
}

/// Session tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Interval between samples in milliseconds
    #[serde(default = "default_send_interval")]
    pub send_interval_ms: u64,
    /// Receive timeout in milliseconds
    #[serde(default = "default_recv_timeout")]
    pub recv_timeout_ms: u64,
    /// Delay anomaly threshold in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: f64,
    /// Sync samples per calibration burst (odd)
    #[serde(default = "default_sync_burst")]
    pub sync_burst: usize,
    /// Constant distance reading sent in Data samples
    #[serde(default = "default_distance")]
    pub distance: u32,
    /// Integrity scheme for samples this sender emits
    #[serde(default)]
    pub integrity: IntegrityMode,
    /// Data samples between Sync bursts; absent keeps one-shot calibration
    #[serde(default)]
    pub recalibrate_every: Option<u32>,
}

fn default_send_interval() -> u64 {
    500
}

fn default_recv_timeout() -> u64 {
    1000
}

fn default_max_delay() -> f64 {
    rangelink_protocol::monitor::DEFAULT_MAX_DELAY_MS
}

fn default_sync_burst() -> usize {
    rangelink_protocol::calibration::DEFAULT_BURST_SIZE
}

fn default_distance() -> u32 {
    100
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            send_interval_ms: default_send_interval(),
            recv_timeout_ms: default_recv_timeout(),
            max_delay_ms: default_max_delay(),
            sync_burst: default_sync_burst(),
            distance: default_distance(),
            integrity: IntegrityMode::default(),
            recalibrate_every: None,
        }
    }
}

/// Combined configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub endpoints: Endpoints,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load and validate configuration, choosing the format by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            Self::from_toml_str(&contents)?
        } else {
            Self::parse_legacy(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse the whitespace-delimited five-tuple
    pub fn parse_legacy(contents: &str) -> Result<Self, ConfigError> {
        let mut fields = contents.split_whitespace();
        let endpoints = Endpoints {
            sender_ip: next_field(&mut fields, "sender_ip")?,
            sender_port: next_field(&mut fields, "sender_port")?,
            server_ip: next_field(&mut fields, "server_ip")?,
            receiver_port: next_field(&mut fields, "receiver_port")?,
            receiver_ip: next_field(&mut fields, "receiver_ip")?,
        };
        if let Some(extra) = fields.next() {
            return Err(ConfigError::Invalid(format!(
                "unexpected trailing field '{}'",
                extra
            )));
        }

        Ok(Config {
            endpoints,
            session: SessionConfig::default(),
        })
    }

    /// Parse TOML
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Reject settings the roles cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.session;
        if session.sync_burst % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "sync_burst must be odd, got {}",
                session.sync_burst
            )));
        }
        if session.send_interval_ms == 0 {
            return Err(ConfigError::Invalid("send_interval_ms must be positive".into()));
        }
        if session.recv_timeout_ms == 0 {
            return Err(ConfigError::Invalid("recv_timeout_ms must be positive".into()));
        }
        if !session.max_delay_ms.is_finite() || session.max_delay_ms < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_delay_ms must be a non-negative number, got {}",
                session.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Example configuration for a single host
    pub fn example() -> Self {
        let localhost: IpAddr = [127, 0, 0, 1].into();
        Config {
            endpoints: Endpoints {
                sender_ip: localhost,
                sender_port: 5000,
                server_ip: localhost,
                receiver_port: 5001,
                receiver_ip: localhost,
            },
            session: SessionConfig::default(),
        }
    }

    /// Interval between samples
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.session.send_interval_ms)
    }

    /// Receive timeout
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.session.recv_timeout_ms)
    }

    /// Integrity scheme for emitted samples
    pub fn integrity(&self) -> IntegrityScheme {
        self.session.integrity.into()
    }

    /// Whether observers refresh the offset on later Sync bursts
    pub fn calibration_policy(&self) -> CalibrationPolicy {
        match self.session.recalibrate_every {
            Some(n) if n > 0 => CalibrationPolicy::Refresh,
            _ => CalibrationPolicy::OneShot,
        }
    }

    /// Monitor parameters for the relay and receiver
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            burst_size: self.session.sync_burst,
            policy: self.calibration_policy(),
            max_delay_ms: self.session.max_delay_ms,
        }
    }
}

fn next_field<'a, T: FromStr>(
    fields: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<T, ConfigError> {
    let raw = fields.next().ok_or(ConfigError::Missing(name))?;
    raw.parse().map_err(|_| ConfigError::Malformed {
        field: name,
        value: raw.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Missing field: {0}")]
    Missing(&'static str),

    #[error("Malformed {field}: '{value}'")]
    Malformed { field: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy() {
        let config = Config::parse_legacy("127.0.0.1 5000\n10.0.0.2 5001 10.0.0.3\n").unwrap();

        assert_eq!(config.endpoints.sender_bind(), "127.0.0.1:0".parse().unwrap());
        assert_eq!(config.endpoints.relay_listen(), "10.0.0.2:5000".parse().unwrap());
        assert_eq!(
            config.endpoints.receiver_listen(),
            "10.0.0.3:5001".parse().unwrap()
        );
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_parse_legacy_missing_field() {
        let err = Config::parse_legacy("127.0.0.1 5000 127.0.0.1 5001").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("receiver_ip")));
    }

    #[test]
    fn test_parse_legacy_malformed_port() {
        let err = Config::parse_legacy("127.0.0.1 70000 127.0.0.1 5001 127.0.0.1").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Malformed { field: "sender_port", .. }
        ));
    }

    #[test]
    fn test_parse_legacy_trailing_field() {
        let err =
            Config::parse_legacy("127.0.0.1 5000 127.0.0.1 5001 127.0.0.1 extra").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_toml_defaults() {
        let config = Config::from_toml_str(
            r#"
            [endpoints]
            sender_ip = "127.0.0.1"
            sender_port = 6000
            server_ip = "127.0.0.1"
            receiver_port = 6001
            receiver_ip = "127.0.0.1"
            "#,
        )
        .unwrap();

        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.calibration_policy(), CalibrationPolicy::OneShot);
        assert_eq!(config.send_interval(), Duration::from_millis(500));
        assert_eq!(config.recv_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_toml_session() {
        let config = Config::from_toml_str(
            r#"
            [endpoints]
            sender_ip = "::1"
            sender_port = 6000
            server_ip = "::1"
            receiver_port = 6001
            receiver_ip = "::1"

            [session]
            sync_burst = 7
            integrity = "digest"
            recalibrate_every = 120
            max_delay_ms = 25.0
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.integrity(), IntegrityScheme::Digest);
        assert_eq!(config.calibration_policy(), CalibrationPolicy::Refresh);
        let monitor = config.monitor_config();
        assert_eq!(monitor.burst_size, 7);
        assert_eq!(monitor.max_delay_ms, 25.0);
    }

    #[test]
    fn test_validate_rejects_even_burst() {
        let mut config = Config::example();
        config.session.sync_burst = 4;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::example();
        config.session.recv_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_recalibration_is_one_shot() {
        let mut config = Config::example();
        config.session.recalibrate_every = Some(0);
        assert_eq!(config.calibration_policy(), CalibrationPolicy::OneShot);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::example();
        let toml = config.to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_file_both_formats() {
        let dir = std::env::temp_dir().join(format!("rangelink-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let legacy = dir.join("config.txt");
        fs::write(&legacy, "127.0.0.1 5000 127.0.0.1 5001 127.0.0.1").unwrap();
        assert_eq!(Config::from_file(&legacy).unwrap(), Config::example());

        let toml_path = dir.join("config.toml");
        Config::example().to_file(&toml_path).unwrap();
        assert_eq!(Config::from_file(&toml_path).unwrap(), Config::example());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = Config::from_file("/nonexistent/rangelink/config.txt").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
