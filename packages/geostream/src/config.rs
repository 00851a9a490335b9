use crate::frame::KeyCheck;
use crate::partition::GroupOrder;
use crate::record::ColumnMap;
use crate::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Interface to bind ("*" binds every interface)
    pub bind_host: String,
    /// Port to publish on
    pub port: u16,
    /// Delay between consecutive frames in milliseconds
    pub interval_ms: u64,
    /// Replay order of the time buckets
    pub order: GroupOrder,
    /// Field names for the dataset and frame headers
    pub columns: ColumnMap,
    /// Stop after this many frames (None = run until cancelled)
    #[serde(default)]
    pub max_frames: Option<u64>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            bind_host: "*".to_string(),
            port: DEFAULT_PORT,
            interval_ms: 1000,
            order: GroupOrder::default(),
            columns: ColumnMap::default(),
            max_frames: None,
        }
    }
}

impl PublisherConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            bind_host: lookup("GEOSTREAM_BIND").unwrap_or(defaults.bind_host),
            port: parse_port(&lookup)?.unwrap_or(defaults.port),
            interval_ms: match lookup("GEOSTREAM_INTERVAL_MS") {
                Some(v) => parse_value("GEOSTREAM_INTERVAL_MS", &v)?,
                None => defaults.interval_ms,
            },
            order: match lookup("GEOSTREAM_ORDER") {
                Some(v) => v
                    .parse::<GroupOrder>()
                    .map_err(ConfigError::InvalidValue)?,
                None => defaults.order,
            },
            columns: columns_from_lookup(&lookup)?,
            max_frames: None,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "bind host must not be empty".to_string(),
            ));
        }
        self.columns.validate().map_err(ConfigError::InvalidValue)
    }

    /// ZeroMQ endpoint to bind, e.g. "tcp://0.0.0.0:1132"
    pub fn endpoint(&self) -> String {
        let host = if self.bind_host == "*" {
            "0.0.0.0"
        } else {
            self.bind_host.as_str()
        };
        format!("tcp://{}:{}", host, self.port)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberConfig {
    /// Publisher host to connect to
    pub host: String,
    /// Publisher port
    pub port: u16,
    /// Field names expected in frame headers
    pub columns: ColumnMap,
    /// Whether row times must match the frame key
    pub key_check: KeyCheck,
    /// Renderer refresh period in milliseconds (None = never)
    #[serde(default)]
    pub refresh_ms: Option<u64>,
    /// Stop after this many received frames (None = run until cancelled)
    #[serde(default)]
    pub max_frames: Option<u64>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            columns: ColumnMap::default(),
            key_check: KeyCheck::default(),
            refresh_ms: None,
            max_frames: None,
        }
    }
}

impl SubscriberConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            host: lookup("GEOSTREAM_HOST").unwrap_or(defaults.host),
            port: parse_port(&lookup)?.unwrap_or(defaults.port),
            columns: columns_from_lookup(&lookup)?,
            key_check: match lookup("GEOSTREAM_KEY_CHECK") {
                Some(v) => v
                    .parse::<KeyCheck>()
                    .map_err(ConfigError::InvalidValue)?,
                None => defaults.key_check,
            },
            refresh_ms: match lookup("GEOSTREAM_REFRESH_MS") {
                Some(v) => Some(parse_value("GEOSTREAM_REFRESH_MS", &v)?),
                None => defaults.refresh_ms,
            },
            max_frames: None,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue("host must not be empty".to_string()));
        }
        if self.refresh_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "refresh period must be greater than zero".to_string(),
            ));
        }
        self.columns.validate().map_err(ConfigError::InvalidValue)
    }

    /// ZeroMQ endpoint to connect to, e.g. "tcp://localhost:1132"
    pub fn endpoint(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_ms.map(Duration::from_millis)
    }
}

fn parse_port<F>(lookup: &F) -> Result<Option<u16>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup("GEOSTREAM_PORT")
        .map(|v| v.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(v)))
        .transpose()
}

fn parse_value(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} must be an integer, got '{}'", key, value)))
}

fn columns_from_lookup<F>(lookup: &F) -> Result<ColumnMap, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ColumnMap::default();
    let columns = ColumnMap {
        longitude: lookup("GEOSTREAM_COL_LONG").unwrap_or(defaults.longitude),
        latitude: lookup("GEOSTREAM_COL_LAT").unwrap_or(defaults.latitude),
        identity: lookup("GEOSTREAM_COL_ID").unwrap_or(defaults.identity),
        time: lookup("GEOSTREAM_COL_TIME").unwrap_or(defaults.time),
    };
    columns.validate().map_err(ConfigError::InvalidValue)?;
    Ok(columns)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
