//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `EDITGATE_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::broker::BrokerConfig;
use crate::constants::{DEFAULT_ORACLE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, MAX_TIMEOUT};
use crate::reward::RewardScale;

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `EDITGATE_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `18096`.
    pub port: u16,

    /// IP address to bind to. Default: `0.0.0.0`.
    pub bind_addr: IpAddr,

    /// Scoring backend endpoint. Required unless the mock oracle is enabled.
    pub oracle_url: Option<String>,

    /// Bearer token sent to the scoring backend.
    pub oracle_key: Option<String>,

    /// HTTP timeout of a single scoring backend call. Default: 300 s.
    pub oracle_timeout: Duration,

    /// How long a `POST /` caller waits for its result. Default: 600 s.
    pub request_timeout: Duration,

    /// Lower end of the scorer's native score range. Default: `0`.
    pub score_min: f64,

    /// Upper end of the scorer's native score range. Default: `10`.
    pub score_max: f64,

    /// Serve from the in-process mock scorer (only honoured with the `mock` feature).
    pub mock_oracle: bool,
}

/// Default port of the scoring service.
pub const DEFAULT_PORT: u16 = 18096;

impl Default for Config {
    fn default() -> Self {
        let scale = RewardScale::default();
        Self {
            port: DEFAULT_PORT,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
            oracle_url: None,
            oracle_key: None,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            score_min: scale.min,
            score_max: scale.max,
            mock_oracle: false,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "EDITGATE_PORT";
    const ENV_BIND_ADDR: &'static str = "EDITGATE_BIND_ADDR";
    const ENV_ORACLE_URL: &'static str = "EDITGATE_ORACLE_URL";
    const ENV_ORACLE_KEY: &'static str = "EDITGATE_ORACLE_KEY";
    const ENV_ORACLE_TIMEOUT: &'static str = "EDITGATE_ORACLE_TIMEOUT_SECS";
    const ENV_REQUEST_TIMEOUT: &'static str = "EDITGATE_REQUEST_TIMEOUT_SECS";
    const ENV_SCORE_MIN: &'static str = "EDITGATE_SCORE_MIN";
    const ENV_SCORE_MAX: &'static str = "EDITGATE_SCORE_MAX";
    const ENV_MOCK_ORACLE: &'static str = "EDITGATE_MOCK_ORACLE";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let oracle_url = Self::parse_optional_string_from_env(Self::ENV_ORACLE_URL);
        let oracle_key = Self::parse_optional_string_from_env(Self::ENV_ORACLE_KEY);
        let oracle_timeout = Duration::from_secs(Self::parse_number_from_env(
            Self::ENV_ORACLE_TIMEOUT,
            defaults.oracle_timeout.as_secs(),
        )?);
        let request_timeout = Duration::from_secs(Self::parse_number_from_env(
            Self::ENV_REQUEST_TIMEOUT,
            defaults.request_timeout.as_secs(),
        )?);
        let score_min = Self::parse_number_from_env(Self::ENV_SCORE_MIN, defaults.score_min)?;
        let score_max = Self::parse_number_from_env(Self::ENV_SCORE_MAX, defaults.score_max)?;
        let mock_oracle = Self::parse_flag_from_env(Self::ENV_MOCK_ORACLE);

        Ok(Self {
            port,
            bind_addr,
            oracle_url,
            oracle_key,
            oracle_timeout,
            request_timeout,
            score_min,
            score_max,
            mock_oracle,
        })
    }

    /// Checks timeouts, the score range and the oracle URL scheme.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, timeout) in [
            (Self::ENV_REQUEST_TIMEOUT, self.request_timeout),
            (Self::ENV_ORACLE_TIMEOUT, self.oracle_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::ZeroTimeout { name });
            }
            if timeout > MAX_TIMEOUT {
                return Err(ConfigError::TimeoutTooLarge {
                    name,
                    max_secs: MAX_TIMEOUT.as_secs(),
                });
            }
        }

        let finite = self.score_min.is_finite() && self.score_max.is_finite();
        if !finite || self.score_min >= self.score_max {
            return Err(ConfigError::InvalidScoreRange {
                min: self.score_min,
                max: self.score_max,
            });
        }

        if let Some(ref url) = self.oracle_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidOracleUrl { value: url.clone() });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// The oracle endpoint, or [`ConfigError::MissingEnvVar`] when unset.
    pub fn oracle_url(&self) -> Result<&str, ConfigError> {
        self.oracle_url
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar {
                name: Self::ENV_ORACLE_URL,
            })
    }

    pub fn reward_scale(&self) -> RewardScale {
        RewardScale::new(self.score_min, self.score_max)
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            request_timeout: self.request_timeout,
            reward_scale: self.reward_scale(),
        }
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_number_from_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
        match env::var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { name, value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_flag_from_env(var_name: &str) -> bool {
        env::var(var_name)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }
}
