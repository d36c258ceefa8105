//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A numeric variable could not be parsed.
    #[error("failed to parse {name}='{value}' as a number")]
    InvalidNumber { name: &'static str, value: String },

    /// A required environment variable was not set.
    ///
    /// Raised by [`Config::oracle_url`](super::Config::oracle_url) when the server is
    /// started without an oracle endpoint.
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },

    /// A timeout was configured as zero.
    #[error("{name} must be greater than zero")]
    ZeroTimeout { name: &'static str },

    /// A timeout exceeds [`MAX_TIMEOUT`](crate::constants::MAX_TIMEOUT).
    #[error("{name} must be at most {max_secs} seconds")]
    TimeoutTooLarge { name: &'static str, max_secs: u64 },

    /// The oracle score range is empty, inverted or not finite.
    #[error("invalid score range [{min}, {max}]: min must be below max")]
    InvalidScoreRange { min: f64, max: f64 },

    /// The oracle URL is not an http(s) URL.
    #[error("invalid oracle URL '{value}': expected http:// or https://")]
    InvalidOracleUrl { value: String },
}
