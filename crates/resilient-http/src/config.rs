//! Client configuration.
//!
//! [`ClientConfig`] is built once, validated, and then shared read-only by
//! every call. It can come from code, from environment variables or from any
//! serde format.
//!
//! | field | environment variable | default |
//! |---|---|---|
//! | `timeout` | `HTTP_TIMEOUT` | 30s |
//! | `dial_timeout` | `HTTP_DIAL_TIMEOUT` | 5s |
//! | `max_retries` | `HTTP_MAX_RETRIES` | 3 |
//! | `retry_delay` | `HTTP_RETRY_DELAY` | 1s |
//! | `failure_threshold` | `HTTP_CB_THRESHOLD` | 10 |
//! | `open_duration` | `HTTP_CB_TIMEOUT` | 60s |
//! | `half_open_trials` | `HTTP_CB_HALF_OPEN_TRIALS` | 1 |
//! | `name` | `HTTP_CLIENT_NAME` | `http-client` |
//!
//! Durations use humantime syntax: `250ms`, `30s`, `1m 30s`.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_TIMEOUT: &str = "HTTP_TIMEOUT";
pub const ENV_DIAL_TIMEOUT: &str = "HTTP_DIAL_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "HTTP_MAX_RETRIES";
pub const ENV_RETRY_DELAY: &str = "HTTP_RETRY_DELAY";
pub const ENV_CB_THRESHOLD: &str = "HTTP_CB_THRESHOLD";
pub const ENV_CB_TIMEOUT: &str = "HTTP_CB_TIMEOUT";
pub const ENV_CB_HALF_OPEN_TRIALS: &str = "HTTP_CB_HALF_OPEN_TRIALS";
pub const ENV_CLIENT_NAME: &str = "HTTP_CLIENT_NAME";

/// Validated client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ClientConfigBuilder")]
pub struct ClientConfig {
    timeout: Duration,
    dial_timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    failure_threshold: u32,
    open_duration: Duration,
    half_open_trials: u32,
    name: String,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Reads the process environment. Unset variables keep their default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    ///
    /// ```rust
    /// use resilient_http::ClientConfig;
    /// use std::collections::HashMap;
    /// use std::time::Duration;
    ///
    /// let vars = HashMap::from([("HTTP_MAX_RETRIES", "5"), ("HTTP_TIMEOUT", "10s")]);
    /// let config = ClientConfig::from_env_with(|k| vars.get(k).map(|v| v.to_string())).unwrap();
    ///
    /// assert_eq!(config.max_retries(), 5);
    /// assert_eq!(config.timeout(), Duration::from_secs(10));
    /// assert_eq!(config.failure_threshold(), 10);
    /// ```
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(value) = lookup(ENV_TIMEOUT) {
            builder = builder.timeout(parse_duration(ENV_TIMEOUT, &value)?);
        }
        if let Some(value) = lookup(ENV_DIAL_TIMEOUT) {
            builder = builder.dial_timeout(parse_duration(ENV_DIAL_TIMEOUT, &value)?);
        }
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            builder = builder.max_retries(parse_number(ENV_MAX_RETRIES, &value)?);
        }
        if let Some(value) = lookup(ENV_RETRY_DELAY) {
            builder = builder.retry_delay(parse_duration(ENV_RETRY_DELAY, &value)?);
        }
        if let Some(value) = lookup(ENV_CB_THRESHOLD) {
            builder = builder.failure_threshold(parse_number(ENV_CB_THRESHOLD, &value)?);
        }
        if let Some(value) = lookup(ENV_CB_TIMEOUT) {
            builder = builder.open_duration(parse_duration(ENV_CB_TIMEOUT, &value)?);
        }
        if let Some(value) = lookup(ENV_CB_HALF_OPEN_TRIALS) {
            builder = builder.half_open_trials(parse_number(ENV_CB_HALF_OPEN_TRIALS, &value)?);
        }
        if let Some(value) = lookup(ENV_CLIENT_NAME) {
            builder = builder.name(value);
        }

        builder.build()
    }

    /// Overall bound on one call, every attempt and delay included.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Bound on establishing a connection.
    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    /// Retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts per call: `max_retries + 1`.
    pub fn max_attempts(&self) -> usize {
        self.max_retries as usize + 1
    }

    /// Base of the linear backoff: retry `n` waits `retry_delay * n`.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Consecutive failed calls that open the breaker.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// How long the breaker stays open before a trial call.
    pub fn open_duration(&self) -> Duration {
        self.open_duration
    }

    pub fn half_open_trials(&self) -> u32 {
        self.half_open_trials
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let b = ClientConfigBuilder::default();
        Self {
            timeout: b.timeout,
            dial_timeout: b.dial_timeout,
            max_retries: b.max_retries,
            retry_delay: b.retry_delay,
            failure_threshold: b.failure_threshold,
            open_duration: b.open_duration,
            half_open_trials: b.half_open_trials,
            name: b.name,
        }
    }
}

impl TryFrom<ClientConfigBuilder> for ClientConfig {
    type Error = ConfigError;

    fn try_from(builder: ClientConfigBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

/// Builder for [`ClientConfig`]. Also the serde shape of the configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfigBuilder {
    #[serde(deserialize_with = "humantime_duration")]
    timeout: Duration,
    #[serde(deserialize_with = "humantime_duration")]
    dial_timeout: Duration,
    max_retries: u32,
    #[serde(deserialize_with = "humantime_duration")]
    retry_delay: Duration,
    failure_threshold: u32,
    #[serde(deserialize_with = "humantime_duration")]
    open_duration: Duration,
    half_open_trials: u32,
    name: String,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            dial_timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            failure_threshold: 10,
            open_duration: Duration::from_secs(60),
            half_open_trials: 1,
            name: "http-client".to_string(),
        }
    }
}

impl ClientConfigBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn open_duration(mut self, duration: Duration) -> Self {
        self.open_duration = duration;
        self
    }

    pub fn half_open_trials(mut self, trials: u32) -> Self {
        self.half_open_trials = trials;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::Zero { field: "timeout" });
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::Zero { field: "failure_threshold" });
        }
        if self.half_open_trials == 0 {
            return Err(ConfigError::Zero { field: "half_open_trials" });
        }
        if self.dial_timeout > self.timeout {
            return Err(ConfigError::DialExceedsTimeout {
                dial_timeout: self.dial_timeout,
                timeout: self.timeout,
            });
        }

        Ok(ClientConfig {
            timeout: self.timeout,
            dial_timeout: self.dial_timeout,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            failure_threshold: self.failure_threshold,
            open_duration: self.open_duration,
            half_open_trials: self.half_open_trials,
            name: self.name,
        })
    }
}

fn humantime_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)
}

fn parse_duration(var: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_number<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
