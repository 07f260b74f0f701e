//! Configuration types for post-aggregator

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable prefix used by [`Config::from_env`]
pub const ENV_PREFIX: &str = "POST_AGGREGATOR_";

/// How the authors of a single post's comments are resolved
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAuthorResolution {
    /// One author request at a time, in comment order (default)
    #[default]
    Sequential,
    /// All comment authors of a post fetched concurrently, fail-fast
    Concurrent,
}

impl std::str::FromStr for CommentAuthorResolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(Error::config(
                "comment_authors",
                format!("expected 'sequential' or 'concurrent', got '{other}'"),
            )),
        }
    }
}

/// Main configuration for the aggregator and its HTTP transport
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the posts service (default: "http://127.0.0.1:9999")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP connect timeout for the transport (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Whole-request timeout for the transport (None = no limit)
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,

    /// Deadline for one complete aggregation run in the binary (default: 30 seconds)
    #[serde(default = "default_deadline", with = "duration_serde")]
    pub deadline: Duration,

    /// Comment-author resolution strategy inside a post
    #[serde(default)]
    pub comment_authors: CommentAuthorResolution,

    /// Log response bodies at trace level
    #[serde(default)]
    pub log_bodies: bool,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: default_connect_timeout(),
            request_timeout: None,
            deadline: default_deadline(),
            comment_authors: CommentAuthorResolution::default(),
            log_bodies: false,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Build a configuration from `POST_AGGREGATOR_*` environment variables
    ///
    /// Unset variables keep their defaults. Set-but-invalid values are errors,
    /// not silent fallbacks.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Some(base_url) = env_var("BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(secs) = env_var("CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = parse_secs("connect_timeout", &secs)?;
        }
        if let Some(secs) = env_var("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Some(parse_secs("request_timeout", &secs)?);
        }
        if let Some(secs) = env_var("DEADLINE_SECS") {
            config.deadline = parse_secs("deadline", &secs)?;
        }
        if let Some(mode) = env_var("COMMENT_AUTHORS") {
            config.comment_authors = mode.parse()?;
        }
        if let Some(flag) = env_var("LOG_BODIES") {
            config.log_bodies = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            Error::config(
                "base_url",
                format!("invalid base URL '{}': {}", self.base_url, e),
            )
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(Error::config(
                "base_url",
                "base URL must not carry a query or fragment",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect_timeout", "must be greater than zero"));
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("request_timeout", "must be greater than zero"));
        }

        if self.deadline.is_zero() {
            return Err(Error::config("deadline", "must be greater than zero"));
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| Error::config(key, format!("expected whole seconds, got '{value}': {e}")))
}

fn default_base_url() -> String {
    "http://127.0.0.1:9999".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_deadline() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
