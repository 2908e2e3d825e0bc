//! Client configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::infrastructure::http_client::DEFAULT_HTTP_TIMEOUT;
use crate::infrastructure::websocket::ChannelSettings;
use crate::ports::endpoint::DEV_SERVER_PORT;
use crate::ports::{ConfigError, ServerEndpoint};

/// Where the client runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local server on `localhost`.
    #[default]
    Development,
    /// Server on the host that served the page.
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::invalid(
                "RPS_ENV",
                format!("expected development or production, got {other:?}"),
            )),
        }
    }
}

/// Client configuration loaded from environment
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub environment: Environment,
    /// Game server the channel and room client talk to
    pub endpoint: ServerEndpoint,
    pub channel: ChannelSettings,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            endpoint: ServerEndpoint::development(),
            channel: ChannelSettings::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Load `.env.local` / `.env` (if present), then read `RPS_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = match value("RPS_ENV") {
            Some(raw) => raw.parse()?,
            None => Environment::Development,
        };

        let endpoint = match environment {
            Environment::Development => {
                let port = parse_or(value("RPS_SERVER_PORT"), "RPS_SERVER_PORT", DEV_SERVER_PORT)?;
                ServerEndpoint::development_on(port)
            }
            Environment::Production => {
                let raw = value("RPS_PAGE_URL").ok_or(ConfigError::Missing("RPS_PAGE_URL"))?;
                let page = Url::parse(&raw).map_err(|e| ConfigError::invalid("RPS_PAGE_URL", e))?;
                ServerEndpoint::from_page_url(&page).ok_or_else(|| {
                    ConfigError::invalid("RPS_PAGE_URL", "expected an http(s) URL with a host")
                })?
            }
        };

        let defaults = ChannelSettings::default();
        let channel = ChannelSettings {
            connect_timeout: millis_or(
                value("RPS_CONNECT_TIMEOUT_MS"),
                "RPS_CONNECT_TIMEOUT_MS",
                defaults.connect_timeout,
            )?,
            max_reconnect_attempts: reconnect_attempts_or(
                value("RPS_MAX_RECONNECT_ATTEMPTS"),
                defaults.max_reconnect_attempts,
            )?,
            reconnect_base_delay: millis_or(
                value("RPS_RECONNECT_BASE_DELAY_MS"),
                "RPS_RECONNECT_BASE_DELAY_MS",
                defaults.reconnect_base_delay,
            )?,
        };

        let http_timeout = millis_or(
            value("RPS_HTTP_TIMEOUT_MS"),
            "RPS_HTTP_TIMEOUT_MS",
            DEFAULT_HTTP_TIMEOUT,
        )?;

        Ok(Self {
            environment,
            endpoint,
            channel,
            http_timeout,
        })
    }
}

/// Prefer local overrides; variables already set always win.
fn load_dotenv() {
    for filename in [".env.local", ".env"] {
        let _ = dotenvy::from_filename(filename);
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e| ConfigError::invalid(key, e)),
        None => Ok(default),
    }
}

/// At least one attempt is required so a dropped channel always ends in a
/// connection-lost event.
fn reconnect_attempts_or(raw: Option<String>, default: u32) -> Result<u32, ConfigError> {
    const KEY: &str = "RPS_MAX_RECONNECT_ATTEMPTS";
    match parse_or(raw, KEY, default)? {
        0 => Err(ConfigError::invalid(KEY, "must be at least 1")),
        attempts => Ok(attempts),
    }
}

fn millis_or(
    raw: Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match raw {
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::invalid(key, e)),
        None => Ok(default),
    }
}
