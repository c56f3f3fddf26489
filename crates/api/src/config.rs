//! Service configuration loaded from environment variables.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use userserver_auth::DEFAULT_CLOCK_SKEW_SECS;
use userserver_observability::{LogConfig, LogFormat};

const DEV_USER_SECRET: &str = "dev-user-secret";
const DEV_SERVER_SECRET: &str = "dev-server-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: SocketAddr,
    pub user_token_secret: String,
    pub server_token_secret: String,
    pub user_token_ttl: Duration,
    pub server_token_ttl: Duration,
    /// Clock difference tolerated on token `iat`/`exp`.
    pub token_clock_skew: Duration,
    pub log: LogConfig,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr: SocketAddr = parse_or(&lookup, "USERSERVER_ADDR", "0.0.0.0:8080".parse().ok())?;

        let user_token_secret = secret(&lookup, "USER_TOKEN_SECRET", DEV_USER_SECRET);
        let server_token_secret = secret(&lookup, "SERVER_TOKEN_SECRET", DEV_SERVER_SECRET);

        let user_ttl_secs: i64 = parse_or(&lookup, "USER_TOKEN_TTL_SECS", Some(7 * 24 * 3600))?;
        let server_ttl_secs: i64 = parse_or(&lookup, "SERVER_TOKEN_TTL_SECS", Some(24 * 3600))?;
        let skew_secs: u32 =
            parse_or(&lookup, "TOKEN_CLOCK_SKEW_SECS", Some(DEFAULT_CLOCK_SKEW_SECS as u32))?;

        let format: LogFormat = parse_or(&lookup, "LOG_FORMAT", Some(LogFormat::Json))?;

        Ok(Self {
            addr,
            user_token_secret,
            server_token_secret,
            user_token_ttl: ttl("USER_TOKEN_TTL_SECS", user_ttl_secs)?,
            server_token_ttl: ttl("SERVER_TOKEN_TTL_SECS", server_ttl_secs)?,
            token_clock_skew: Duration::seconds(i64::from(skew_secs)),
            log: LogConfig {
                format,
                ..LogConfig::default()
            },
        })
    }

    /// Names of token secrets still on their insecure dev defaults.
    pub fn dev_secrets(&self) -> Vec<&'static str> {
        let mut vars = Vec::new();
        if self.user_token_secret == DEV_USER_SECRET {
            vars.push("USER_TOKEN_SECRET");
        }
        if self.server_token_secret == DEV_SERVER_SECRET {
            vars.push("SERVER_TOKEN_SECRET");
        }
        vars
    }
}

fn secret<F>(lookup: &F, var: &'static str, dev_default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| dev_default.to_string())
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var).filter(|s| !s.trim().is_empty()) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => default.ok_or_else(|| ConfigError::Invalid {
            var,
            value: String::new(),
            reason: "missing".to_string(),
        }),
    }
}

fn ttl(var: &'static str, secs: i64) -> Result<Duration, ConfigError> {
    if secs <= 0 {
        return Err(ConfigError::Invalid {
            var,
            value: secs.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Duration::try_seconds(secs).ok_or_else(|| ConfigError::Invalid {
        var,
        value: secs.to_string(),
        reason: "out of range".to_string(),
    })
}
