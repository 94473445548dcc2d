//! Server configuration loaded from the process environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::auto_reply::{DEFAULT_AUTO_REPLY_DELAY, DEFAULT_QUOTE_API_URL};
use crate::realtime::BroadcastScope;
use crate::store::StoreConfig;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Configuration errors, reported at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Chat store connection settings (`DATABASE_URL`, `DB_MAX_POOL_SIZE`)
    pub store: StoreConfig,

    /// Bind address (`HOST`)
    pub host: IpAddr,

    /// Listening port (`PORT`)
    pub port: u16,

    /// The single origin allowed to call the REST API (`CORS_ORIGIN`)
    pub cors_origin: String,

    /// Auto-reply content endpoint (`QUOTE_API_URL`)
    pub quote_api_url: String,

    /// Delay before the auto-reply (`AUTO_REPLY_DELAY_MS`)
    pub auto_reply_delay: Duration,

    /// Which sockets receive chat events (`BROADCAST_SCOPE`)
    pub broadcast_scope: BroadcastScope,
}

impl AppConfig {
    /// Load from the environment, after reading a `.env` file if one exists
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let mut store = StoreConfig::from_connection_string(database_url.trim()).map_err(|e| {
            ConfigError::Invalid {
                name: "DATABASE_URL",
                reason: e.to_string(),
            }
        })?;
        if let Some(size) = get("DB_MAX_POOL_SIZE") {
            store = store.with_max_pool_size(parse_var("DB_MAX_POOL_SIZE", &size)?);
        }

        let host = match get("HOST") {
            Some(host) => parse_var("HOST", &host)?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let port = match get("PORT") {
            Some(port) => parse_var("PORT", &port)?,
            None => DEFAULT_PORT,
        };

        let cors_origin = get("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());
        if !is_valid_origin(&cors_origin) {
            return Err(ConfigError::Invalid {
                name: "CORS_ORIGIN",
                reason: format!("'{}' is not an origin like http://host[:port]", cors_origin),
            });
        }

        let quote_api_url =
            get("QUOTE_API_URL").unwrap_or_else(|| DEFAULT_QUOTE_API_URL.to_string());

        let auto_reply_delay = match get("AUTO_REPLY_DELAY_MS") {
            Some(ms) => Duration::from_millis(parse_var("AUTO_REPLY_DELAY_MS", &ms)?),
            None => DEFAULT_AUTO_REPLY_DELAY,
        };

        let broadcast_scope = match get("BROADCAST_SCOPE") {
            Some(scope) => scope
                .parse()
                .map_err(|reason| ConfigError::Invalid {
                    name: "BROADCAST_SCOPE",
                    reason,
                })?,
            None => BroadcastScope::default(),
        };

        Ok(Self {
            store,
            host,
            port,
            cors_origin,
            quote_api_url,
            auto_reply_delay,
            broadcast_scope,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// `scheme://host[:port]` with an http(s) scheme and no path
fn is_valid_origin(origin: &str) -> bool {
    let Some(authority) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    !authority.is_empty()
        && authority
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

fn parse_var<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
