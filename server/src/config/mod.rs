use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::views::FetchPolicy;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:5173";
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5000;
const DEFAULT_FETCH_RETRIES: u32 = 1;
const DEFAULT_FEATURED_EVENTS_LIMIT: usize = 6;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub public_base_url: String,
    pub fetch_timeout: Duration,
    pub fetch_retries: u32,
    pub featured_events_limit: usize,
    pub allowed_origins: String,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: var("DATABASE_URL"),
            bind_addr: parse_or("BIND_ADDR", var("BIND_ADDR"), default_bind_addr())?,
            public_base_url: var("PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            fetch_timeout: Duration::from_millis(parse_or(
                "FETCH_TIMEOUT_MS",
                var("FETCH_TIMEOUT_MS"),
                DEFAULT_FETCH_TIMEOUT_MS,
            )?),
            fetch_retries: parse_or("FETCH_RETRIES", var("FETCH_RETRIES"), DEFAULT_FETCH_RETRIES)?,
            featured_events_limit: parse_or(
                "FEATURED_EVENTS_LIMIT",
                var("FEATURED_EVENTS_LIMIT"),
                DEFAULT_FEATURED_EVENTS_LIMIT,
            )?,
            allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            production: var("RUST_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
        })
    }

    /// Development sign-in mints sessions without credentials, so it is never
    /// served in production.
    pub fn dev_auth(&self) -> bool {
        !self.production
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: self.fetch_timeout,
            retries: self.fetch_retries,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: default_bind_addr(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            fetch_retries: DEFAULT_FETCH_RETRIES,
            featured_events_limit: DEFAULT_FEATURED_EVENTS_LIMIT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
            production: false,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

fn parse_or<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
