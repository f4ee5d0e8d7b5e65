use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use dotenvy::dotenv;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::IN_MEMORY;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub seed_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = match lookup("MENUS_ENV").as_deref() {
            Some("test") => {
                info!("MENUS_ENV is test, using an in-memory store");
                IN_MEMORY.to_string()
            }
            _ => try_load(&lookup, "DATABASE_URL", "data.db")?,
        };

        Ok(Self {
            database_url,
            bind_addr: try_load(&lookup, "BIND_ADDR", "0.0.0.0:3000")?,
            seed_path: lookup("SEED_PATH").map(PathBuf::from),
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        })
}
