use crate::error::AppError;
use std::{env, fmt::Display, str::FromStr, time::Duration};
use tracing::{info, warn};

pub const DEFAULT_TIMEOUT_SECS: &str = "30";
pub const DEFAULT_RECENT_LIMIT: &str = "10";

/// Connection settings for the hosted backend, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
    pub recent_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            backend_url: require(&var, "BACKEND_URL")?,
            anon_key: require(&var, "BACKEND_ANON_KEY")?,
            access_token: var("BACKEND_ACCESS_TOKEN"),
            request_timeout: Duration::from_secs(try_load(
                &var,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            recent_limit: try_load(&var, "RECENT_LIMIT", DEFAULT_RECENT_LIMIT)?,
        })
    }
}

fn require<F>(var: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    var(key).ok_or_else(|| {
        warn!("Environment variable {key} not found");
        AppError::Config(format!("{key} must be set"))
    })
}

fn try_load<F, T>(var: &F, key: &str, default: &str) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            AppError::Config(format!("invalid {key}: {e}"))
        })
}
