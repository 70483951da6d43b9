use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Bounded time for opening the store session, URI resolution included.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Bounded time for the startup liveness probe.
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Headroom between the store deadline and the request timeout, so a stalled
/// store call ends as a store error before the timeout middleware fires.
pub const STORE_DEADLINE_MARGIN: Duration = Duration::from_millis(500);

const DEFAULT_DATABASE: &str = "app-db";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub store: StoreConfig,
    /// Applied by the timeout middleware to the whole request.
    pub request_timeout: Duration,
    /// Deadline for every store operation issued by a handler. Always
    /// shorter than `request_timeout`.
    pub store_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl GatewayConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Resolve gateway settings on top of `common` using `lookup` for the
    /// plain (unprefixed) variables.
    pub fn from_lookup<F>(mut common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = non_empty(&lookup, "PORT") {
            common.port = port.trim().parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("PORT must be a valid port: {}", e))
            })?;
        }

        let uri = non_empty(&lookup, "MONGO_URI").ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("please specify MONGO_URI"))
        })?;

        let database =
            non_empty(&lookup, "MONGO_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let backend = match non_empty(&lookup, "STORE_BACKEND") {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            None => StoreBackend::Mongo,
        };

        let request_timeout = match non_empty(&lookup, "REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "REQUEST_TIMEOUT_SECS must be a whole number of seconds: {}",
                        e
                    ))
                })?;
                if secs == 0 {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "REQUEST_TIMEOUT_SECS must be greater than zero"
                    )));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(GatewayConfig {
            common,
            mongodb: MongoConfig { uri, database },
            store: StoreConfig { backend },
            request_timeout,
            store_timeout: request_timeout.saturating_sub(STORE_DEADLINE_MARGIN),
        })
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}
