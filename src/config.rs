use crate::domain::Address;
use crate::engine::PricingMode;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub rpc_url: String,
    pub pricing_mode: PricingMode,
    /// Overrides the mainnet comptroller, e.g. for a fork.
    pub comptroller_address: Option<Address>,
    /// JSON-lines event feed; stdin when unset.
    pub events_path: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let rpc_url = env_map
            .get("RPC_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("RPC_URL".to_string()))?;

        let pricing_mode = env_map
            .get("PRICING_MODE")
            .map(|s| s.as_str())
            .unwrap_or("price-aware")
            .parse::<PricingMode>()
            .map_err(|e| ConfigError::InvalidValue("PRICING_MODE".to_string(), e))?;

        let comptroller_address = match env_map.get("COMPTROLLER_ADDRESS").map(|s| s.trim()) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<Address>().map_err(|e| {
                ConfigError::InvalidValue("COMPTROLLER_ADDRESS".to_string(), e.to_string())
            })?),
        };

        let events_path = env_map
            .get("EVENTS_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Config {
            port,
            database_path,
            rpc_url,
            pricing_mode,
            comptroller_address,
            events_path,
        })
    }
}
