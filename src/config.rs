//! Host configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `PORT` - Listen port (default: 8083)
//! - `STOREFRONT_HOST` - Bind address (default: 0.0.0.0)
//! - `STOREFRONT_DATA_DIR` - Directory for persisted cart and wishlist (default: ./data)
//! - `STOREFRONT_SEED` - JSON seed file loaded into the in-memory collaborators
//! - `STOREFRONT_CART_KEY` / `STOREFRONT_WISHLIST_KEY` - Storage keys
//! - `CHECKOUT_PHONE` - Order hand-off destination number
//! - `CHECKOUT_STORE_NAME` - Store name used in the order greeting
//! - `CHECKOUT_CURRENCY_SYMBOL` - Prefix for amounts in the order message

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

use crate::cart_store::StorageKeys;
use crate::checkout::CheckoutConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub seed: Option<PathBuf>,
    pub keys: StorageKeys,
    pub checkout: CheckoutConfig,
}

impl StorefrontConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let host = or("STOREFRONT_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string()))?;
        let port = or("PORT", "8083")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let default_keys = StorageKeys::default();
        let keys = StorageKeys {
            cart: get("STOREFRONT_CART_KEY").unwrap_or(default_keys.cart),
            wishlist: get("STOREFRONT_WISHLIST_KEY").unwrap_or(default_keys.wishlist),
        };
        if keys.cart == keys.wishlist {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_WISHLIST_KEY".to_string(),
                "must differ from the cart key".to_string(),
            ));
        }

        let defaults = CheckoutConfig::default();
        let checkout = CheckoutConfig {
            phone: get("CHECKOUT_PHONE").map(|p| p.trim_start_matches('+').to_string()).unwrap_or_default(),
            store_name: get("CHECKOUT_STORE_NAME").unwrap_or(defaults.store_name),
            currency_symbol: get("CHECKOUT_CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            closing_line: defaults.closing_line,
        };

        Ok(Self {
            host,
            port,
            data_dir: PathBuf::from(or("STOREFRONT_DATA_DIR", "./data")),
            seed: get("STOREFRONT_SEED").map(PathBuf::from),
            keys,
            checkout,
        })
    }

    pub const fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}
