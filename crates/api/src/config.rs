//! Process configuration read from the environment.
//!
//! | variable                | default        |
//! |-------------------------|----------------|
//! | `SHOPKEEP_BIND_ADDR`    | `0.0.0.0:8080` |
//! | `SHOPKEEP_CATALOG_PATH` | unset          |
//!
//! `RUST_LOG` and `SHOPKEEP_LOG_FORMAT` are read by `shopkeep-observability`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use shopkeep_catalog::{Product, ProductId};
use shopkeep_core::{AggregateId, DomainError, Money};

pub const BIND_ADDR_ENV: &str = "SHOPKEEP_BIND_ADDR";
pub const CATALOG_PATH_ENV: &str = "SHOPKEEP_CATALOG_PATH";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid SHOPKEEP_BIND_ADDR '{value}': {reason}")]
    InvalidBindAddr { value: String, reason: String },

    #[error("failed to read catalog seed {}: {source}", .path.display())]
    ReadCatalog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog seed {}: {source}", .path.display())]
    ParseCatalog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid product in catalog seed: {0}")]
    InvalidProduct(#[from] DomainError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub catalog_path: Option<PathBuf>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_addr = lookup(BIND_ADDR_ENV).unwrap_or_else(|| {
            warn!("{BIND_ADDR_ENV} not set; using {DEFAULT_BIND_ADDR}");
            DEFAULT_BIND_ADDR.to_string()
        });
        let bind_addr = raw_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidBindAddr {
                value: raw_addr.clone(),
                reason: e.to_string(),
            })?;

        let catalog_path = lookup(CATALOG_PATH_ENV)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bind_addr,
            catalog_path,
        })
    }
}

/// One product in a JSON catalog seed file (a top-level array).
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSeed {
    pub id: Option<ProductId>,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub promotional_price: Option<Money>,
    #[serde(default)]
    pub stock: i64,
}

impl ProductSeed {
    pub fn into_product(self) -> Result<Product, DomainError> {
        let id = self
            .id
            .unwrap_or_else(|| ProductId::new(AggregateId::new()));
        Product::new(id, self.name, self.price, self.promotional_price, self.stock)
    }
}

pub fn load_catalog_seed(path: &Path) -> Result<Vec<Product>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadCatalog {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog_seed(&raw).map_err(|err| match err {
        ConfigError::ParseCatalog { source, .. } => ConfigError::ParseCatalog {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

pub fn parse_catalog_seed(raw: &str) -> Result<Vec<Product>, ConfigError> {
    let seeds: Vec<ProductSeed> =
        serde_json::from_str(raw).map_err(|source| ConfigError::ParseCatalog {
            path: PathBuf::new(),
            source,
        })?;
    seeds
        .into_iter()
        .map(|s| s.into_product().map_err(ConfigError::from))
        .collect()
}
