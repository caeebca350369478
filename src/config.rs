//! Application configuration.
//!
//! Layered with the `config` crate: built-in defaults, then `config.yaml`,
//! then the file named by `PHARMACY_ORDERS_CONFIG`, then
//! `PHARMACY_ORDERS__SECTION__KEY` environment variables.

use serde::Deserialize;

use crate::domain::inventory::CatalogItem;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "PHARMACY_ORDERS_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "PHARMACY_ORDERS";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub approval: ApprovalConfig,
    pub log: LogConfig,
    pub startup: StartupConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// actix-web worker count; defaults to the number of physical cores.
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Scylla,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub scylla: ScyllaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScyllaConfig {
    pub known_nodes: Vec<String>,
    pub keyspace: String,
    pub replication_factor: u32,
}

impl Default for ScyllaConfig {
    fn default() -> Self {
        Self {
            known_nodes: vec!["127.0.0.1:9042".to_string()],
            keyspace: "pharmacy_ks".to_string(),
            replication_factor: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Include per-item deduction outcomes in the approve response.
    pub report_inventory_outcomes: bool,
    /// Conditional stock writes attempted per item before giving up.
    pub stock_cas_attempts: u32,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            report_inventory_outcomes: false,
            stock_cas_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// EnvFilter directive used when RUST_LOG is not set.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info,pharmacy_orders=debug".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    pub connect_attempts: u32,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self { connect_attempts: 5 }
    }
}

/// Catalog items written at startup, overwriting stored stock.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub seed: Vec<CatalogItem>,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Sources, later overriding earlier:
    /// 1. `config.yaml` in the current directory (if present)
    /// 2. File given by `path` (if provided)
    /// 3. File named by `CONFIG_ENV_VAR` (if set)
    /// 4. Environment variables with the `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("storage.scylla.known_nodes")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
