use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use stowage_storage_core::{StorageError, StorageResult};
use tracing::debug;

/// Gateway configuration file.
///
/// Only the `[path.<segment>]` tables are read here. Any other top-level key
/// (listen address, protocol credentials, ...) belongs to the protocol
/// engine and is ignored.
///
/// ```toml
/// [path.docs]
/// type = "fs"
/// root = "/srv/docs"
///
/// [path.cloud]
/// type = "seafile"
/// api = "https://cloud.example.com"
/// username = "scanner"
/// password = "scanme"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Segment name → backend fragment (including its `type` key)
    #[serde(rename = "path", default)]
    pub paths: BTreeMap<String, toml::Value>,
}

impl GatewayConfig {
    pub fn from_toml_str(content: &str) -> StorageResult<Self> {
        toml::from_str(content)
            .map_err(|e| StorageError::config(format!("invalid configuration: {}", e)))
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorageError::config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            StorageError::config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        debug!(
            "Loaded {} path entries from {}",
            config.paths.len(),
            path.display()
        );
        Ok(config)
    }
}

/// Backend type tag of one `[path.<segment>]` table.
pub fn fragment_type<'a>(segment: &str, fragment: &'a toml::Value) -> StorageResult<&'a str> {
    let table = fragment
        .as_table()
        .ok_or_else(|| StorageError::config(format!("path.{} must be a table", segment)))?;

    table
        .get("type")
        .and_then(toml::Value::as_str)
        .ok_or_else(|| StorageError::config(format!("path.{} is missing a type", segment)))
}
