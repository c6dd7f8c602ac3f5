use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use stowage_storage_core::{StorageBackend, StorageError, StorageResult};
use stowage_storage_local::{LocalBackend, LocalConfig};
use stowage_storage_seafile::{SeafileBackend, SeafileConfig};
use tracing::info;

use crate::config::{fragment_type, GatewayConfig};
use crate::router::NamespaceRouter;

/// Backend implementations selectable by a `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Seafile,
    Local,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seafile => "seafile",
            Self::Local => "fs",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags are case-sensitive.
impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seafile" => Ok(Self::Seafile),
            "fs" | "filesystem" | "local" => Ok(Self::Local),
            other => Err(StorageError::config(format!("unknown driver {:?}", other))),
        }
    }
}

/// Segment name → backend, filled once at startup.
///
/// Every failure here is a configuration error and aborts startup: there is
/// no mode where some segments are live and others are not.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn StorageBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a backend for every `[path.<segment>]` table.
    pub fn from_config(config: &GatewayConfig) -> StorageResult<Self> {
        let mut registry = Self::new();
        for (segment, fragment) in &config.paths {
            let kind = fragment_type(segment, fragment)?;
            registry.register(segment, kind, fragment.clone())?;
        }
        Ok(registry)
    }

    /// Construct a backend of type `kind` from `fragment` and mount it at `segment`.
    ///
    /// The segment name and its uniqueness are checked before the backend
    /// is constructed.
    pub fn register(
        &mut self,
        segment: &str,
        kind: &str,
        fragment: toml::Value,
    ) -> StorageResult<()> {
        self.check_available(segment)?;
        let kind: BackendKind = kind.parse()?;

        let backend: Arc<dyn StorageBackend> = match kind {
            BackendKind::Seafile => {
                Arc::new(SeafileBackend::new(decode::<SeafileConfig>(segment, fragment)?)?)
            }
            BackendKind::Local => {
                Arc::new(LocalBackend::new(decode::<LocalConfig>(segment, fragment)?)?)
            }
        };

        info!("Configured {} backend for /{}", kind, segment);
        self.backends.insert(segment.to_string(), backend);
        Ok(())
    }

    /// Mount an already constructed backend.
    pub fn insert(&mut self, segment: &str, backend: Arc<dyn StorageBackend>) -> StorageResult<()> {
        self.check_available(segment)?;
        self.backends.insert(segment.to_string(), backend);
        Ok(())
    }

    /// Registered segment names, sorted.
    pub fn segments(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn into_router(self) -> NamespaceRouter {
        NamespaceRouter::new(self.backends)
    }

    fn check_available(&self, segment: &str) -> StorageResult<()> {
        if segment.is_empty() || segment.contains('/') {
            return Err(StorageError::config(format!(
                "invalid path name {:?}: must be non-empty and contain no '/'",
                segment
            )));
        }
        if self.backends.contains_key(segment) {
            return Err(StorageError::config(format!(
                "paths must be unique {:?} is already used",
                segment
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("segments", &self.segments())
            .finish()
    }
}

fn decode<T: DeserializeOwned>(segment: &str, fragment: toml::Value) -> StorageResult<T> {
    fragment
        .try_into()
        .map_err(|e| StorageError::config(format!("path.{}: {}", segment, e)))
}
