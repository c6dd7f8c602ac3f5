use std::fmt;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use stowage_storage_core::{StorageError, StorageResult};

/// Client-side timeout applied to every remote call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration fragment for a `seafile` segment.
#[derive(Clone, Deserialize)]
pub struct SeafileConfig {
    /// Account used for the auth-token exchange
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Base URL of the Seafile installation, without `api` / `api2`
    #[serde(default)]
    pub api: String,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for SeafileConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            api: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for SeafileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeafileConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("api", &self.api)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SeafileConfig {
    /// Validate the fragment and return the normalized base URL.
    ///
    /// The returned URL always ends in `/` so API paths resolve beneath it.
    pub fn base_url(&self) -> StorageResult<Url> {
        if self.username.is_empty() || self.password.is_empty() || self.api.is_empty() {
            return Err(StorageError::config(
                "seafile requires username, password and api",
            ));
        }

        let mut url = Url::parse(&self.api)
            .map_err(|e| StorageError::config(format!("invalid seafile api url: {}", e)))?;

        if url
            .path_segments()
            .into_iter()
            .flatten()
            .any(|segment| segment.eq_ignore_ascii_case("api") || segment.eq_ignore_ascii_case("api2"))
        {
            return Err(StorageError::config(
                "provide only the url of the seafile installation, leave off api and api2",
            ));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
