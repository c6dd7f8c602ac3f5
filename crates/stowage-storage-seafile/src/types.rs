//! Seafile REST API response shapes.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use stowage_storage_core::{mode_from_permission, EntryMetadata};

/// A library (repository) as listed by `GET api2/repos`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub size: i64,
    /// Last modification (Unix seconds)
    #[serde(default)]
    pub mtime: i64,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub share_from_name: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
}

impl Library {
    pub fn to_metadata(&self) -> EntryMetadata {
        let owner = self
            .owner_name
            .clone()
            .filter(|o| !o.is_empty())
            .or_else(|| self.share_from_name.clone())
            .filter(|o| !o.is_empty());

        EntryMetadata {
            name: self.name.clone(),
            size: self.size.max(0) as u64,
            mode: mode_from_permission(&self.permission),
            modified: DateTime::from_timestamp(self.mtime, 0),
            is_dir: true,
            owner,
            group: None,
        }
    }
}

/// One child as listed by `GET api2/repos/{id}/dir/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryEntry {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// `"dir"` or `"file"`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub mtime: i64,
    #[serde(default)]
    pub modifier_name: Option<String>,
}

impl DirectoryEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }

    pub fn to_metadata(&self) -> EntryMetadata {
        EntryMetadata {
            name: self.name.clone(),
            size: self.size.max(0) as u64,
            mode: mode_from_permission(&self.permission),
            modified: DateTime::from_timestamp(self.mtime, 0),
            is_dir: self.is_dir(),
            owner: self.modifier_name.clone().filter(|m| !m.is_empty()),
            group: None,
        }
    }
}

/// Single-directory resolution from `GET api/v2.1/repos/{id}/dir/detail/`.
///
/// Carries no size or permission data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryDetail {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub repo_id: String,
    pub name: String,
    #[serde(default)]
    pub mtime: Option<DateTime<Utc>>,
}

impl DirectoryDetail {
    pub fn to_metadata(&self) -> EntryMetadata {
        EntryMetadata {
            name: self.name.clone(),
            size: 0,
            mode: 0o777,
            modified: self.mtime,
            is_dir: true,
            owner: None,
            group: None,
        }
    }
}

/// Response of `POST api2/auth-token/`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub token: String,
}
