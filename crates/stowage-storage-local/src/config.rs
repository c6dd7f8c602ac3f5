use std::path::PathBuf;

use serde::Deserialize;

/// Configuration fragment for a `fs` / `filesystem` / `local` segment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalConfig {
    /// Directory the segment is rooted at
    #[serde(default)]
    pub root: PathBuf,
}
