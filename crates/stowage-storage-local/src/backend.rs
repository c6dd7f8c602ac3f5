use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stowage_storage_core::path::{base_name, is_root};
use stowage_storage_core::{
    ByteStream, EntryMetadata, StorageBackend, StorageError, StorageResult, Visitor,
};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::config::LocalConfig;

/// Local filesystem backend.
///
/// All operations are relative to `root`: with a root of `/srv/docs`,
/// `stat("/reports/q1.csv")` looks at `/srv/docs/reports/q1.csv`.
/// `..` components that would climb above the root are rejected.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend from its configuration fragment.
    ///
    /// The root must be set and must be an existing directory.
    pub fn new(config: LocalConfig) -> StorageResult<Self> {
        if config.root.as_os_str().is_empty() {
            return Err(StorageError::config("root path is required"));
        }

        let meta = std::fs::metadata(&config.root).map_err(|e| {
            StorageError::config(format!("root path {}: {}", config.root.display(), e))
        })?;
        if !meta.is_dir() {
            return Err(StorageError::config(format!(
                "root path {} must be a directory",
                config.root.display()
            )));
        }

        let root = config.root.canonicalize().unwrap_or(config.root);
        debug!("Local backend rooted at {}", root.display());
        Ok(Self { root })
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a backend-relative path onto the host filesystem.
    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    if depth == 0 {
                        return Err(StorageError::permission_denied(format!(
                            "{} escapes the backend root",
                            path
                        )));
                    }
                    resolved.pop();
                    depth -= 1;
                }
                name => {
                    resolved.push(name);
                    depth += 1;
                }
            }
        }
        Ok(resolved)
    }
}

fn io_error(path: &str, e: io::Error) -> StorageError {
    if e.kind() == io::ErrorKind::NotFound {
        StorageError::not_found(path.to_string())
    } else {
        StorageError::Io(e)
    }
}

fn entry_name(path: &str) -> String {
    if is_root(path) {
        "/".to_string()
    } else {
        base_name(path).to_string()
    }
}

#[cfg(unix)]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, true) => 0o555,
        (true, false) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

/// Owner and group names, falling back to the numeric ids when a lookup fails.
#[cfg(unix)]
fn ownership_of(meta: &std::fs::Metadata) -> (Option<String>, Option<String>) {
    use std::os::unix::fs::MetadataExt;
    (Some(user_name(meta.uid())), Some(group_name(meta.gid())))
}

#[cfg(unix)]
fn user_name(uid: u32) -> String {
    use nix::unistd::{Uid, User};
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    }
}

#[cfg(unix)]
fn group_name(gid: u32) -> String {
    use nix::unistd::{Gid, Group};
    match Group::from_gid(Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    }
}

#[cfg(not(unix))]
fn ownership_of(_meta: &std::fs::Metadata) -> (Option<String>, Option<String>) {
    (None, None)
}

fn entry_from_metadata(name: String, meta: &std::fs::Metadata) -> EntryMetadata {
    let (owner, group) = ownership_of(meta);
    let is_dir = meta.is_dir();
    EntryMetadata {
        name,
        size: if is_dir { 0 } else { meta.len() },
        mode: mode_of(meta),
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
        is_dir,
        owner,
        group,
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    #[instrument(skip(self), level = "debug")]
    async fn stat(&self, path: &str) -> StorageResult<EntryMetadata> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).await.map_err(|e| io_error(path, e))?;
        Ok(entry_from_metadata(entry_name(path), &meta))
    }

    #[instrument(skip(self, visit), level = "debug")]
    async fn list_directory(&self, path: &str, visit: &mut Visitor<'_>) -> StorageResult<()> {
        let full = self.resolve(path)?;
        let mut read_dir = fs::read_dir(&full).await.map_err(|e| io_error(path, e))?;

        while let Some(entry) = read_dir.next_entry().await? {
            let meta = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().to_string();
            visit(entry_from_metadata(name, &meta))?;
        }

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_directory(&self, path: &str) -> StorageResult<()> {
        let full = self.resolve(path)?;
        fs::create_dir_all(&full).await.map_err(|e| io_error(path, e))?;
        debug!("Created directory {}", full.display());
        Ok(())
    }

    #[instrument(skip(self, content), level = "debug")]
    async fn write_file(
        &self,
        path: &str,
        content: &mut ByteStream<'_>,
        append: bool,
    ) -> StorageResult<u64> {
        if is_root(path) {
            return Err(StorageError::invalid_path(format!(
                "{} is a directory, not a file",
                path
            )));
        }
        let full = self.resolve(path)?;

        if let Ok(meta) = fs::metadata(&full).await {
            if meta.is_dir() {
                return Err(StorageError::invalid_path(format!(
                    "a directory already exists at {}",
                    path
                )));
            }
        }

        let mut file = if append {
            fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&full)
                .await
        } else {
            fs::File::create(&full).await
        }
        .map_err(|e| io_error(path, e))?;

        let written = tokio::io::copy(content, &mut file).await?;
        file.flush().await?;

        debug!(
            "Wrote {} bytes to {} (append={})",
            written,
            full.display(),
            append
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (LocalBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(LocalConfig {
            root: temp_dir.path().to_path_buf(),
        })
        .unwrap();
        (backend, temp_dir)
    }

    #[test]
    fn test_root_is_required() {
        let err = LocalBackend::new(LocalConfig::default()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_root_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let err = LocalBackend::new(LocalConfig {
            root: temp_dir.path().join("missing"),
        })
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        let err = LocalBackend::new(LocalConfig { root: file }).unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_write_then_stat_and_list() {
        let (backend, temp_dir) = setup();

        let mut data: &[u8] = b"scanned page";
        let written = backend
            .write_file("/scan.pdf", &mut data, false)
            .await
            .unwrap();
        assert_eq!(written, 12);
        assert_eq!(
            std::fs::read(temp_dir.path().join("scan.pdf")).unwrap(),
            b"scanned page"
        );

        let entry = backend.stat("/scan.pdf").await.unwrap();
        assert_eq!(entry.name, "scan.pdf");
        assert_eq!(entry.size, 12);
        assert!(!entry.is_dir);
        assert!(entry.modified.is_some());

        let names: Vec<_> = backend
            .read_directory("/")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["scan.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_append_extends_file() {
        let (backend, temp_dir) = setup();

        let mut first: &[u8] = b"hello ";
        backend.write_file("/log.txt", &mut first, false).await.unwrap();
        let mut second: &[u8] = b"world";
        let written = backend.write_file("/log.txt", &mut second, true).await.unwrap();
        assert_eq!(written, 5);

        assert_eq!(
            std::fs::read(temp_dir.path().join("log.txt")).unwrap(),
            b"hello world"
        );
    }

    #[tokio::test]
    async fn test_overwrite_truncates() {
        let (backend, temp_dir) = setup();

        let mut long: &[u8] = b"a much longer body";
        backend.write_file("/f.txt", &mut long, false).await.unwrap();
        let mut short: &[u8] = b"short";
        backend.write_file("/f.txt", &mut short, false).await.unwrap();

        assert_eq!(std::fs::read(temp_dir.path().join("f.txt")).unwrap(), b"short");
    }

    #[tokio::test]
    async fn test_create_directory_nested() {
        let (backend, temp_dir) = setup();

        backend.create_directory("/a/b/c").await.unwrap();
        assert!(temp_dir.path().join("a/b/c").is_dir());

        let entry = backend.stat("/a/b").await.unwrap();
        assert!(entry.is_dir);
        assert_eq!(entry.name, "b");
    }

    #[tokio::test]
    async fn test_write_over_directory_rejected() {
        let (backend, _temp_dir) = setup();
        backend.create_directory("/inbox").await.unwrap();

        let mut data: &[u8] = b"x";
        let err = backend.write_file("/inbox", &mut data, false).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_stat_missing_is_not_found() {
        let (backend, _temp_dir) = setup();
        let err = backend.stat("/nope.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_escape_rejected() {
        let (backend, _temp_dir) = setup();

        let err = backend.stat("/../etc/passwd").await.unwrap_err();
        assert!(err.is_permission_denied());

        let mut data: &[u8] = b"x";
        let err = backend
            .write_file("/a/../../outside.txt", &mut data, false)
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_visitor_error_stops_listing() {
        let (backend, _temp_dir) = setup();
        for name in ["one", "two", "three"] {
            let mut data: &[u8] = b"x";
            backend
                .write_file(&format!("/{}", name), &mut data, false)
                .await
                .unwrap();
        }

        let mut seen = 0;
        let err = backend
            .list_directory("/", &mut |_entry| {
                seen += 1;
                Err(StorageError::permission_denied("stop"))
            })
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_root_is_canonicalized() {
        let temp_dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(LocalConfig {
            root: temp_dir.path().join("."),
        })
        .unwrap();
        assert_eq!(backend.root(), temp_dir.path().canonicalize().unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_owner_and_group_resolve_to_names() {
        use nix::unistd::{getgid, getuid};

        let (backend, _temp_dir) = setup();
        let mut data: &[u8] = b"x";
        backend.write_file("/mine.txt", &mut data, false).await.unwrap();

        let entry = backend.stat("/mine.txt").await.unwrap();
        assert_eq!(entry.owner, Some(user_name(getuid().as_raw())));
        assert_eq!(entry.group, Some(group_name(getgid().as_raw())));
    }

    #[cfg(unix)]
    #[test]
    fn test_unknown_ids_fall_back_to_numbers() {
        assert_eq!(user_name(3_999_999_999), "3999999999");
        assert_eq!(group_name(3_999_999_999), "3999999999");
    }

    #[tokio::test]
    async fn test_stat_root() {
        let (backend, _temp_dir) = setup();
        let entry = backend.stat("/").await.unwrap();
        assert_eq!(entry.name, "/");
        assert!(entry.is_dir);
    }
}
