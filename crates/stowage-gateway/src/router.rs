use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use stowage_storage_core::path::{is_root, split_segment};
use stowage_storage_core::{
    ByteStream, EntryMetadata, ProtocolDriver, StorageBackend, StorageError, StorageResult,
    Visitor,
};
use tokio::io::AsyncRead;
use tracing::{debug, instrument};

const NOT_WRITABLE: &str = "virtual namespace is not writable";

/// Single virtual root whose children are the configured segments.
///
/// `/docs/reports/q1.csv` goes to the backend registered as `docs` with the
/// remainder `/reports/q1.csv`. The root and the bare segment names are
/// synthesized here and never reach a backend. The segment map is fixed at
/// construction and read without locking.
pub struct NamespaceRouter {
    backends: HashMap<String, Arc<dyn StorageBackend>>,
}

impl NamespaceRouter {
    pub(crate) fn new(backends: HashMap<String, Arc<dyn StorageBackend>>) -> Self {
        Self { backends }
    }

    /// Registered segment names, in map order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    fn backend(&self, segment: &str) -> StorageResult<&Arc<dyn StorageBackend>> {
        self.backends
            .get(segment)
            .ok_or_else(|| StorageError::not_found(format!("no path configured with name {}", segment)))
    }

    fn rejected(operation: &str, path: &str) -> StorageError {
        debug!("Rejected {} on {}", operation, path);
        StorageError::permission_denied(format!("{} is not supported", operation))
    }
}

impl std::fmt::Debug for NamespaceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut segments: Vec<_> = self.segments().collect();
        segments.sort_unstable();
        f.debug_struct("NamespaceRouter")
            .field("segments", &segments)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for NamespaceRouter {
    #[instrument(skip(self), level = "debug")]
    async fn stat(&self, path: &str) -> StorageResult<EntryMetadata> {
        let (segment, remainder) = split_segment(path);
        if segment.is_empty() {
            return Ok(EntryMetadata::synthetic_dir("/"));
        }

        let backend = self.backend(segment)?;
        if is_root(remainder) {
            return Ok(EntryMetadata::synthetic_dir(segment));
        }
        backend.stat(remainder).await
    }

    #[instrument(skip(self, visit), level = "debug")]
    async fn list_directory(&self, path: &str, visit: &mut Visitor<'_>) -> StorageResult<()> {
        let (segment, remainder) = split_segment(path);
        if segment.is_empty() {
            for name in self.segments() {
                visit(EntryMetadata::synthetic_dir(name))?;
            }
            return Ok(());
        }

        self.backend(segment)?.list_directory(remainder, visit).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_directory(&self, path: &str) -> StorageResult<()> {
        let (segment, remainder) = split_segment(path);
        if segment.is_empty() {
            return Err(StorageError::permission_denied(NOT_WRITABLE));
        }

        self.backend(segment)?.create_directory(remainder).await
    }

    #[instrument(skip(self, content), level = "debug")]
    async fn write_file(
        &self,
        path: &str,
        content: &mut ByteStream<'_>,
        append: bool,
    ) -> StorageResult<u64> {
        let (segment, remainder) = split_segment(path);
        if segment.is_empty() || is_root(remainder) {
            return Err(StorageError::permission_denied(NOT_WRITABLE));
        }

        self.backend(segment)?
            .write_file(remainder, content, append)
            .await
    }
}

/// Delete, rename and download are refused for every path.
#[async_trait]
impl ProtocolDriver for NamespaceRouter {
    async fn delete_directory(&self, path: &str) -> StorageResult<()> {
        Err(Self::rejected("delete directory", path))
    }

    async fn delete_file(&self, path: &str) -> StorageResult<()> {
        Err(Self::rejected("delete file", path))
    }

    async fn rename(&self, from: &str, _to: &str) -> StorageResult<()> {
        Err(Self::rejected("rename", from))
    }

    async fn read_file(
        &self,
        path: &str,
        _offset: u64,
    ) -> StorageResult<(u64, Box<dyn AsyncRead + Send + Unpin>)> {
        Err(Self::rejected("download", path))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use tokio::io::AsyncReadExt;

    use super::*;

    /// Backend that records every call it receives.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingBackend {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StorageBackend for RecordingBackend {
        async fn stat(&self, path: &str) -> StorageResult<EntryMetadata> {
            self.record(format!("stat {}", path));
            Ok(EntryMetadata {
                size: 42,
                is_dir: false,
                ..EntryMetadata::synthetic_dir("q1.csv")
            })
        }

        async fn list_directory(&self, path: &str, visit: &mut Visitor<'_>) -> StorageResult<()> {
            self.record(format!("list {}", path));
            visit(EntryMetadata::synthetic_dir("reports"))
        }

        async fn create_directory(&self, path: &str) -> StorageResult<()> {
            self.record(format!("mkdir {}", path));
            Ok(())
        }

        async fn write_file(
            &self,
            path: &str,
            content: &mut ByteStream<'_>,
            append: bool,
        ) -> StorageResult<u64> {
            let mut buf = Vec::new();
            content.read_to_end(&mut buf).await?;
            self.record(format!("put {} {} {}", path, buf.len(), append));
            Ok(buf.len() as u64)
        }
    }

    fn router() -> (NamespaceRouter, Arc<RecordingBackend>, Arc<RecordingBackend>) {
        let docs = Arc::new(RecordingBackend::default());
        let cloud = Arc::new(RecordingBackend::default());
        let mut backends: HashMap<String, Arc<dyn StorageBackend>> = HashMap::new();
        backends.insert("docs".to_string(), docs.clone());
        backends.insert("cloud".to_string(), cloud.clone());
        (NamespaceRouter::new(backends), docs, cloud)
    }

    #[tokio::test]
    async fn test_stat_root_and_segments_are_synthetic() {
        let (router, docs, cloud) = router();

        for root in ["/", "", "//"] {
            let entry = router.stat(root).await.unwrap();
            assert_eq!(entry.name, "/");
            assert!(entry.is_dir);
        }

        let entry = router.stat("/docs").await.unwrap();
        assert_eq!(entry, EntryMetadata::synthetic_dir("docs"));
        let entry = router.stat("/cloud/").await.unwrap();
        assert_eq!(entry.name, "cloud");

        assert!(docs.calls().is_empty());
        assert!(cloud.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stat_forwards_remainder() {
        let (router, docs, cloud) = router();

        let entry = router.stat("/docs/reports/q1.csv").await.unwrap();
        assert_eq!(entry.size, 42);
        assert_eq!(docs.calls(), vec!["stat /reports/q1.csv"]);
        assert!(cloud.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_segment_not_found() {
        let (router, _, _) = router();

        assert!(router.stat("/photos").await.unwrap_err().is_not_found());
        assert!(router.stat("/photos/a.jpg").await.unwrap_err().is_not_found());
        assert!(router.read_directory("/photos").await.unwrap_err().is_not_found());
        assert!(router.create_directory("/photos/x").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_root_yields_segments() {
        let (router, docs, cloud) = router();

        let names: HashSet<_> = router
            .read_directory("/")
            .await
            .unwrap()
            .into_iter()
            .map(|e| {
                assert!(e.is_dir);
                e.name
            })
            .collect();
        assert_eq!(names, HashSet::from(["docs".to_string(), "cloud".to_string()]));
        assert!(docs.calls().is_empty());
        assert!(cloud.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_root_stops_on_visitor_error() {
        let (router, _, _) = router();

        let mut visited = 0;
        let err = router
            .list_directory("/", &mut |_entry| {
                visited += 1;
                Err(StorageError::not_found("stop"))
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(visited, 1);
    }

    #[tokio::test]
    async fn test_list_segment_forwards() {
        let (router, docs, cloud) = router();

        let entries = router.read_directory("/cloud").await.unwrap();
        assert_eq!(entries[0].name, "reports");
        assert_eq!(cloud.calls(), vec!["list /"]);

        router.read_directory("/docs/reports/").await.unwrap();
        assert_eq!(docs.calls(), vec!["list /reports"]);
    }

    #[tokio::test]
    async fn test_root_writes_rejected() {
        let (router, docs, cloud) = router();

        let mut content: &[u8] = b"data";
        let err = router.write_file("/", &mut content, false).await.unwrap_err();
        assert!(err.is_permission_denied());
        assert!(err.to_string().contains(NOT_WRITABLE));

        let err = router.write_file("/docs", &mut content, false).await.unwrap_err();
        assert!(err.is_permission_denied());

        let err = router.create_directory("/").await.unwrap_err();
        assert!(err.is_permission_denied());

        assert!(docs.calls().is_empty());
        assert!(cloud.calls().is_empty());
    }

    #[tokio::test]
    async fn test_writes_forward_below_segment() {
        let (router, docs, _) = router();

        let mut content: &[u8] = b"hello";
        let written = router
            .write_file("/docs/inbox/scan.pdf", &mut content, true)
            .await
            .unwrap();
        assert_eq!(written, 5);

        router.create_directory("/docs/inbox").await.unwrap();
        assert_eq!(
            docs.calls(),
            vec!["put /inbox/scan.pdf 5 true", "mkdir /inbox"]
        );
    }

    #[tokio::test]
    async fn test_destructive_operations_rejected() {
        let (router, docs, cloud) = router();

        assert!(router
            .delete_file("/docs/a.txt")
            .await
            .unwrap_err()
            .is_permission_denied());
        assert!(router
            .delete_directory("/docs/reports")
            .await
            .unwrap_err()
            .is_permission_denied());
        assert!(router
            .rename("/docs/a.txt", "/docs/b.txt")
            .await
            .unwrap_err()
            .is_permission_denied());
        assert!(router
            .read_file("/docs/a.txt", 0)
            .await
            .err()
            .unwrap()
            .is_permission_denied());
        assert!(router.delete_file("/").await.unwrap_err().is_permission_denied());

        assert!(docs.calls().is_empty());
        assert!(cloud.calls().is_empty());
    }
}
