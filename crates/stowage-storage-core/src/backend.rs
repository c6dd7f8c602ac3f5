use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::StorageResult;
use crate::metadata::EntryMetadata;

/// Callback receiving directory entries one at a time.
///
/// Returning an error stops the listing and the error is propagated
/// unchanged to the caller of `list_directory`.
pub type Visitor<'a> = dyn FnMut(EntryMetadata) -> StorageResult<()> + Send + 'a;

/// File content handed to `write_file`.
pub type ByteStream<'a> = dyn AsyncRead + Send + Unpin + 'a;

/// Capability set every storage backend implements.
///
/// Paths are relative to the backend's own root and always start with `/`.
/// There is no delete, rename, read or chmod; the router rejects those.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Describe one node.
    async fn stat(&self, path: &str) -> StorageResult<EntryMetadata>;

    /// Stream the children of a directory to `visit`.
    async fn list_directory(&self, path: &str, visit: &mut Visitor<'_>) -> StorageResult<()>;

    /// Create a directory.
    async fn create_directory(&self, path: &str) -> StorageResult<()>;

    /// Store `content` at `path`.
    ///
    /// Returns the number of bytes consumed from `content`.
    async fn write_file(
        &self,
        path: &str,
        content: &mut ByteStream<'_>,
        append: bool,
    ) -> StorageResult<u64>;

    /// Collect a whole listing.
    async fn read_directory(&self, path: &str) -> StorageResult<Vec<EntryMetadata>> {
        let mut entries = Vec::new();
        self.list_directory(path, &mut |entry| {
            entries.push(entry);
            Ok(())
        })
        .await?;
        Ok(entries)
    }
}

/// Full operation set a file-transfer protocol engine invokes per client command.
///
/// The engine holds an `Arc<dyn ProtocolDriver>`; implementors decide which
/// operations are honoured.
#[async_trait]
pub trait ProtocolDriver: StorageBackend {
    async fn delete_directory(&self, path: &str) -> StorageResult<()>;

    async fn delete_file(&self, path: &str) -> StorageResult<()>;

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Open a file for download starting at `offset`.
    ///
    /// Returns the total size and a reader over the content.
    async fn read_file(
        &self,
        path: &str,
        offset: u64,
    ) -> StorageResult<(u64, Box<dyn AsyncRead + Send + Unpin>)>;
}
