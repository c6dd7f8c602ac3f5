use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::SinkExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method, RequestBuilder, StatusCode};
use stowage_storage_core::path::{base_name, is_root, parent_dir, split_leading};
use stowage_storage_core::{
    ByteStream, EntryMetadata, StorageBackend, StorageError, StorageResult, Visitor,
};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument, warn};

use crate::client::{execute, send_json, status_error, with_token, ApiClient};
use crate::config::SeafileConfig;
use crate::index::{IndexCell, LibraryIndex};
use crate::session::{Credentials, Session};
use crate::types::{DirectoryDetail, DirectoryEntry, Library};

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
const UPLOAD_QUEUE_DEPTH: usize = 4;

/// Seafile storage backend.
///
/// Top-level directories are the account's libraries; everything below is
/// addressed inside the owning library. Holds one HTTP client, one login
/// session and one library index for the life of the process.
pub struct SeafileBackend {
    api: ApiClient,
    session: Session,
    index: IndexCell,
}

impl std::fmt::Debug for SeafileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeafileBackend")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl SeafileBackend {
    /// Create a backend from its configuration fragment.
    ///
    /// No network traffic happens here; the first operation logs in.
    pub fn new(config: SeafileConfig) -> StorageResult<Self> {
        let base_url = config.base_url()?;
        let api = ApiClient::new(base_url, config.timeout())?;
        let session = Session::new(
            api.clone(),
            Credentials {
                username: config.username,
                password: config.password,
            },
        );

        Ok(Self {
            api,
            session,
            index: IndexCell::default(),
        })
    }

    /// Build a request carrying the session token, logging in first if needed.
    async fn authorized(&self, method: Method, path: &str) -> StorageResult<RequestBuilder> {
        let url = self.api.resolve(path)?;
        let token = self.session.token().await?;
        Ok(with_token(self.api.request(method, url), &token))
    }

    /// Fetch every library and swap in a fresh index.
    async fn refresh_libraries(&self) -> StorageResult<Arc<LibraryIndex>> {
        let request = self.authorized(Method::GET, "api2/repos").await?;
        let libraries: Vec<Library> =
            send_json(request, &[StatusCode::OK], "list libraries").await?;

        let index = self.index.replace(LibraryIndex::build(libraries));
        info!("Library index rebuilt ({} libraries)", index.len());
        Ok(index)
    }

    /// Resolve a library by name, refreshing the index once on a miss.
    async fn library(&self, name: &str) -> StorageResult<Library> {
        if let Some(lib) = self.index.snapshot().get(name) {
            return Ok(lib.clone());
        }

        debug!("Library {} not in index, refreshing", name);
        self.refresh_libraries()
            .await?
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("library {}", name)))
    }

    async fn directory_detail(
        &self,
        library_id: &str,
        path: &str,
    ) -> StorageResult<DirectoryDetail> {
        let request = self
            .authorized(
                Method::GET,
                &format!("api/v2.1/repos/{}/dir/detail/", library_id),
            )
            .await?
            .query(&[("path", path)]);
        send_json(request, &[StatusCode::OK], "directory detail").await
    }

    async fn directory_entries(
        &self,
        library_id: &str,
        path: &str,
    ) -> StorageResult<Vec<DirectoryEntry>> {
        let request = self
            .authorized(Method::GET, &format!("api2/repos/{}/dir/", library_id))
            .await?
            .query(&[("p", path)]);
        send_json(request, &[StatusCode::OK], "list directory").await
    }

    async fn make_directory(&self, library_id: &str, path: &str) -> StorageResult<()> {
        let request = self
            .authorized(Method::POST, &format!("api2/repos/{}/dir/", library_id))
            .await?
            .query(&[("p", path)])
            .form(&[("operation", "mkdir")]);
        let _: serde_json::Value =
            send_json(request, &[StatusCode::CREATED], "create directory").await?;
        Ok(())
    }

    async fn upload_link(&self, library_id: &str, parent: &str) -> StorageResult<String> {
        let request = self
            .authorized(
                Method::GET,
                &format!("api2/repos/{}/upload-link/", library_id),
            )
            .await?
            .query(&[("p", parent)]);
        send_json(request, &[StatusCode::OK], "request upload link").await
    }

    /// Post `content` to an upload link, streaming it as the multipart `file` part.
    ///
    /// Returns the number of bytes read from `content`.
    async fn upload(
        &self,
        link: &str,
        parent: &str,
        file_name: &str,
        content: &mut ByteStream<'_>,
    ) -> StorageResult<u64> {
        let mut url = self.api.resolve(link)?;
        url.query_pairs_mut().append_pair("ret-json", "1");

        let (chunks, body) = mpsc::channel::<io::Result<Vec<u8>>>(UPLOAD_QUEUE_DEPTH);
        let form = Form::new()
            .part(
                "file",
                Part::stream(Body::wrap_stream(body)).file_name(file_name.to_string()),
            )
            .text("parent_dir", parent.to_string());

        let token = self.session.token().await?;
        let request = with_token(self.api.request(Method::POST, url), &token).multipart(form);

        let (copied, response) = tokio::join!(feed(content, chunks), execute(request, "upload"));
        let copied = copied?;
        let status = response?.status();
        if !status.is_success() {
            return Err(status_error("upload", status));
        }
        Ok(copied)
    }
}

/// Copy `content` into the upload body channel chunk by chunk.
///
/// Stops early without error when the request side has gone away; the
/// response then decides the outcome.
async fn feed(
    content: &mut ByteStream<'_>,
    mut chunks: mpsc::Sender<io::Result<Vec<u8>>>,
) -> StorageResult<u64> {
    let mut copied = 0u64;
    loop {
        let mut chunk = vec![0u8; UPLOAD_CHUNK_SIZE];
        let n = match content.read(&mut chunk).await {
            Ok(n) => n,
            Err(e) => {
                let _ = chunks.send(Err(io::Error::new(e.kind(), e.to_string()))).await;
                return Err(StorageError::Io(e));
            }
        };
        if n == 0 {
            return Ok(copied);
        }

        chunk.truncate(n);
        copied += n as u64;
        if chunks.send(Ok(chunk)).await.is_err() {
            return Ok(copied);
        }
    }
}

#[async_trait]
impl StorageBackend for SeafileBackend {
    #[instrument(skip(self), level = "debug")]
    async fn stat(&self, path: &str) -> StorageResult<EntryMetadata> {
        if is_root(path) {
            return Ok(EntryMetadata::synthetic_dir("/"));
        }

        let (library_name, sub_path) = split_leading(path);
        let lib = self.library(library_name).await?;
        if is_root(sub_path) {
            return Ok(lib.to_metadata());
        }

        // Only directories resolve here; files come back directory-shaped.
        let detail = self.directory_detail(&lib.id, sub_path).await?;
        Ok(detail.to_metadata())
    }

    #[instrument(skip(self, visit), level = "debug")]
    async fn list_directory(&self, path: &str, visit: &mut Visitor<'_>) -> StorageResult<()> {
        if is_root(path) {
            let index = self.refresh_libraries().await?;
            for lib in index.libraries() {
                visit(lib.to_metadata())?;
            }
            return Ok(());
        }

        let (library_name, sub_path) = split_leading(path);
        let lib = self.library(library_name).await?;
        let sub_path = if sub_path.is_empty() { "/" } else { sub_path };

        let entries = self.directory_entries(&lib.id, sub_path).await?;
        debug!("Listed {} entries in {}{}", entries.len(), library_name, sub_path);
        for entry in &entries {
            visit(entry.to_metadata())?;
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_directory(&self, path: &str) -> StorageResult<()> {
        let (library_name, sub_path) = split_leading(path);
        if library_name.is_empty() {
            return Err(StorageError::permission_denied(
                "libraries cannot be created through the namespace",
            ));
        }
        if is_root(sub_path) {
            return Err(StorageError::invalid_path(format!(
                "library {} already exists",
                library_name
            )));
        }

        let lib = self.library(library_name).await?;
        self.make_directory(&lib.id, sub_path).await?;
        info!("Created directory {} in library {}", sub_path, library_name);
        Ok(())
    }

    #[instrument(skip(self, content), level = "debug")]
    async fn write_file(
        &self,
        path: &str,
        content: &mut ByteStream<'_>,
        append: bool,
    ) -> StorageResult<u64> {
        let (library_name, sub_path) = split_leading(path);
        if library_name.is_empty() {
            return Err(StorageError::permission_denied(
                "uploads must target a library, not the root",
            ));
        }
        if is_root(sub_path) {
            return Err(StorageError::invalid_path(format!(
                "{} is a library, not a file",
                library_name
            )));
        }
        if append {
            warn!("Append requested for {}, uploading whole file instead", path);
        }

        let lib = self.library(library_name).await?;
        let parent = parent_dir(sub_path);
        let link = self.upload_link(&lib.id, parent).await?;

        let size = self
            .upload(&link, parent, base_name(sub_path), content)
            .await?;
        info!("Uploaded {} bytes to {}{}", size, library_name, sub_path);
        Ok(size)
    }
}
