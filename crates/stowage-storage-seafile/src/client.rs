//! Request primitive shared by every Seafile call.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use stowage_storage_core::{StorageError, StorageResult};
use tracing::debug;

const ACCEPT_JSON: &str = "application/json; indent=4";

/// HTTP client bound to one Seafile installation.
///
/// Cheap to clone: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url, timeout: Duration) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { http, base_url })
    }

    /// Resolve an API path (or absolute URL) against the base URL.
    pub fn resolve(&self, path: &str) -> StorageResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| StorageError::invalid_path(format!("{}: {}", path, e)))
    }

    /// Start an unauthenticated request.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).header(ACCEPT, ACCEPT_JSON)
    }
}

/// Attach a Seafile API token.
pub(crate) fn with_token(request: RequestBuilder, token: &str) -> RequestBuilder {
    request.header(AUTHORIZATION, format!("Token {}", token))
}

/// Send a request, mapping network failures to transport errors.
pub(crate) async fn execute(request: RequestBuilder, context: &str) -> StorageResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| StorageError::transport(context, e))?;
    debug!("{}: HTTP {}", context, response.status());
    Ok(response)
}

/// Error for a response whose status was not accepted.
pub(crate) fn status_error(context: &str, status: StatusCode) -> StorageError {
    StorageError::Status {
        context: context.to_string(),
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
    }
}

/// Send a request and decode its JSON body if the status is one of `expected`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    expected: &[StatusCode],
    context: &str,
) -> StorageResult<T> {
    let response = execute(request, context).await?;
    let status = response.status();
    if !expected.contains(&status) {
        return Err(status_error(context, status));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| StorageError::transport(context, format!("invalid response body: {}", e)))
}
