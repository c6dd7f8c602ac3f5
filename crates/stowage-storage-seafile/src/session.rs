//! Seafile login session with single-flight token acquisition.
//!
//! The token is fetched lazily by the first request that needs it. Requests
//! arriving while a login is in flight await that same attempt and observe
//! its outcome; a failed attempt leaves the session unauthenticated so the
//! next request starts over. A token, once obtained, is kept for the life of
//! the process.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Method, StatusCode};
use stowage_storage_core::{StorageError, StorageResult};
use tracing::{debug, info, warn};

use crate::client::{send_json, with_token, ApiClient};
use crate::types::TokenResponse;

/// Login outcome shared between every waiter of one attempt.
type LoginOutcome = Result<String, String>;
type PendingLogin = Shared<BoxFuture<'static, LoginOutcome>>;

enum AuthState {
    Unauthenticated,
    Authenticating { attempt: u64, pending: PendingLogin },
    Authenticated(String),
}

/// Username and password for the auth-token exchange.
#[derive(Clone)]
pub(crate) struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub(crate) struct Session {
    api: ApiClient,
    credentials: Credentials,
    state: Mutex<AuthState>,
    attempts: AtomicU64,
}

impl Session {
    pub fn new(api: ApiClient, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            state: Mutex::new(AuthState::Unauthenticated),
            attempts: AtomicU64::new(0),
        }
    }

    /// Return the cached token, logging in first if there is none.
    pub async fn token(&self) -> StorageResult<String> {
        let (attempt, pending) = {
            let mut state = self.state.lock().expect("auth state poisoned");
            match &*state {
                AuthState::Authenticated(token) => return Ok(token.clone()),
                AuthState::Authenticating { attempt, pending } => (*attempt, pending.clone()),
                AuthState::Unauthenticated => {
                    let attempt = self.next_attempt();
                    debug!(attempt, "Starting Seafile login");
                    let pending =
                        login(self.api.clone(), self.credentials.clone()).boxed().shared();
                    *state = AuthState::Authenticating {
                        attempt,
                        pending: pending.clone(),
                    };
                    (attempt, pending)
                }
            }
        };

        let outcome = pending.await;

        {
            let mut state = self.state.lock().expect("auth state poisoned");
            let settles_current = matches!(
                &*state,
                AuthState::Authenticating { attempt: current, .. } if *current == attempt
            );
            if settles_current {
                *state = match &outcome {
                    Ok(token) => {
                        info!(attempt, "Seafile login succeeded");
                        AuthState::Authenticated(token.clone())
                    }
                    Err(e) => {
                        warn!(attempt, "Seafile login failed: {}", e);
                        AuthState::Unauthenticated
                    }
                };
            }
        }

        outcome.map_err(StorageError::Authentication)
    }

    fn next_attempt(&self) -> u64 {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Ping, exchange credentials, ping again with the new token.
async fn login(api: ApiClient, credentials: Credentials) -> LoginOutcome {
    run_login(&api, &credentials)
        .await
        .map_err(|e| e.to_string())
}

async fn run_login(api: &ApiClient, credentials: &Credentials) -> StorageResult<String> {
    let ping = api.request(Method::GET, api.resolve("api2/ping/")?);
    expect_pong(ping, "ping").await?;

    let auth = api
        .request(Method::POST, api.resolve("api2/auth-token/")?)
        .form(&[
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ]);
    let response: TokenResponse = send_json(auth, &[StatusCode::OK], "auth-token").await?;
    if response.token.is_empty() {
        return Err(StorageError::transport("auth-token", "returned empty token"));
    }

    let auth_ping = with_token(
        api.request(Method::GET, api.resolve("api2/auth/ping/")?),
        &response.token,
    );
    expect_pong(auth_ping, "authenticated ping").await?;

    Ok(response.token)
}

async fn expect_pong(request: reqwest::RequestBuilder, context: &str) -> StorageResult<()> {
    let reply: String = send_json(request, &[StatusCode::OK], context).await?;
    if !reply.eq_ignore_ascii_case("pong") {
        return Err(StorageError::transport(
            context,
            format!("expected pong got {:?}", reply),
        ));
    }
    Ok(())
}
