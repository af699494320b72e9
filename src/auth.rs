use crate::config::Config;
use crate::db;
use crate::models::{StoredCredential, TokenResponse};
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use url::Url;

/// A token within this many seconds of expiry is treated as stale.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Connection settings for the token authority. Usually built from the app
/// `Config`; tests construct it directly with `auth_base` pointing at a mock
/// server.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub db_path: PathBuf,
    pub auth_base: Option<String>,
    pub http_timeout: Duration,
}

impl AuthConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            redirect_uri: cfg.redirect_uri.clone(),
            scopes: cfg.scopes.clone(),
            db_path: cfg.db_path.clone(),
            auth_base: cfg.auth_base.clone(),
            http_timeout: Duration::from_secs(cfg.http_timeout_sec),
        }
    }
}

struct RefreshState {
    refreshing: bool,
    // Callers parked behind an in-flight refresh, in arrival order. Drained
    // front-to-back on success; a failed refresh leaves them queued until a
    // later refresh succeeds.
    waiters: Vec<oneshot::Sender<String>>,
}

/// Owns the OAuth2 credential lifecycle: code exchange, persisted token
/// storage, expiry tracking and refresh coordination. Every authenticated
/// request goes through [`TokenAuthority::with_valid_token`], which guarantees
/// the returned token has at least the refresh margin left and that at most
/// one refresh request is in flight at a time.
pub struct TokenAuthority {
    client: Client,
    cfg: AuthConfig,
    state: Mutex<RefreshState>,
}

impl TokenAuthority {
    pub fn new(cfg: AuthConfig) -> Self {
        Self {
            client: Client::new(),
            cfg,
            state: Mutex::new(RefreshState {
                refreshing: false,
                waiters: Vec::new(),
            }),
        }
    }

    fn auth_base(&self) -> String {
        self.cfg
            .auth_base
            .clone()
            .or_else(|| env::var("STREAM_AUTH_BASE").ok())
            .unwrap_or_else(|| "https://accounts.spotify.com".into())
    }

    /// Authorize URL the sign-in surface sends the user to. The redirect back
    /// carries the `code` query parameter consumed by [`Self::exchange_code`].
    pub fn authorize_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/authorize", self.auth_base()))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.cfg.client_id)
            .append_pair("scope", &self.cfg.scopes.join(" "))
            .append_pair("redirect_uri", &self.cfg.redirect_uri)
            .append_pair("show_dialog", "TRUE");
        Ok(url)
    }

    fn load_credential(&self) -> Option<StoredCredential> {
        let conn = match rusqlite::Connection::open(&self.cfg.db_path) {
            Ok(c) => c,
            Err(e) => {
                warn!("credential store unavailable: {}", e);
                return None;
            }
        };
        db::load_credential(&conn).ok().flatten()
    }

    /// True iff a persisted access token exists.
    pub fn is_signed_in(&self) -> bool {
        self.load_credential().is_some()
    }

    /// True iff an expiry is recorded and the token is inside the refresh
    /// margin. No expiry recorded means "nothing to refresh yet".
    pub fn should_refresh(&self) -> bool {
        match self.load_credential().and_then(|c| c.expires_at) {
            Some(expires_at) => Utc::now().timestamp() + REFRESH_MARGIN_SECS >= expires_at,
            None => false,
        }
    }

    /// Snapshot of the persisted credential (status display).
    pub fn stored_credential(&self) -> Option<StoredCredential> {
        self.load_credential()
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let auth_header = format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!(
                "{}:{}",
                self.cfg.client_id, self.cfg.client_secret
            ))
        );
        let url = format!("{}/api/token", self.auth_base());
        let resp = self
            .client
            .post(&url)
            .timeout(self.cfg.http_timeout)
            .header(AUTHORIZATION, auth_header)
            .form(params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("token request failed: {} => {}", status, body));
        }
        let tr: TokenResponse = resp.json().await?;
        Ok(tr)
    }

    async fn persist_credential(&self, tr: &TokenResponse) -> Result<()> {
        let db_path = self.cfg.db_path.clone();
        let access_token = tr.access_token.clone();
        let refresh_token = tr.refresh_token.clone();
        let expires_at = Utc::now().timestamp() + tr.expires_in;
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = db::open_or_create(&db_path)?;
            db::save_credential(&conn, &access_token, refresh_token.as_deref(), expires_at)
        })
        .await??;
        Ok(())
    }

    /// Exchange an authorization code for a credential and persist it.
    /// Codes are single-use server-side. Reports plain success/failure; on
    /// failure no local state changes.
    pub async fn exchange_code(&self, code: &str) -> bool {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.cfg.redirect_uri.as_str()),
        ];
        let tr = match self.request_token(&params).await {
            Ok(tr) => tr,
            Err(e) => {
                warn!("code exchange failed: {}", e);
                return false;
            }
        };
        if let Err(e) = self.persist_credential(&tr).await {
            warn!("code exchange succeeded but credential save failed: {}", e);
            return false;
        }
        debug!("authorization code exchanged, credential cached");
        true
    }

    /// Refresh state machine. Returns `None` when no attempt was made (a
    /// refresh is already in flight, or there is no refresh token to use),
    /// `Some(true)` when the token is fresh or was refreshed, `Some(false)`
    /// on a failed attempt. Waiters parked in [`Self::with_valid_token`] are
    /// released in FIFO order on success only.
    pub async fn refresh_if_needed(&self) -> Option<bool> {
        {
            let state = self.state.lock().await;
            if state.refreshing {
                return None;
            }
        }

        if !self.should_refresh() {
            return Some(true);
        }

        let refresh_token = match self.load_credential().and_then(|c| c.refresh_token) {
            Some(rt) => rt,
            None => {
                debug!("token is stale but no refresh token is stored");
                return None;
            }
        };

        {
            let mut state = self.state.lock().await;
            if state.refreshing {
                // Lost the race against a concurrent caller.
                return None;
            }
            state.refreshing = true;
        }

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        let outcome = self.request_token(&params).await;

        let mut state = self.state.lock().await;
        state.refreshing = false;
        match outcome {
            Ok(tr) => {
                for tx in state.waiters.drain(..) {
                    let _ = tx.send(tr.access_token.clone());
                }
                drop(state);
                if let Err(e) = self.persist_credential(&tr).await {
                    warn!("refreshed token could not be persisted: {}", e);
                    return Some(false);
                }
                debug!("token refresh complete");
                Some(true)
            }
            Err(e) => {
                drop(state);
                warn!("token refresh failed: {}", e);
                Some(false)
            }
        }
    }

    /// Single entry point for authenticated requests. Hands back a token that
    /// is valid for at least the refresh margin, refreshing first when
    /// needed. Callers arriving while a refresh is in flight are parked and
    /// served in arrival order once it succeeds; after a failed refresh they
    /// stay parked until a later refresh succeeds. Returns `None` when
    /// signed out or when a refresh attempt fails.
    pub async fn with_valid_token(&self) -> Option<String> {
        {
            let mut state = self.state.lock().await;
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                drop(state);
                return rx.await.ok();
            }
        }

        if self.should_refresh() {
            return match self.refresh_if_needed().await {
                Some(true) => self.load_credential().map(|c| c.access_token),
                _ => None,
            };
        }

        self.load_credential().map(|c| c.access_token)
    }

    /// Clear the persisted credential. Unconditional; there is nothing to
    /// undo remotely.
    pub fn sign_out(&self) -> bool {
        let res = db::open_or_create(&self.cfg.db_path).and_then(|conn| db::clear_credential(&conn));
        match res {
            Ok(()) => true,
            Err(e) => {
                warn!("sign-out could not clear credential store: {}", e);
                false
            }
        }
    }
}
