//! Credential exchange, expiry tracking, background renewal (spec §4.B).

use std::sync::{Arc, Weak};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::constant::{CONTROL_HOST, TOKEN_REFRESH_WINDOW};
use crate::error::{Pan123Error, Result};
use crate::model::{ApiEnvelope, PersistedToken};

/// Seam for the host to persist the token blob across process restarts.
/// The host owns the actual storage; this crate only produces the value.
pub trait TokenStore: Send + Sync {
    fn save(&self, token: &PersistedToken);
}

/// A `TokenStore` that drops every update; the default when the host
/// doesn't care to persist tokens.
pub struct NullTokenStore;

impl TokenStore for NullTokenStore {
    fn save(&self, _token: &PersistedToken) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Fresh,
    RenewalFailed,
}

#[derive(Debug, Deserialize)]
struct AccessTokenData {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "expiredAt")]
    expired_at: DateTime<Utc>,
}

struct AuthState {
    token: Option<PersistedToken>,
}

/// Shared, mutex-guarded credential state for one account.
pub struct AuthSession {
    client_id: String,
    client_secret: String,
    user_agent: String,
    http: reqwest::Client,
    state: Mutex<AuthState>,
    store: Arc<dyn TokenStore>,
    status_tx: watch::Sender<AuthStatus>,
    renewer: Mutex<Option<JoinHandle<()>>>,
    self_ref: Weak<AuthSession>,
}

impl AuthSession {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: impl Into<String>,
        http: reqwest::Client,
        initial: Option<PersistedToken>,
        store: Arc<dyn TokenStore>,
    ) -> Arc<Self> {
        let (status_tx, _rx) = watch::channel(AuthStatus::Fresh);
        Arc::new_cyclic(|self_ref| Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_agent: user_agent.into(),
            http,
            state: Mutex::new(AuthState { token: initial }),
            store,
            status_tx,
            renewer: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    fn arc_self(&self) -> Arc<Self> {
        self.self_ref
            .upgrade()
            .expect("AuthSession always owns a strong reference to itself")
    }

    /// Subscribe to renewer health; the host can surface `RenewalFailed` to
    /// its own diagnostics rather than have it swallowed silently.
    pub fn status(&self) -> watch::Receiver<AuthStatus> {
        self.status_tx.subscribe()
    }

    /// Returns a token valid for at least [`TOKEN_REFRESH_WINDOW`], or an
    /// error from refresh. Never returns a partial/empty token.
    pub async fn ensure_token(&self, force: bool) -> Result<String> {
        {
            let state = self.state.lock().await;
            if !force {
                if let Some(valid) = Self::still_fresh(&state.token) {
                    return Ok(valid);
                }
            }
        }
        self.refresh(force).await
    }

    fn still_fresh(token: &Option<PersistedToken>) -> Option<String> {
        let token = token.as_ref()?;
        let window = ChronoDuration::from_std(TOKEN_REFRESH_WINDOW).unwrap();
        if token.expiry - Utc::now() > window {
            Some(token.access_token.clone())
        } else {
            None
        }
    }

    async fn refresh(&self, force: bool) -> Result<String> {
        let mut state = self.state.lock().await;
        // Another caller may have refreshed while we waited for the mutex.
        if !force {
            if let Some(valid) = Self::still_fresh(&state.token) {
                return Ok(valid);
            }
        }

        tracing::debug!("refreshing 123pan access token");
        let resp = self
            .http
            .post(format!("{CONTROL_HOST}/api/v1/access_token"))
            .header("Platform", "open_platform")
            .header("User-Agent", &self.user_agent)
            .json(&serde_json::json!({
                "clientID": self.client_id,
                "clientSecret": self.client_secret,
            }))
            .send()
            .await
            .map_err(|e| Pan123Error::AuthFailed(e.to_string()))?;

        let envelope: ApiEnvelope<AccessTokenData> = resp
            .json()
            .await
            .map_err(|e| Pan123Error::AuthFailed(e.to_string()))?;

        let data = envelope
            .into_data()
            .map_err(|(code, message)| Pan123Error::AuthFailed(format!("{code}: {message}")))?;

        let persisted = PersistedToken {
            access_token: data.access_token,
            expiry: data.expired_at,
        };
        self.store.save(&persisted);
        let token = persisted.access_token.clone();
        state.token = Some(persisted.clone());
        drop(state);

        self.spawn_renewer(persisted.expiry);
        let _ = self.status_tx.send(AuthStatus::Fresh);
        tracing::info!("access token refreshed, expires at {}", persisted.expiry);
        Ok(token)
    }

    /// A 401 triggers this: force a refresh and retry the call once.
    pub async fn force_refresh(&self) -> Result<String> {
        self.ensure_token(true).await
    }

    fn spawn_renewer(&self, expiry: DateTime<Utc>) {
        let window = ChronoDuration::from_std(TOKEN_REFRESH_WINDOW).unwrap();
        let fire_at = expiry - window;
        let delay = (fire_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(0));

        let this = self.arc_self();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = this.refresh(true).await {
                tracing::error!("background token renewal failed: {e}");
                let _ = this.status_tx.send(AuthStatus::RenewalFailed);
            }
        });

        // Fire-and-forget, but keep the handle so `shutdown` can cancel it
        // instead of leaking a task past session lifetime.
        if let Ok(mut guard) = self.renewer.try_lock() {
            if let Some(old) = guard.replace(handle) {
                old.abort();
            }
        }
    }

    /// Stop the background renewer. Call on session shutdown.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.renewer.lock().await.take() {
            handle.abort();
        }
    }
}
