//! REST gateway: one place where every call to the provider goes through
//! the right pacer, carries a fresh token, and retries a 401 exactly once
//! (spec §4.C).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::auth::AuthSession;
use crate::constant::{CONTROL_HOST, UPLOAD_DOMAIN_TTL, UPLOAD_HOST_FALLBACKS};
use crate::error::{Pan123Error, Result};
use crate::model::ApiEnvelope;
use crate::pacer::PacerPool;

struct CachedDomain {
    host: String,
    fetched_at: Instant,
}

/// Everything an operation needs to make one logical call to the provider:
/// host routing, pacing, auth, and the 401-retry-once contract.
pub struct Gateway {
    http: Client,
    auth: Arc<AuthSession>,
    pacers: Arc<PacerPool>,
    user_agent: String,
    upload_domain: RwLock<Option<CachedDomain>>,
    fallback_index: AtomicUsize,
    control_host: Option<String>,
}

impl Gateway {
    pub fn new(
        http: Client,
        auth: Arc<AuthSession>,
        pacers: Arc<PacerPool>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth,
            pacers,
            user_agent: user_agent.into(),
            upload_domain: RwLock::new(None),
            fallback_index: AtomicUsize::new(0),
            control_host: None,
        }
    }

    /// Redirect the control-plane host somewhere other than the live API —
    /// exists for hermetic tests to point a `Gateway` at a local mock server.
    #[doc(hidden)]
    pub fn with_control_host(mut self, host: impl Into<String>) -> Self {
        self.control_host = Some(host.into());
        self
    }

    /// Control-plane host: every endpoint except the upload/slice family.
    fn control_host(&self) -> &str {
        self.control_host.as_deref().unwrap_or(CONTROL_HOST)
    }

    /// The host to send an upload-family request to: the cached, dynamically
    /// fetched domain if still fresh, otherwise one of the hard-coded
    /// fallbacks, advanced each time a caller reports that host failed.
    async fn upload_host(&self) -> String {
        {
            let cached = self.upload_domain.read().await;
            if let Some(cached) = cached.as_ref() {
                if cached.fetched_at.elapsed() < UPLOAD_DOMAIN_TTL {
                    return cached.host.clone();
                }
            }
        }
        match self.fetch_upload_domain().await {
            Ok(host) => {
                let mut cached = self.upload_domain.write().await;
                *cached = Some(CachedDomain {
                    host: host.clone(),
                    fetched_at: Instant::now(),
                });
                host
            }
            Err(e) => {
                tracing::warn!("upload domain lookup failed, using fallback host: {e}");
                self.next_fallback_host()
            }
        }
    }

    fn next_fallback_host(&self) -> String {
        let idx = self.fallback_index.load(Ordering::Relaxed) % UPLOAD_HOST_FALLBACKS.len();
        UPLOAD_HOST_FALLBACKS[idx].to_string()
    }

    /// Advance past a fallback host that itself failed at the transport
    /// level, so the next attempt tries the other one instead of looping.
    pub fn advance_upload_fallback(&self) {
        self.fallback_index.fetch_add(1, Ordering::Relaxed);
    }

    async fn fetch_upload_domain(&self) -> Result<String> {
        let domains: Vec<String> = self.get_plain("/upload/v2/file/domain").await?;
        domains
            .into_iter()
            .next()
            .ok_or_else(|| Pan123Error::Internal("empty upload domain list".into()))
    }

    fn base_url(&self, endpoint: &str) -> bool {
        endpoint.starts_with("/upload/v2/file/slice")
            || endpoint.starts_with("/upload/v2/file/single/create")
    }

    async fn resolve_host(&self, endpoint: &str) -> String {
        if self.base_url(endpoint) {
            self.upload_host().await
        } else {
            self.control_host().to_string()
        }
    }

    /// One logical call: ensure a token, build+send via `build`, and on a
    /// 401 force a refresh and retry exactly once with the new token.
    /// `build` receives the bearer token and must attach it itself.
    async fn attempt<B>(&self, endpoint: &str, method: Method, build: B) -> Result<reqwest::Response>
    where
        B: Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        let host = self.resolve_host(endpoint).await;
        let url = format!("{host}{endpoint}");

        let is_upload_endpoint = self.base_url(endpoint);
        let token = self.auth.ensure_token(false).await?;
        let req = build(
            self.http
                .request(method.clone(), &url)
                .header("User-Agent", &self.user_agent)
                .header("Platform", "open_platform")
                .bearer_auth(&token),
        );
        let resp = req.send().await.map_err(|e| {
            if is_upload_endpoint {
                tracing::warn!("upload host {host} failed at the transport level, advancing fallback: {e}");
                self.advance_upload_fallback();
            }
            Pan123Error::Transport(e)
        })?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("401 from {endpoint}, forcing token refresh and retrying once");
            let token = self.auth.force_refresh().await?;
            let req = build(
                self.http
                    .request(method, &url)
                    .header("User-Agent", &self.user_agent)
                    .header("Platform", "open_platform")
                    .bearer_auth(&token),
            );
            let resp = req.send().await.map_err(|e| {
                if is_upload_endpoint {
                    self.advance_upload_fallback();
                }
                Pan123Error::Transport(e)
            })?;
            if resp.status() == StatusCode::UNAUTHORIZED {
                return Err(Pan123Error::AuthRejected);
            }
            return Ok(resp);
        }

        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(Pan123Error::Transport)?;
        if !status.is_success() {
            return Err(Pan123Error::HttpStatus(status.as_u16()));
        }
        let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes)?;
        envelope
            .into_data()
            .map_err(|(code, message)| Pan123Error::Api { code, message })
    }

    /// `GET endpoint?query` with the default pacer timeout, decoded as
    /// `ApiEnvelope<T>`.
    pub async fn get<T, Q>(&self, endpoint: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize,
    {
        self.call(endpoint, Method::GET, None, move |b| b.query(query))
            .await
    }

    /// `GET endpoint` with no query string, e.g. `/upload/v2/file/domain`.
    pub async fn get_plain<T>(&self, endpoint: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.call(endpoint, Method::GET, None, |b| b).await
    }

    /// Like `get`, but with no client-side timeout: used for directory
    /// listings, which can legitimately take a long time on huge directories.
    pub async fn get_no_timeout<T, Q>(&self, endpoint: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize,
    {
        self.call(endpoint, Method::GET, Some(Duration::MAX), move |b| {
            b.query(query)
        })
        .await
    }

    pub async fn post_json<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.call(endpoint, Method::POST, None, move |b| b.json(body))
            .await
    }

    pub async fn put_json<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.call(endpoint, Method::PUT, None, move |b| b.json(body))
            .await
    }

    /// Multipart upload. `form_factory` rebuilds the body from scratch on
    /// every attempt since `reqwest::multipart::Form` isn't `Clone`.
    pub async fn post_multipart<T>(
        &self,
        endpoint: &str,
        timeout: Option<Duration>,
        form_factory: impl Fn() -> reqwest::multipart::Form,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let pacer = self.pacers.for_endpoint(endpoint);
        pacer
            .call(|| async {
                let result = self
                    .attempt(endpoint, Method::POST, |b| {
                        let b = if let Some(t) = timeout { b.timeout(t) } else { b };
                        b.multipart(form_factory())
                    })
                    .await;
                match result {
                    Ok(resp) => {
                        let decoded = Self::decode::<T>(resp).await;
                        match decoded {
                            Ok(v) => (false, Ok(v)),
                            Err(e) => {
                                let retry = e.is_pacer_retryable();
                                (retry, Err(e))
                            }
                        }
                    }
                    Err(e) => {
                        let retry = e.is_pacer_retryable();
                        (retry, Err(e))
                    }
                }
            })
            .await
    }

    async fn call<T, B>(
        &self,
        endpoint: &str,
        method: Method,
        timeout: Option<Duration>,
        build: B,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        let pacer = self.pacers.for_endpoint(endpoint);
        pacer
            .call(|| async {
                let result = self
                    .attempt(endpoint, method.clone(), |b| {
                        let b = if let Some(t) = timeout { b.timeout(t) } else { b };
                        build(b)
                    })
                    .await;
                match result {
                    Ok(resp) => match Self::decode::<T>(resp).await {
                        Ok(v) => (false, Ok(v)),
                        Err(e) => {
                            let retry = e.is_pacer_retryable();
                            (retry, Err(e))
                        }
                    },
                    Err(e) => {
                        let retry = e.is_pacer_retryable();
                        (retry, Err(e))
                    }
                }
            })
            .await
    }
}
