//! Per-endpoint-class rate limiter with exponential back-off (spec §4.A).

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::Pan123Config;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Which rate-limit bucket an endpoint belongs to (spec §4.A table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacerClass {
    List,
    Strict,
    Upload,
    Download,
}

impl PacerClass {
    pub fn default_min_interval(self) -> Duration {
        match self {
            PacerClass::List => Duration::from_millis(200),
            PacerClass::Strict => Duration::from_millis(250),
            PacerClass::Upload => Duration::from_millis(50),
            PacerClass::Download => Duration::from_millis(500),
        }
    }

    /// Classify an endpoint path. Unknown endpoints default to `Strict`.
    pub fn classify(endpoint: &str) -> PacerClass {
        if endpoint.contains("file/list") {
            PacerClass::List
        } else if endpoint.contains("file/slice") {
            PacerClass::Upload
        } else if endpoint.contains("download_info") || endpoint.contains("access_token") {
            PacerClass::Download
        } else {
            PacerClass::Strict
        }
    }
}

struct PacerState {
    next_allowed: Instant,
    backoff: Duration,
}

/// Enforces a minimum inter-call interval and grows an additional back-off
/// delay on error, capped at 30s.
pub struct Pacer {
    min_interval: Duration,
    state: Mutex<PacerState>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(PacerState {
                next_allowed: Instant::now(),
                backoff: Duration::ZERO,
            }),
        }
    }

    /// Block until this pacer's schedule allows another call, then mark the
    /// next earliest call time.
    async fn wait_turn(&self) {
        let wait_until = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let target = state.next_allowed.max(now);
            state.next_allowed = target + self.min_interval + state.backoff;
            target
        };
        let now = Instant::now();
        if wait_until > now {
            tokio::time::sleep(wait_until - now).await;
        }
    }

    async fn note_failure(&self) {
        let mut state = self.state.lock().await;
        let jitter_ms = rand::thread_rng().gen_range(0..250);
        let base = if state.backoff.is_zero() {
            Duration::from_millis(500)
        } else {
            state.backoff * 2
        };
        state.backoff = (base + Duration::from_millis(jitter_ms)).min(MAX_BACKOFF);
    }

    async fn note_success(&self) {
        let mut state = self.state.lock().await;
        state.backoff = Duration::ZERO;
    }

    /// Run `f`, which reports whether its failure is retryable. On a
    /// retryable failure, sleep with exponential back-off and re-invoke.
    /// Stops retrying once back-off has been grown past the cap without success.
    pub async fn call<T, E, F, Fut>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = (bool, Result<T, E>)>,
    {
        loop {
            self.wait_turn().await;
            let (retry, result) = f().await;
            match result {
                Ok(v) => {
                    self.note_success().await;
                    return Ok(v);
                }
                Err(e) => {
                    if !retry {
                        return Err(e);
                    }
                    self.note_failure().await;
                    let at_cap = {
                        let state = self.state.lock().await;
                        state.backoff >= MAX_BACKOFF
                    };
                    if at_cap {
                        return Err(e);
                    }
                }
            }
        }
    }
}

/// The four pacer classes a session needs, plus overrides from config.
pub struct PacerPool {
    list: Pacer,
    strict: Pacer,
    upload: Pacer,
    download: Pacer,
    calls_issued: AtomicU32,
}

impl PacerPool {
    pub fn new(config: &Pan123Config) -> Self {
        let upload_interval = config
            .upload_pacer_min_sleep_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| PacerClass::Upload.default_min_interval());
        let download_interval = config
            .download_pacer_min_sleep_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| PacerClass::Download.default_min_interval());
        let strict_interval = config
            .strict_pacer_min_sleep_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| PacerClass::Strict.default_min_interval());
        Self {
            list: Pacer::new(PacerClass::List.default_min_interval()),
            strict: Pacer::new(strict_interval),
            upload: Pacer::new(upload_interval),
            download: Pacer::new(download_interval),
            calls_issued: AtomicU32::new(0),
        }
    }

    pub fn get(&self, class: PacerClass) -> &Pacer {
        self.calls_issued.fetch_add(1, Ordering::Relaxed);
        match class {
            PacerClass::List => &self.list,
            PacerClass::Strict => &self.strict,
            PacerClass::Upload => &self.upload,
            PacerClass::Download => &self.download,
        }
    }

    pub fn for_endpoint(&self, endpoint: &str) -> &Pacer {
        self.get(PacerClass::classify(endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_endpoints() {
        assert_eq!(
            PacerClass::classify("/api/v2/file/list"),
            PacerClass::List
        );
        assert_eq!(
            PacerClass::classify("/upload/v2/file/slice"),
            PacerClass::Upload
        );
        assert_eq!(
            PacerClass::classify("/api/v1/file/download_info"),
            PacerClass::Download
        );
        assert_eq!(
            PacerClass::classify("/api/v1/access_token"),
            PacerClass::Download
        );
        assert_eq!(
            PacerClass::classify("/api/v1/file/move"),
            PacerClass::Strict
        );
        assert_eq!(
            PacerClass::classify("/something/unknown"),
            PacerClass::Strict
        );
    }

    #[tokio::test]
    async fn call_retries_until_success() {
        let pacer = Pacer::new(Duration::from_millis(1));
        let mut attempts = 0;
        let result: Result<u32, &str> = pacer
            .call(|| {
                attempts += 1;
                let attempt = attempts;
                async move {
                    if attempt < 3 {
                        (true, Err("boom"))
                    } else {
                        (false, Ok(attempt))
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn call_does_not_retry_non_retryable_errors() {
        let pacer = Pacer::new(Duration::from_millis(1));
        let mut attempts = 0;
        let result: Result<u32, &str> = pacer
            .call(|| {
                attempts += 1;
                async move { (false, Err("fatal")) }
            })
            .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(attempts, 1);
    }
}
