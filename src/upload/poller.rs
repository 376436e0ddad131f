//! Completion poller (spec §4.I): adaptive-interval polling of
//! `upload_complete` until the server reports `completed=true` or the
//! retry budget for this upload is exhausted.

use std::time::Duration;

use tracing::warn;

use crate::api::upload_complete::upload_complete;
use crate::constant::RETRYABLE_CODES;
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;

const BASE_INTERVAL: Duration = Duration::from_secs(1);
const MAX_INTERVAL: Duration = Duration::from_secs(30);
const ONE_GIB: u64 = 1 << 30;

struct Tuning {
    max_polls: usize,
    max_consecutive_failures: usize,
}

fn tune_from_size(size: u64) -> Tuning {
    const MIB: u64 = 1 << 20;
    const GIB: u64 = 1 << 30;
    if size < 100 * MIB {
        Tuning { max_polls: 180, max_consecutive_failures: 8 }
    } else if size < 500 * MIB {
        Tuning { max_polls: 300, max_consecutive_failures: 12 }
    } else if size < GIB {
        Tuning { max_polls: 600, max_consecutive_failures: 15 }
    } else if size < 5 * GIB {
        Tuning { max_polls: 900, max_consecutive_failures: 20 }
    } else {
        Tuning { max_polls: 1200, max_consecutive_failures: 25 }
    }
}

/// Poll `preuploadID` until the server reports completion. Returns the
/// finished file id.
pub async fn poll_until_complete(
    gateway: &Gateway,
    preupload_id: &str,
    size: u64,
    expected_md5: Option<&str>,
) -> Result<i64> {
    let tuning = tune_from_size(size);
    let warn_after = if size > ONE_GIB {
        Duration::from_secs(15 * 60)
    } else {
        Duration::from_secs(5 * 60)
    };

    let mut consecutive_failures: usize = 0;
    let mut last_was_network_error = false;
    let mut elapsed = Duration::ZERO;
    let mut warned_slow = false;

    for attempt in 1..=tuning.max_polls {
        let outcome = upload_complete(gateway, preupload_id).await;

        match outcome {
            Ok(data) if data.completed => {
                if let Some(expected) = expected_md5 {
                    if !expected.eq_ignore_ascii_case(&data.etag) {
                        warn!(
                            "completion etag {} differs from expected {expected}; \
                             server is authoritative, accepting",
                            data.etag
                        );
                    }
                }
                return Ok(data.file_id);
            }
            Ok(_not_yet_completed) => {
                consecutive_failures = 0;
                last_was_network_error = false;
            }
            Err(Pan123Error::Api { code, .. }) if RETRYABLE_CODES.contains(&code) => {
                consecutive_failures += 1;
                last_was_network_error = false;
            }
            Err(e) if e.is_network_error() => {
                consecutive_failures += 1;
                last_was_network_error = true;
            }
            Err(e) => return Err(e),
        }

        if consecutive_failures >= tuning.max_consecutive_failures {
            return Err(Pan123Error::PollExhausted(attempt));
        }

        if !warned_slow && elapsed >= warn_after {
            warn!("upload {preupload_id} still verifying after {elapsed:?}");
            warned_slow = true;
        }

        let interval = next_interval(attempt, consecutive_failures, last_was_network_error);
        tokio::time::sleep(interval).await;
        elapsed += interval;
    }

    Err(Pan123Error::PollExhausted(tuning.max_polls))
}

fn next_interval(attempt: usize, consecutive_failures: usize, network_error: bool) -> Duration {
    let cap_multiplier: u32 = if network_error { 4 } else { 8 };
    let exp = (consecutive_failures as u32).min(cap_multiplier);
    let mut interval = BASE_INTERVAL * 2u32.pow(exp);

    if attempt > 300 {
        interval *= 4;
    } else if attempt > 60 {
        interval *= 2;
    }

    interval.min(MAX_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tune_from_size_matches_table() {
        let t = tune_from_size(10 * (1 << 20));
        assert_eq!(t.max_polls, 180);
        assert_eq!(t.max_consecutive_failures, 8);

        let t = tune_from_size(2 * (1 << 30));
        assert_eq!(t.max_polls, 900);
        assert_eq!(t.max_consecutive_failures, 20);
    }

    #[test]
    fn interval_is_capped_at_30s() {
        let interval = next_interval(1, 10, false);
        assert_eq!(interval, MAX_INTERVAL);
    }

    #[test]
    fn network_error_uses_tighter_multiplier_cap() {
        let net = next_interval(1, 10, true);
        let api = next_interval(1, 10, false);
        assert!(net <= api);
    }
}
