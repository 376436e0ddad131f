//! Fixed protocol constants: hosts, size thresholds, retryable codes.

use std::time::Duration;

/// Control-plane host used for every endpoint except upload/slice.
pub const CONTROL_HOST: &str = "https://open-api.123pan.com";

/// Hard-coded fallback upload hosts, tried in order if `/upload/v2/file/domain` fails.
pub const UPLOAD_HOST_FALLBACKS: [&str; 2] = [
    "https://openapi-upload.123242.com",
    "https://openapi-upload.123pan.com",
];

/// Upload domain cache lifetime.
pub const UPLOAD_DOMAIN_TTL: Duration = Duration::from_secs(5 * 60);

/// Single-shot upload ceiling: 1 GiB.
pub const SINGLE_SHOT_MAX_SIZE: u64 = 1 << 30;

/// Fallback slice size when the server reports a non-positive `sliceSize`.
pub const DEFAULT_SLICE_SIZE: u64 = 64 << 20;

/// Maximum in-flight slice upload workers, per file, regardless of global concurrency.
pub const MAX_SLICE_WORKERS: usize = 4;

/// Per-slice upload timeout.
pub const SLICE_UPLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Parallel download trigger threshold.
pub const PARALLEL_DOWNLOAD_MIN_SIZE: u64 = 10 << 20;

/// Parallel download chunk size: 50 MiB.
pub const DOWNLOAD_CHUNK_SIZE: u64 = 50 << 20;

/// Maximum download workers per file.
pub const MAX_DOWNLOAD_WORKERS: usize = 6;

/// Per-chunk download retry budget.
pub const CHUNK_RETRY_ATTEMPTS: usize = 3;

/// Per-chunk download deadline.
pub const CHUNK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Threshold above which cross-provider materialization uses the parallel downloader.
pub const MATERIALIZE_PARALLEL_MIN_SIZE: u64 = 20 << 20;

/// Directory listing page size.
pub const LIST_PAGE_SIZE: u32 = 100;

/// Terminator value for `lastFileId` in a file-list response.
pub const LIST_LAST_PAGE_MARKER: i64 = -1;

/// Per-segment page scan cap in the path resolver (suspected server loop guard).
pub const RESOLVER_MAX_PAGES_PER_SEGMENT: u32 = 1000;

/// Whole-path walk iteration cap (suspected server loop guard).
pub const RESOLVER_MAX_TOTAL_ITERATIONS: u32 = 10_000;

/// Root directory id, always valid.
pub const ROOT_FILE_ID: i64 = 0;

/// API response codes that are safe to retry transparently.
pub const RETRYABLE_CODES: [i32; 8] = [20101, 20103, 20104, 20105, 500, 502, 503, 504];

/// `code=1` message fragment signalling a stale cached parent id.
pub const PARENT_NOT_EXIST_MARKER: &str = "parentFileID不存在";

/// `code=1` message fragment signalling an existing directory on mkdir.
pub const DUPLICATE_DIR_MARKER: &str = "已经有同名文件夹";

/// Token refresh window: force a refresh when less than this remains before expiry.
pub const TOKEN_REFRESH_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Filename hygiene limits (spec 4.E).
pub const MAX_FILENAME_CODEPOINTS: usize = 256;
pub const MAX_FILENAME_BYTES: usize = 255;

/// Fallback name used by `clean()` when the input has nothing left after sanitizing.
pub const FALLBACK_FILENAME: &str = "未命名文件";

/// `uniquify` probe ceiling before falling back to a timestamp suffix.
pub const UNIQUIFY_MAX_SUFFIX: u32 = 999;
