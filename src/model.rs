//! Wire-adjacent data model (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic `{code, message, data}` envelope every 123 Pan endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Consume the envelope, turning a non-zero code into an `ApiError`ish triple.
    pub fn into_data(self) -> Result<T, (i32, String)> {
        if self.is_success() {
            self.data.ok_or((self.code, "missing data in success response".into()))
        } else {
            Err((self.code, self.message))
        }
    }
}

/// A single entry as returned by `file/list` (spec §3 DirectoryEntry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    #[serde(rename = "fileId")]
    pub id: i64,
    #[serde(rename = "filename")]
    pub filename: String,
    /// 0 = file, 1 = directory.
    #[serde(rename = "type")]
    pub kind: i32,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub etag: String,
    #[serde(rename = "parentFileId", default)]
    pub parent_id: i64,
    #[serde(default)]
    pub status: i32,
}

impl DirectoryEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == 1
    }

    /// Entries with `status >= 100` are trashed and must be filtered from listings.
    pub fn is_trashed(&self) -> bool {
        self.status >= 100
    }
}

/// A resolved remote file or directory (spec §3 RemoteObject).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: i64,
    pub path: String,
    pub size: u64,
    pub md5: String,
    pub modified_at: Option<DateTime<Utc>>,
    pub is_dir: bool,
}

impl RemoteObject {
    pub fn from_entry(entry: &DirectoryEntry, path: impl Into<String>) -> Self {
        Self {
            id: entry.id,
            path: path.into(),
            size: entry.size,
            md5: entry.etag.clone(),
            modified_at: None,
            is_dir: entry.is_dir(),
        }
    }
}

/// Opaque multi-part upload session handle (spec §3 UploadSession).
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub preupload_id: String,
    /// Byte size of every slice but potentially the last; server-dictated.
    pub slice_size: u64,
    /// `true` means the server already had this digest: instant upload, no transfer.
    pub reuse: bool,
    pub file_id: i64,
}

/// Per-slice MD5 + acknowledgement state collected by the multi-part uploader.
#[derive(Debug, Clone)]
pub struct SliceAck {
    pub slice_no: u32,
    pub md5: String,
}

/// Persisted token blob (spec §3 AuthSession, §6 "Persisted state").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedToken {
    pub access_token: String,
    pub expiry: DateTime<Utc>,
}

/// Outcome of attempting to recover from a stale cached parent id
/// (spec §3 ParentIDCorrection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentCorrection {
    /// The directory cache was invalidated and re-resolution found a fresh id.
    Corrected(i64),
    /// Re-resolution failed; the caller should retry against the always-valid root.
    FellBackToRoot,
}

impl ParentCorrection {
    /// `root_id` is the session's configured path root, not necessarily the
    /// account root, so a fallback lands where the caller actually started.
    pub fn resolved_id(self, root_id: i64) -> i64 {
        match self {
            ParentCorrection::Corrected(id) => id,
            ParentCorrection::FellBackToRoot => root_id,
        }
    }
}
