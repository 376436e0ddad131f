//! Host-facing collaborator traits: directory-path caching, the remote
//! filesystem surface the upload/download pipeline is driven through, and a
//! progress sink (spec §6 "host filesystem contract", supplemented).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::RemoteObject;

/// Caches `path -> fileId` for resolved directories so the resolver (§4.D)
/// only pays the pagination cost once per path. A generic collaborator, not
/// specific to this provider: the host may swap in a persistent or
/// size-bounded implementation.
pub trait DirCache: Send + Sync {
    fn get(&self, path: &str) -> Option<i64>;
    fn put(&self, path: &str, id: i64);
    /// Drop a stale entry, e.g. after a `ParentIDCorrection`.
    fn invalidate(&self, path: &str);
}

/// Unbounded in-memory `DirCache`, the default when the host doesn't supply
/// one of its own.
#[derive(Default)]
pub struct InMemoryDirCache {
    entries: RwLock<HashMap<String, i64>>,
}

impl InMemoryDirCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirCache for InMemoryDirCache {
    fn get(&self, path: &str) -> Option<i64> {
        self.entries.read().unwrap().get(path).copied()
    }

    fn put(&self, path: &str, id: i64) {
        self.entries.write().unwrap().insert(path.to_string(), id);
    }

    fn invalidate(&self, path: &str) {
        self.entries.write().unwrap().remove(path);
    }
}

/// Progress/accounting sink the upload and download pipelines report
/// through. The default is a no-op; hosts that want a progress bar or
/// metrics implement this instead.
pub trait ProgressSink: Send + Sync {
    fn on_bytes_transferred(&self, _delta: u64) {}
    fn on_slice_done(&self, _slice_no: u32) {}
    fn on_chunk_done(&self, _chunk_index: usize) {}
}

#[derive(Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {}

/// Minimal remote-filesystem surface the cross-provider orchestrator (§4.J)
/// is driven through when the source of a transfer lives on another
/// provider entirely. This crate implements the 123 Pan side of a transfer;
/// `RemoteFs` is the seam a caller plugs the *other* side into.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Stat a remote path, if it exists.
    async fn stat(&self, path: &str) -> Result<Option<RemoteObject>>;

    /// Open a random-access reader over the remote object's bytes, used by
    /// the materializer to pull ranges without holding the whole file in
    /// memory.
    async fn read_range(&self, path: &str, offset: u64, len: u64) -> Result<Vec<u8>>;
}
