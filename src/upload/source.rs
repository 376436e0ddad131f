//! Random-access view over upload payload bytes, backing both the
//! single-shot and multi-part paths (spec §4.G/§4.H: "a sparse file for
//! large or remote-materialized inputs, an in-memory buffer otherwise").

use std::fs::File;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::util::fs::read_at;

#[derive(Clone)]
pub enum UploadSource {
    Memory(Bytes),
    File { handle: Arc<File>, size: u64 },
}

impl UploadSource {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        UploadSource::Memory(bytes.into())
    }

    pub fn from_file(handle: Arc<File>, size: u64) -> Self {
        UploadSource::File { handle, size }
    }

    pub fn size(&self) -> u64 {
        match self {
            UploadSource::Memory(b) => b.len() as u64,
            UploadSource::File { size, .. } => *size,
        }
    }

    /// Read `len` bytes at `offset`. Valid for any offset/len within `size()`.
    pub fn read_at(&self, offset: u64, len: u64) -> Result<Bytes> {
        match self {
            UploadSource::Memory(b) => {
                let start = offset as usize;
                let end = (start + len as usize).min(b.len());
                Ok(b.slice(start..end))
            }
            UploadSource::File { handle, .. } => read_at(handle, offset, len),
        }
    }

    /// The whole payload as one contiguous buffer; only cheap for
    /// single-shot uploads, which are capped at 1 GiB.
    pub fn read_all(&self) -> Result<Bytes> {
        self.read_at(0, self.size())
    }
}
