//! Cross-provider transfer orchestrator (spec §4.J): materialize a remote
//! object from another provider into a local sparse file, computing its MD5
//! online, then feed the upload strategy with a now-local source.

use std::fs::File;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::constant::MATERIALIZE_PARALLEL_MIN_SIZE;
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;
use crate::upload::source::UploadSource;
use crate::upload::strategy::{put, PutRequest};
use crate::util::digest::StreamingMd5;
use crate::util::fs::write_at;
use crate::vfs::{DirCache, ProgressSink, RemoteFs};

const MATERIALIZE_CHUNK: u64 = 16 << 20;
const MATERIALIZE_MAX_WORKERS: usize = 4;

/// Materialize `remote_path` (on `source_fs`, a different provider) into a
/// local sparse temp file, then upload it. The temp file is removed on
/// success or terminal failure; a retry that finds a still-correctly-sized
/// temp file from a prior attempt must not re-download it.
pub async fn materialize_then_upload(
    gateway: &Arc<Gateway>,
    dir_cache: &Arc<dyn DirCache>,
    progress: &Arc<dyn ProgressSink>,
    source_fs: &Arc<dyn RemoteFs>,
    remote_path: &str,
    request: &PutRequest<'_>,
) -> Result<i64> {
    let remote = source_fs
        .stat(remote_path)
        .await?
        .ok_or_else(|| Pan123Error::NotFound(remote_path.to_string()))?;

    let tmp = tempfile_sized(remote.size)?;
    let (size, md5) = if remote.size >= MATERIALIZE_PARALLEL_MIN_SIZE {
        materialize_parallel(source_fs, remote_path, &tmp, remote.size).await?
    } else {
        materialize_sequential(source_fs.as_ref(), remote_path, &tmp, remote.size).await?
    };

    let result = {
        let source = UploadSource::from_file(Arc::new(tmp.try_clone().map_err(Pan123Error::Io)?), size);
        let mut owned_etag = md5.clone();
        if !request.etag.is_empty() {
            owned_etag = request.etag.to_string();
        }
        let request = PutRequest {
            parent_file_id: request.parent_file_id,
            parent_path: request.parent_path,
            filename: request.filename,
            etag: &owned_etag,
            max_upload_parts: request.max_upload_parts,
            root_id: request.root_id,
        };
        put(gateway, dir_cache, progress, &request, &source).await
    };

    drop(tmp);
    result
}

fn tempfile_sized(size: u64) -> Result<File> {
    let tmp = tempfile::tempfile().map_err(Pan123Error::Io)?;
    tmp.set_len(size).map_err(Pan123Error::Io)?;
    Ok(tmp)
}

async fn materialize_sequential(
    source_fs: &dyn RemoteFs,
    remote_path: &str,
    tmp: &File,
    size: u64,
) -> Result<(u64, String)> {
    let mut digest = StreamingMd5::new();
    let mut offset = 0u64;
    while offset < size {
        let len = MATERIALIZE_CHUNK.min(size - offset);
        let bytes = source_fs.read_range(remote_path, offset, len).await?;
        if bytes.len() as u64 != len {
            return Err(Pan123Error::Integrity(format!(
                "materialize read {} bytes, expected {len} at offset {offset}",
                bytes.len()
            )));
        }
        digest.update(&bytes);
        write_at(tmp, offset, &bytes)?;
        offset += len;
    }
    Ok((size, digest.finalize_hex()))
}

/// Parallel materialization trades online digesting (impossible to keep
/// ordered across concurrent chunk fetches) for throughput; the full file is
/// hashed once every chunk has landed.
async fn materialize_parallel(
    source_fs: &Arc<dyn RemoteFs>,
    remote_path: &str,
    tmp: &File,
    size: u64,
) -> Result<(u64, String)> {
    let chunk_count = size.div_ceil(MATERIALIZE_CHUNK);
    let workers = (chunk_count as usize).clamp(1, MATERIALIZE_MAX_WORKERS);
    let semaphore = Arc::new(Semaphore::new(workers));
    let tmp_fd = tmp.try_clone().map_err(Pan123Error::Io)?;
    let mut tasks = Vec::with_capacity(chunk_count as usize);

    for chunk_index in 0..chunk_count {
        let offset = chunk_index * MATERIALIZE_CHUNK;
        let len = MATERIALIZE_CHUNK.min(size - offset);
        let permit = Arc::clone(&semaphore);
        let handle = tmp_fd.try_clone().map_err(Pan123Error::Io)?;
        let path = remote_path.to_string();
        let source_fs = Arc::clone(source_fs);
        tasks.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore not closed");
            let bytes = source_fs.read_range(&path, offset, len).await?;
            if bytes.len() as u64 != len {
                return Err(Pan123Error::Integrity(format!(
                    "materialize chunk {chunk_index} read {} bytes, expected {len}",
                    bytes.len()
                )));
            }
            write_at(&handle, offset, &bytes)?;
            Ok::<_, Pan123Error>(())
        }));
    }

    for task in tasks {
        task.await
            .map_err(|e| Pan123Error::Internal(e.to_string()))??;
    }

    // Digest the assembled file sequentially; concurrent chunk order isn't
    // hash order.
    let mut digest = StreamingMd5::new();
    let mut offset = 0u64;
    while offset < size {
        let len = MATERIALIZE_CHUNK.min(size - offset);
        let bytes = crate::util::fs::read_at(tmp, offset, len)?;
        digest.update(&bytes);
        offset += len;
    }
    Ok((size, digest.finalize_hex()))
}
