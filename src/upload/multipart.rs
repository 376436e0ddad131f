//! Multi-part uploader (spec §4.H): create session, fan out bounded slice
//! workers, poll completion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::api::create::create;
use crate::api::slice::upload_slice;
use crate::constant::{DEFAULT_SLICE_SIZE, MAX_SLICE_WORKERS};
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;
use crate::upload::parent::correct_parent;
use crate::upload::poller::poll_until_complete;
use crate::upload::source::UploadSource;
use crate::util::digest::md5_hex;
use crate::vfs::{DirCache, ProgressSink};

pub async fn upload_multipart(
    gateway: &Arc<Gateway>,
    dir_cache: &Arc<dyn DirCache>,
    progress: &Arc<dyn ProgressSink>,
    parent_file_id: i64,
    parent_path: &str,
    filename: &str,
    etag: &str,
    max_upload_parts: u32,
    root_id: i64,
    source: &UploadSource,
) -> Result<i64> {
    let size = source.size();
    if size == 0 {
        return Err(Pan123Error::InvalidInput(
            "multi-part upload requires size > 0".into(),
        ));
    }

    let session = match create(gateway, parent_file_id, filename, etag, size).await {
        Ok(data) => data,
        Err(Pan123Error::Api { code: 1, message }) if message.contains("parentFileID不存在") => {
            let corrected = correct_parent(gateway, dir_cache, parent_path, root_id).await?;
            create(gateway, corrected.resolved_id(root_id), filename, etag, size).await?
        }
        Err(e) => return Err(e),
    };

    if session.reuse {
        return Ok(session.file_id);
    }

    let slice_size = if session.slice_size <= 0 {
        DEFAULT_SLICE_SIZE
    } else {
        session.slice_size as u64
    };

    let slice_count = size.div_ceil(slice_size);
    if slice_count > max_upload_parts as u64 {
        return Err(Pan123Error::InvalidInput(format!(
            "{filename} would need {slice_count} slices, exceeding max_upload_parts={max_upload_parts}"
        )));
    }

    upload_all_slices(
        gateway,
        progress,
        &session.preupload_id,
        source,
        slice_size,
        slice_count,
    )
    .await?;

    poll_until_complete(gateway, &session.preupload_id, size, Some(etag)).await
}

async fn upload_all_slices(
    gateway: &Arc<Gateway>,
    progress: &Arc<dyn ProgressSink>,
    preupload_id: &str,
    source: &UploadSource,
    slice_size: u64,
    slice_count: u64,
) -> Result<()> {
    let workers = (slice_count as usize).clamp(1, MAX_SLICE_WORKERS);
    let semaphore = Arc::new(Semaphore::new(workers));
    let failures = Arc::new(AtomicUsize::new(0));
    let mut tasks = Vec::with_capacity(slice_count as usize);

    for slice_no in 1..=slice_count {
        let permit = Arc::clone(&semaphore);
        let gateway = Arc::clone(gateway);
        let progress = Arc::clone(progress);
        let failures = Arc::clone(&failures);
        let source = source.clone();
        let size = source.size();
        let offset = (slice_no - 1) * slice_size;
        let this_slice_len = slice_size.min(size - offset);
        let preupload_id = preupload_id.to_string();

        tasks.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore not closed");
            let bytes = match source.read_at(offset, this_slice_len) {
                Ok(b) => b,
                Err(e) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    return Err((slice_no as u32, e));
                }
            };
            let digest = md5_hex(&bytes);
            let result =
                upload_slice(&gateway, &preupload_id, slice_no as u32, &digest, bytes).await;
            match result {
                Ok(()) => {
                    progress.on_slice_done(slice_no as u32);
                    Ok(())
                }
                Err(e) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    Err((slice_no as u32, e))
                }
            }
        }));
    }

    let mut first_error: Option<(u32, Pan123Error)> = None;
    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err((slice_no, e))) => {
                if first_error.is_none() {
                    first_error = Some((slice_no, e));
                }
            }
            Err(join_err) => {
                if first_error.is_none() {
                    first_error = Some((0, Pan123Error::Internal(join_err.to_string())));
                }
            }
        }
    }

    if let Some((slice_no, e)) = first_error {
        return Err(Pan123Error::Internal(format!(
            "slice {slice_no} failed terminally: {e}"
        )));
    }

    Ok(())
}
