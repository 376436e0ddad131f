//! Single-shot uploader (spec §4.G): one multipart POST, ≤1 GiB, precomputed MD5.

use std::sync::Arc;

use crate::api::single_create::single_create;
use crate::constant::SINGLE_SHOT_MAX_SIZE;
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;
use crate::upload::parent::correct_parent;
use crate::upload::source::UploadSource;
use crate::vfs::DirCache;

/// Outcome of a single-shot attempt: either a finished file id, or a signal
/// that the caller should fall back to the multi-part path.
pub enum SingleShotOutcome {
    Done(i64),
    FallBackToMultipart,
}

pub async fn upload_single_shot(
    gateway: &Arc<Gateway>,
    dir_cache: &Arc<dyn DirCache>,
    parent_file_id: i64,
    parent_path: &str,
    filename: &str,
    etag: &str,
    root_id: i64,
    source: &UploadSource,
) -> Result<SingleShotOutcome> {
    let size = source.size();
    if size == 0 || size > SINGLE_SHOT_MAX_SIZE {
        return Err(Pan123Error::InvalidInput(format!(
            "single-shot upload requires 0 < size <= {SINGLE_SHOT_MAX_SIZE}, got {size}"
        )));
    }

    let bytes = source.read_all()?;
    let attempt = single_create(
        gateway,
        parent_file_id,
        filename.to_string(),
        etag.to_string(),
        size,
        bytes.clone(),
    )
    .await;

    match attempt {
        Ok(data) => {
            if data.completed {
                Ok(SingleShotOutcome::Done(data.file_id))
            } else {
                Ok(SingleShotOutcome::FallBackToMultipart)
            }
        }
        Err(Pan123Error::Api { code: 1, message }) if message.contains("parentFileID不存在") => {
            let corrected = correct_parent(gateway, dir_cache, parent_path, root_id).await?;
            let retried = single_create(
                gateway,
                corrected.resolved_id(root_id),
                filename.to_string(),
                etag.to_string(),
                size,
                bytes,
            )
            .await?;
            if retried.completed {
                Ok(SingleShotOutcome::Done(retried.file_id))
            } else {
                Ok(SingleShotOutcome::FallBackToMultipart)
            }
        }
        Err(e) => Err(e),
    }
}
