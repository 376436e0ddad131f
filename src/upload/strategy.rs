//! Upload strategy selection (spec §4.F): single-shot vs multi-part vs
//! cross-provider materialize-then-upload, from size and source kind.

use std::sync::Arc;

use crate::constant::SINGLE_SHOT_MAX_SIZE;
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;
use crate::upload::multipart::upload_multipart;
use crate::upload::single::{upload_single_shot, SingleShotOutcome};
use crate::upload::source::UploadSource;
use crate::vfs::{DirCache, ProgressSink};

/// Everything one `Put` needs beyond the byte source itself.
pub struct PutRequest<'a> {
    pub parent_file_id: i64,
    pub parent_path: &'a str,
    pub filename: &'a str,
    pub etag: &'a str,
    pub max_upload_parts: u32,
    /// Session's configured path root, the fallback target for
    /// `ParentIDCorrection` when re-resolution can't recover a parent id.
    pub root_id: i64,
}

/// Upload `source`, dispatching to single-shot or multi-part by size.
/// Single-shot is tried first for anything ≤1 GiB and falls back to
/// multi-part on `completed=false`, reusing the same digest so the
/// server's instant-reuse check still applies.
pub async fn put(
    gateway: &Arc<Gateway>,
    dir_cache: &Arc<dyn DirCache>,
    progress: &Arc<dyn ProgressSink>,
    request: &PutRequest<'_>,
    source: &UploadSource,
) -> Result<i64> {
    let size = source.size();
    if size == 0 {
        return Err(Pan123Error::InvalidInput(
            "upload source has size 0".into(),
        ));
    }

    if size <= SINGLE_SHOT_MAX_SIZE {
        let outcome = upload_single_shot(
            gateway,
            dir_cache,
            request.parent_file_id,
            request.parent_path,
            request.filename,
            request.etag,
            request.root_id,
            source,
        )
        .await?;

        match outcome {
            SingleShotOutcome::Done(file_id) => return Ok(file_id),
            SingleShotOutcome::FallBackToMultipart => {}
        }
    }

    upload_multipart(
        gateway,
        dir_cache,
        progress,
        request.parent_file_id,
        request.parent_path,
        request.filename,
        request.etag,
        request.max_upload_parts,
        request.root_id,
        source,
    )
    .await
}
