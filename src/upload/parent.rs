//! `ParentIDCorrection` (spec §3, §4.G/§4.H step 5): recover from a stale
//! cached parent id by invalidating the dir cache and re-resolving, falling
//! back to the always-valid root if re-resolution also fails.

use std::sync::Arc;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::model::ParentCorrection;
use crate::resolver::Resolver;
use crate::vfs::DirCache;

/// `root_id` is the session's configured path root, the walk origin to fall
/// back to when re-resolution can't recover a fresher parent id.
pub async fn correct_parent(
    gateway: &Arc<Gateway>,
    dir_cache: &Arc<dyn DirCache>,
    parent_path: &str,
    root_id: i64,
) -> Result<ParentCorrection> {
    dir_cache.invalidate(parent_path);

    if parent_path.is_empty() {
        return Ok(ParentCorrection::FellBackToRoot);
    }

    let resolver = Resolver::new(Arc::clone(gateway), Arc::clone(dir_cache), root_id);
    match resolver.path_to_file_id(parent_path).await {
        Ok(id) if id != root_id => Ok(ParentCorrection::Corrected(id)),
        Ok(_) => Ok(ParentCorrection::FellBackToRoot),
        Err(_) => Ok(ParentCorrection::FellBackToRoot),
    }
}
