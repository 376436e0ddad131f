//! Path-segment -> numeric file id resolution (spec §4.D).

use std::sync::Arc;

use crate::api::list::{list_page, ListQuery};
use crate::constant::{
    LIST_LAST_PAGE_MARKER, RESOLVER_MAX_PAGES_PER_SEGMENT, RESOLVER_MAX_TOTAL_ITERATIONS,
};
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;
use crate::vfs::DirCache;

pub struct Resolver {
    gateway: Arc<Gateway>,
    dir_cache: Arc<dyn DirCache>,
    root_id: i64,
}

impl Resolver {
    /// `root_id` is the walk's origin, the session's configured path root
    /// (spec §6 "path root"), not necessarily the account root.
    pub fn new(gateway: Arc<Gateway>, dir_cache: Arc<dyn DirCache>, root_id: i64) -> Self {
        Self {
            gateway,
            dir_cache,
            root_id,
        }
    }

    /// Resolve a `/`-separated path to a numeric file id, walking from the
    /// configured root. Every resolved intermediate directory is cached so
    /// subsequent lookups for the same prefix are O(1).
    pub async fn path_to_file_id(&self, path: &str) -> Result<i64> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Ok(self.root_id);
        }

        if let Some(id) = self.dir_cache.get(path) {
            return Ok(id);
        }

        let mut parent_id = self.root_id;
        let mut prefix = String::new();
        let mut total_iterations: u32 = 0;

        for (i, segment) in segments.iter().enumerate() {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);

            if let Some(cached) = self.dir_cache.get(&prefix) {
                parent_id = cached;
                continue;
            }

            let found = self
                .find_segment(parent_id, segment, &mut total_iterations)
                .await?
                .ok_or_else(|| Pan123Error::NotFound(prefix.clone()))?;

            // Only directories may be intermediate path components.
            if i + 1 < segments.len() && found.kind != 1 {
                return Err(Pan123Error::NotFound(prefix.clone()));
            }

            self.dir_cache.put(&prefix, found.id);
            parent_id = found.id;
        }

        Ok(parent_id)
    }

    async fn find_segment(
        &self,
        parent_id: i64,
        name: &str,
        total_iterations: &mut u32,
    ) -> Result<Option<crate::model::DirectoryEntry>> {
        let mut query = ListQuery::first_page(parent_id);
        let mut pages = 0u32;

        loop {
            pages += 1;
            *total_iterations += 1;
            if pages > RESOLVER_MAX_PAGES_PER_SEGMENT {
                return Err(Pan123Error::LoopSafety(format!(
                    "segment '{name}' exceeded {RESOLVER_MAX_PAGES_PER_SEGMENT} pages"
                )));
            }
            if *total_iterations > RESOLVER_MAX_TOTAL_ITERATIONS {
                return Err(Pan123Error::LoopSafety(format!(
                    "path walk exceeded {RESOLVER_MAX_TOTAL_ITERATIONS} iterations"
                )));
            }

            let page = list_page(&self.gateway, &query).await?;
            if let Some(entry) = page
                .file_list
                .iter()
                .find(|e| e.filename == name && !e.is_trashed())
            {
                return Ok(Some(entry.clone()));
            }

            if page.last_file_id == LIST_LAST_PAGE_MARKER {
                return Ok(None);
            }
            query = ListQuery::next_page(parent_id, page.last_file_id);
        }
    }
}
