//! `GET /api/v2/file/list` — paginated directory listing (spec §6).

use serde::{Deserialize, Serialize};

use crate::constant::LIST_PAGE_SIZE;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::model::DirectoryEntry;

#[derive(Debug, Serialize)]
pub struct ListQuery {
    #[serde(rename = "parentFileId")]
    pub parent_file_id: i64,
    pub limit: u32,
    #[serde(rename = "lastFileId")]
    pub last_file_id: i64,
    #[serde(rename = "searchData", skip_serializing_if = "Option::is_none")]
    pub search_data: Option<String>,
    #[serde(rename = "searchMode", skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<u32>,
}

impl ListQuery {
    pub fn first_page(parent_file_id: i64) -> Self {
        Self {
            parent_file_id,
            limit: LIST_PAGE_SIZE,
            last_file_id: 0,
            search_data: None,
            search_mode: None,
        }
    }

    pub fn next_page(parent_file_id: i64, last_file_id: i64) -> Self {
        Self {
            parent_file_id,
            limit: LIST_PAGE_SIZE,
            last_file_id,
            search_data: None,
            search_mode: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListData {
    #[serde(rename = "fileList", default)]
    pub file_list: Vec<DirectoryEntry>,
    #[serde(rename = "lastFileId")]
    pub last_file_id: i64,
}

/// One page of `parentFileId`'s children. Callers drive pagination by
/// feeding `last_file_id` back in until it equals [`crate::constant::LIST_LAST_PAGE_MARKER`].
pub async fn list_page(gateway: &Gateway, query: &ListQuery) -> Result<ListData> {
    gateway.get_no_timeout("/api/v2/file/list", query).await
}
