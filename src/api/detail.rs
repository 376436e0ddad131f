//! `GET /api/v1/file/detail`.

use serde::Serialize;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::model::DirectoryEntry;

#[derive(Debug, Serialize)]
pub struct DetailQuery {
    #[serde(rename = "fileID")]
    pub file_id: i64,
}

pub async fn file_detail(gateway: &Gateway, file_id: i64) -> Result<DirectoryEntry> {
    gateway
        .get("/api/v1/file/detail", &DetailQuery { file_id })
        .await
}
