//! `POST /upload/v2/file/create` — opens a multi-part upload session.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::Gateway;

#[derive(Debug, Serialize)]
pub struct CreateRequest {
    #[serde(rename = "parentFileID")]
    pub parent_file_id: i64,
    pub filename: String,
    pub etag: String,
    pub size: u64,
    pub duplicate: u8,
    #[serde(rename = "containDir")]
    pub contain_dir: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateData {
    #[serde(rename = "fileID")]
    pub file_id: i64,
    #[serde(rename = "preuploadID")]
    pub preupload_id: String,
    #[serde(default)]
    pub reuse: bool,
    #[serde(rename = "sliceSize", default)]
    pub slice_size: i64,
}

pub async fn create(
    gateway: &Gateway,
    parent_file_id: i64,
    filename: &str,
    etag: &str,
    size: u64,
) -> Result<CreateData> {
    gateway
        .post_json(
            "/upload/v2/file/create",
            &CreateRequest {
                parent_file_id,
                filename: filename.to_string(),
                etag: etag.to_string(),
                size,
                duplicate: 1,
                contain_dir: false,
            },
        )
        .await
}
