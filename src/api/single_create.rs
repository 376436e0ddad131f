//! `POST /upload/v2/file/single/create` (multipart) — single-shot upload.

use bytes::Bytes;
use serde::Deserialize;

use crate::error::Result;
use crate::gateway::Gateway;

#[derive(Debug, Deserialize)]
pub struct SingleCreateData {
    #[serde(rename = "fileID")]
    pub file_id: i64,
    #[serde(default)]
    pub completed: bool,
}

#[allow(clippy::too_many_arguments)]
pub async fn single_create(
    gateway: &Gateway,
    parent_file_id: i64,
    filename: String,
    etag: String,
    size: u64,
    bytes: Bytes,
) -> Result<SingleCreateData> {
    let filename = filename.clone();
    let etag = etag.clone();
    let factory = move || {
        let file_part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.clone());
        reqwest::multipart::Form::new()
            .text("parentFileId", parent_file_id.to_string())
            .text("filename", filename.clone())
            .text("etag", etag.clone())
            .text("size", size.to_string())
            .text("duplicate", "1")
            .part("file", file_part)
    };
    gateway
        .post_multipart("/upload/v2/file/single/create", None, factory)
        .await
}
