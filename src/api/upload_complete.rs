//! `POST /upload/v2/file/upload_complete` — completion poll (spec §4.I).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::Gateway;

#[derive(Debug, Serialize)]
pub struct UploadCompleteRequest {
    #[serde(rename = "preuploadID")]
    pub preupload_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadCompleteData {
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "fileID", default)]
    pub file_id: i64,
    #[serde(default)]
    pub etag: String,
}

/// A single poll. The caller inspects `completed`; a non-zero `code` on the
/// envelope surfaces as an error through the gateway already.
pub async fn upload_complete(gateway: &Gateway, preupload_id: &str) -> Result<UploadCompleteData> {
    gateway
        .post_json(
            "/upload/v2/file/upload_complete",
            &UploadCompleteRequest {
                preupload_id: preupload_id.to_string(),
            },
        )
        .await
}
