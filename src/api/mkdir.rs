//! `POST /upload/v1/file/mkdir`.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::Gateway;

#[derive(Debug, Serialize)]
pub struct MkdirRequest {
    #[serde(rename = "parentID")]
    pub parent_id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MkdirData {
    #[serde(rename = "dirID")]
    pub dir_id: i64,
}

pub async fn mkdir(gateway: &Gateway, parent_id: i64, name: &str) -> Result<MkdirData> {
    gateway
        .post_json(
            "/upload/v1/file/mkdir",
            &MkdirRequest {
                parent_id: parent_id.to_string(),
                name: name.to_string(),
            },
        )
        .await
}
