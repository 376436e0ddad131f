//! `GET /api/v1/file/download_info` — short-lived presigned download URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::Gateway;

#[derive(Debug, Serialize)]
pub struct DownloadInfoQuery {
    #[serde(rename = "fileID")]
    pub file_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DownloadInfoData {
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    #[serde(rename = "expireTime")]
    pub expire_time: DateTime<Utc>,
}

pub async fn download_info(gateway: &Gateway, file_id: i64) -> Result<DownloadInfoData> {
    gateway
        .get(
            "/api/v1/file/download_info",
            &DownloadInfoQuery { file_id },
        )
        .await
}
