//! `POST /api/v1/file/trash` — move one or more files to trash.

use serde::Serialize;

use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;

#[derive(Debug, Serialize)]
pub struct TrashRequest {
    #[serde(rename = "fileIDs")]
    pub file_ids: Vec<i64>,
}

/// `trash`/`move` responses carry no payload; an envelope with `data: null`
/// is still a success, not a missing-data error.
pub async fn trash(gateway: &Gateway, file_ids: Vec<i64>) -> Result<()> {
    #[derive(serde::Deserialize)]
    struct Empty {}
    let result: Result<Empty> = gateway
        .post_json("/api/v1/file/trash", &TrashRequest { file_ids })
        .await;
    match result {
        Ok(_) => Ok(()),
        Err(Pan123Error::Api { code: 0, .. }) => Ok(()),
        Err(e) => Err(e),
    }
}
