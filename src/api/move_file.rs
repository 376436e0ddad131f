//! `POST /api/v1/file/move`.

use serde::Serialize;

use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;

#[derive(Debug, Serialize)]
pub struct MoveRequest {
    #[serde(rename = "fileIDs")]
    pub file_ids: Vec<i64>,
    #[serde(rename = "toParentFileID")]
    pub to_parent_file_id: i64,
}

pub async fn move_file(gateway: &Gateway, file_ids: Vec<i64>, to_parent_file_id: i64) -> Result<()> {
    #[derive(serde::Deserialize)]
    struct Empty {}
    let result: Result<Empty> = gateway
        .post_json(
            "/api/v1/file/move",
            &MoveRequest {
                file_ids,
                to_parent_file_id,
            },
        )
        .await;
    match result {
        Ok(_) => Ok(()),
        Err(Pan123Error::Api { code: 0, .. }) => Ok(()),
        Err(e) => Err(e),
    }
}
