//! `PUT /api/v1/file/name`.

use serde::Serialize;

use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;

#[derive(Debug, Serialize)]
pub struct RenameRequest {
    #[serde(rename = "fileId")]
    pub file_id: i64,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

pub async fn rename(gateway: &Gateway, file_id: i64, file_name: &str) -> Result<()> {
    #[derive(serde::Deserialize)]
    struct Empty {}
    let result: Result<Empty> = gateway
        .put_json(
            "/api/v1/file/name",
            &RenameRequest {
                file_id,
                file_name: file_name.to_string(),
            },
        )
        .await;
    match result {
        Ok(_) => Ok(()),
        Err(Pan123Error::Api { code: 0, .. }) => Ok(()),
        Err(e) => Err(e),
    }
}
