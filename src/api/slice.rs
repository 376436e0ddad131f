//! `POST /upload/v2/file/slice` (multipart) — one slice of a multi-part upload.

use std::time::Duration;

use bytes::Bytes;

use crate::constant::SLICE_UPLOAD_TIMEOUT;
use crate::error::{Pan123Error, Result};
use crate::gateway::Gateway;

pub async fn upload_slice(
    gateway: &Gateway,
    preupload_id: &str,
    slice_no: u32,
    slice_md5: &str,
    bytes: Bytes,
) -> Result<()> {
    #[derive(serde::Deserialize)]
    struct Empty {}

    let preupload_id = preupload_id.to_string();
    let slice_md5 = slice_md5.to_string();
    let factory = move || {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec());
        reqwest::multipart::Form::new()
            .text("preuploadID", preupload_id.clone())
            .text("sliceNo", slice_no.to_string())
            .text("sliceMD5", slice_md5.clone())
            .part("slice", part)
    };
    let result: Result<Empty> = gateway
        .post_multipart(
            "/upload/v2/file/slice",
            Some(SLICE_UPLOAD_TIMEOUT.min(Duration::from_secs(300))),
            factory,
        )
        .await;
    match result {
        Ok(_) => Ok(()),
        Err(Pan123Error::Api { code: 0, .. }) => Ok(()),
        Err(e) => Err(e),
    }
}
