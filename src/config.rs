//! Config surface (spec §6 "Config surface").

use builder_pattern::Builder;
use serde::{Deserialize, Serialize};

use crate::model::PersistedToken;

/// Filename-encoding policy applied at the name-hygiene boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingPolicy {
    /// Pass filenames through unchanged once they pass validation.
    #[default]
    Passthrough,
    /// Normalize to NFC before validation, the common choice for providers
    /// that compare byte-for-byte but clients often hand over NFD (macOS).
    NormalizeNfc,
}

/// Everything the transfer core needs to talk to one 123 Pan account.
#[derive(Debug, Clone, Builder)]
pub struct Pan123Config {
    /// Required: OAuth-style client id issued by the open platform.
    #[into]
    pub client_id: String,

    /// Required: client secret paired with `client_id`.
    #[into]
    pub client_secret: String,

    /// Previously persisted token, if the host has one on hand.
    #[default(None)]
    pub token: Option<PersistedToken>,

    /// Sent as `User-Agent` on every call.
    #[default("pan123-core".to_string())]
    #[into]
    pub user_agent: String,

    /// Path root; `"0"` is the account root.
    #[default("0".to_string())]
    #[into]
    pub root_folder_id: String,

    /// Ceiling on the number of slices a multi-part upload may require.
    /// Files that would need more are rejected before any network call.
    #[default(10_000u32)]
    pub max_upload_parts: u32,

    /// Override for the `upload` pacer class minimum inter-call interval, in
    /// milliseconds.
    #[default(None)]
    pub upload_pacer_min_sleep_ms: Option<u64>,

    /// Override for the `download` pacer class minimum inter-call interval.
    #[default(None)]
    pub download_pacer_min_sleep_ms: Option<u64>,

    /// Override for the `strict` pacer class minimum inter-call interval.
    #[default(None)]
    pub strict_pacer_min_sleep_ms: Option<u64>,

    /// Filename-encoding policy applied before validation/cleaning.
    #[default(EncodingPolicy::default())]
    pub encoding: EncodingPolicy,

    /// Redirect the control-plane host somewhere other than the live API.
    /// Not part of the public contract a real account needs; exists so
    /// hermetic tests can point a session at a local mock server.
    #[default(None)]
    #[doc(hidden)]
    pub control_host_override: Option<String>,
}

impl Pan123Config {
    /// Root folder id as a numeric id, falling back to the always-valid root
    /// if the configured value doesn't parse.
    pub fn root_folder_id_numeric(&self) -> i64 {
        self.root_folder_id
            .parse()
            .unwrap_or(crate::constant::ROOT_FILE_ID)
    }
}
