//! `GET /api/v1/user/info` — account quota.

use serde::Deserialize;

use crate::error::Result;
use crate::gateway::Gateway;

#[derive(Debug, Deserialize)]
pub struct UserInfoData {
    #[serde(rename = "spacePermanent", default)]
    pub space_permanent: u64,
    #[serde(rename = "spaceTemp", default)]
    pub space_temp: u64,
    #[serde(rename = "spaceUsed", default)]
    pub space_used: u64,
}

pub async fn user_info(gateway: &Gateway) -> Result<UserInfoData> {
    gateway.get_plain("/api/v1/user/info").await
}
