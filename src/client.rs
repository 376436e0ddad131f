//! Thin `reqwest::Client` builder (spec §4.C step 4: common headers, timeouts).

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};

use crate::error::{Pan123Error, Result};

pub struct HttpClientBuilder {
    builder: ClientBuilder,
}

impl HttpClientBuilder {
    pub fn new(user_agent: &str) -> Self {
        Self {
            builder: ClientBuilder::new()
                .connect_timeout(Duration::from_secs(10))
                .read_timeout(Duration::from_secs(30))
                .timeout(Duration::from_secs(60))
                .pool_idle_timeout(Duration::from_secs(300))
                .pool_max_idle_per_host(8)
                .user_agent(user_agent.to_string()),
        }
    }

    pub fn with_proxy(mut self, proxy: Proxy) -> Self {
        self.builder = self.builder.proxy(proxy);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.timeout(timeout);
        self
    }

    pub fn build(self) -> Result<Client> {
        self.builder
            .build()
            .map_err(|e| Pan123Error::Internal(format!("failed to build http client: {e}")))
    }
}
