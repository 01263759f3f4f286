//! Form-POST transport used by both device-flow endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::config::DeviceFlowConfig;
use crate::error::Result;

/// Issues a URL-encoded form POST and returns the raw response body.
///
/// Implementations must not interpret the HTTP status: RFC 8628 servers
/// report `authorization_pending` with a 400 while GitHub uses a 200, and the
/// poller classifies both from the body alone.
#[async_trait]
pub trait FormTransport: Send + Sync {
    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> Result<String>;
}

/// [`FormTransport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the request timeout from `config`.
    pub fn from_config(config: &DeviceFlowConfig) -> Result<Self> {
        Self::with_timeout(config.request_timeout)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("devgrant/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FormTransport for ReqwestTransport {
    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let resp = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(params)
            .send()
            .await?;
        let status = resp.status();
        tracing::debug!(%url, status = status.as_u16(), "Form POST completed");
        Ok(resp.text().await?)
    }
}
