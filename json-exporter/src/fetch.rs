//! Retrieval of target documents.

use std::time::Duration;

use tracing::debug;

use crate::config::ProbeConfig;
use crate::error::ProbeError;

/// HTTP client used to fetch probe targets.
#[derive(Debug, Clone)]
pub struct TargetFetcher {
    client: reqwest::Client,
}

impl TargetFetcher {
    /// Build a fetcher from probe configuration.
    ///
    /// With `insecure_skip_verify` set (the default) certificate and hostname
    /// checks are disabled for every target.
    pub fn new(config: &ProbeConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }

    /// GET `target` and return the full response body.
    ///
    /// Errors before a response arrives (bad URL, connect, TLS, timeout) are
    /// [`ProbeError::FetchFailure`]; failures while streaming the body are
    /// [`ProbeError::BodyReadError`]. The response's status code is not
    /// interpreted.
    pub async fn fetch(&self, target: &str) -> Result<Vec<u8>, ProbeError> {
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(ProbeError::FetchFailure)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(ProbeError::BodyReadError)?;

        debug!(
            url = %target,
            status = status.as_u16(),
            bytes = body.len(),
            "Fetched target"
        );

        Ok(body.to_vec())
    }
}
