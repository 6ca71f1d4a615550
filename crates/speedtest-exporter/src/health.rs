//! Internet connectivity probe behind the /health endpoint.

use std::time::Duration;
use tracing::{debug, warn};

/// Checks outbound connectivity by fetching a known URL
#[derive(Clone)]
pub struct HealthProbe {
    url: String,
    client: reqwest::Client,
}

impl HealthProbe {
    /// Create a new probe for `url`
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    /// Probe target
    pub fn url(&self) -> &str {
        &self.url
    }

    /// True when the probe URL answered at all.
    ///
    /// Any HTTP response counts; only transport errors and timeouts fail.
    pub async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                debug!(url = %self.url, status = response.status().as_u16(), "Health probe answered");
                true
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Health probe failed");
                false
            }
        }
    }
}
