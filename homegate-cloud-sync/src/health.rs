use crate::config::CloudSyncConfig;
use async_trait::async_trait;
use homegate_common::health::{HealthCheckError, HealthChecked};
use std::time::Duration;

/// Readiness signal for `/readiness` (§4.6, SPEC_FULL.md §B): reachability of the proprietary
/// cloud's login endpoint. Offline mode (no `cloud_base_url` configured) is always ready --
/// there's nothing to reach.
pub struct CloudReachability {
    base_url: Option<String>,
    timeout: Duration,
}

impl CloudReachability {
    pub fn new(config: &CloudSyncConfig) -> Self {
        Self {
            base_url: config.cloud_base_url.clone(),
            timeout: Duration::from_secs(config.comm_timeout_secs),
        }
    }
}

#[async_trait]
impl HealthChecked for CloudReachability {
    async fn is_ready(&self) -> Result<(), HealthCheckError> {
        let Some(base_url) = &self.base_url else {
            return Ok(());
        };
        reqwest::Client::new()
            .head(format!("{}/login/", base_url.trim_end_matches('/')))
            .timeout(self.timeout)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| HealthCheckError(format!("cloud unreachable: {err}")))
    }
}
