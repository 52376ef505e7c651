use async_trait::async_trait;
use homegate_common::health::{HealthCheckError, HealthChecked};
use std::time::Duration;

/// Readiness signal for `/readiness` (SPEC_FULL.md §B): the loopback CoAP server this proxy
/// mirrors requests onto must actually be reachable, or every forwarded request will fail.
pub struct CoapReachability {
    coap_addr: String,
    timeout: Duration,
}

impl CoapReachability {
    pub fn new(coap_addr: String, timeout: Duration) -> Self {
        Self { coap_addr, timeout }
    }
}

#[async_trait]
impl HealthChecked for CoapReachability {
    async fn is_ready(&self) -> Result<(), HealthCheckError> {
        let url = format!("coap://{}/info", self.coap_addr);
        homegate_common::coap_client::get(url, self.timeout)
            .await
            .map(|_| ())
            .map_err(|err| HealthCheckError(format!("CoAP server unreachable: {err}")))
    }
}
