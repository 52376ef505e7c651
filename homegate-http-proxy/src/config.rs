use homegate_common::health::HealthServerConfig;
use serde::Deserialize;

/// HTTP-proxy-local settings (§6). `coap_addr` is the loopback CoAP listener the proxy opens
/// a fresh client connection to on every request (§4.5).
#[derive(Clone, Debug, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "homegate_common::defaults::proxy_bind_addr")]
    pub proxy_bind_addr: String,
    #[serde(default = "homegate_common::defaults::coap_loopback_addr")]
    pub coap_addr: String,
    #[serde(default = "homegate_common::defaults::comm_timeout_secs")]
    pub comm_timeout_secs: u64,
    #[serde(default)]
    pub health: HealthServerConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxy_bind_addr: homegate_common::defaults::proxy_bind_addr(),
            coap_addr: homegate_common::defaults::coap_loopback_addr(),
            comm_timeout_secs: homegate_common::defaults::comm_timeout_secs(),
            health: HealthServerConfig::default(),
        }
    }
}
