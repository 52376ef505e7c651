use serde::Deserialize;

/// Environment-driven configuration for the two optional sinks (§4.6, §6).
#[derive(Clone, Debug, Deserialize)]
pub struct CloudSyncConfig {
    #[serde(default)]
    pub allow_working_offline: bool,

    #[serde(default)]
    pub cloud_base_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub aws_integration: bool,
    #[serde(default)]
    pub aws_access_key_id: Option<String>,
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,

    #[serde(default = "homegate_common::defaults::coap_loopback_addr")]
    pub coap_addr: String,

    #[serde(default = "homegate_common::defaults::comm_timeout_secs")]
    pub comm_timeout_secs: u64,
    #[serde(default = "homegate_common::defaults::aws_poll_tick_secs")]
    pub aws_poll_tick_secs: u64,
}

impl CloudSyncConfig {
    pub fn proprietary_enabled(&self) -> bool {
        !self.allow_working_offline && self.cloud_base_url.is_some() && self.email.is_some()
    }

    pub fn aws_enabled(&self) -> bool {
        !self.allow_working_offline && self.aws_integration
    }
}
