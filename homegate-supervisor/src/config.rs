use serde::Deserialize;

/// Supervisor-local settings (§4.7, §6). Binary paths default to the sibling binaries
/// cargo places next to this one; override with env vars when the layout differs
/// (container images, `cargo install`, ...).
#[derive(Clone, Debug, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_coap_endpoint_bin")]
    pub coap_endpoint_bin: String,
    #[serde(default = "default_http_proxy_bin")]
    pub http_proxy_bin: String,
    #[serde(default = "homegate_common::defaults::control_socket_path")]
    pub control_socket_path: String,
    #[serde(default = "default_restart_cooldown_secs")]
    pub restart_cooldown_secs: u64,
    #[serde(default = "default_max_restart_backoff_secs")]
    pub max_restart_backoff_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            coap_endpoint_bin: default_coap_endpoint_bin(),
            http_proxy_bin: default_http_proxy_bin(),
            control_socket_path: homegate_common::defaults::control_socket_path(),
            restart_cooldown_secs: default_restart_cooldown_secs(),
            max_restart_backoff_secs: default_max_restart_backoff_secs(),
        }
    }
}

fn sibling_bin(name: &str) -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join(name)))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

fn default_coap_endpoint_bin() -> String {
    sibling_bin("homegate-coap-endpoint")
}

fn default_http_proxy_bin() -> String {
    sibling_bin("homegate-http-proxy")
}

fn default_restart_cooldown_secs() -> u64 {
    1
}

fn default_max_restart_backoff_secs() -> u64 {
    30
}
