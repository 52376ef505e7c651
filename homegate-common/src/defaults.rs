#[inline]
pub fn health_bind_addr() -> String {
    "127.0.0.1:9090".into()
}

#[inline]
pub fn health_workers() -> usize {
    1
}

#[inline]
pub fn coap_bind_addr() -> String {
    "0.0.0.0:5683".into()
}

#[inline]
pub fn proxy_bind_addr() -> String {
    "0.0.0.0:8080".into()
}

/// Loopback address the HTTP proxy and Cloud Sync connect to -- distinct from
/// [`coap_bind_addr`], which is the CoAP server's own bind address.
#[inline]
pub fn coap_loopback_addr() -> String {
    "127.0.0.1:5683".into()
}

#[inline]
pub fn comm_timeout_secs() -> u64 {
    5
}

#[inline]
pub fn device_probe_timeout_secs() -> u64 {
    15
}

#[inline]
pub fn device_monitor_tick_secs() -> u64 {
    1
}

#[inline]
pub fn aws_poll_tick_secs() -> u64 {
    5
}

#[inline]
pub fn max_json_payload_size() -> usize {
    65536
}

#[inline]
pub fn control_socket_path() -> String {
    "./homeserver.sock".into()
}
