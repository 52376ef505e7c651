use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Liveness check used by the monitor loop (§4.2): a short-timeout CoAP `GET /` to the
/// device. Abstracted behind a trait so the monitor loop is testable without a real socket.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, address: Ipv4Addr, port: u16, timeout: Duration) -> bool;
}

/// Opens a fresh CoAP client per probe, mirroring the per-call open/close contract used
/// everywhere else this gateway talks CoAP (§9 open question resolution).
pub struct CoapLivenessProbe;

#[async_trait]
impl LivenessProbe for CoapLivenessProbe {
    async fn probe(&self, address: Ipv4Addr, port: u16, timeout: Duration) -> bool {
        let url = format!("coap://{address}:{port}/");
        homegate_common::coap_client::get(url, timeout).await.is_ok()
    }
}
