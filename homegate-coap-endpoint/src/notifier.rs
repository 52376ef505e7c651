use async_trait::async_trait;
use coap_lite::{MessageClass, Packet, PacketType, ResponseType};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Pushes an unsolicited notification to an observing peer. The CoAP library is assumed to
/// own the Observe registration/retransmission bookkeeping (§4.4); this only needs to get the
/// new representation onto the wire for the peers the observer table selected.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: SocketAddr, sequence: u32, payload: &[u8]);
}

pub struct UdpNotifier {
    socket: UdpSocket,
}

impl UdpNotifier {
    pub async fn bind(local_addr: &str) -> std::io::Result<Self> {
        Ok(Self {
            socket: UdpSocket::bind(local_addr).await?,
        })
    }
}

#[async_trait]
impl Notifier for UdpNotifier {
    async fn notify(&self, target: SocketAddr, sequence: u32, payload: &[u8]) {
        let mut packet = Packet::new();
        packet.header.set_type(PacketType::Confirmable);
        packet.header.code = MessageClass::Response(ResponseType::Content);
        packet.set_observe_value(sequence);
        packet.payload = payload.to_vec();

        match packet.to_bytes() {
            Ok(bytes) => {
                if let Err(err) = self.socket.send_to(&bytes, target).await {
                    log::warn!("observer notification to {target} failed: {err}");
                }
            }
            Err(err) => log::warn!("failed to encode notification for {target}: {err}"),
        }
    }
}
