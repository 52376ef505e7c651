use crate::observers::NotifyOrigin;
use homegate_registry::Origin;
use std::net::Ipv4Addr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

/// A parsed inbound request, independent of the CoAP wire details (§4.4's dispatch contract).
pub struct ResourceRequest<'a> {
    pub method: Method,
    pub segments: &'a [String],
    pub query: Option<&'a str>,
    pub origin: Origin,
    pub body: &'a [u8],
}

/// Which resource path to notify observers of, and under which §4.3 policy.
pub struct Notify {
    pub path: String,
    pub origin: NotifyOrigin,
    pub device_addr: Ipv4Addr,
}

/// What a resource handler produced: the JSON body to send back, the CoAP response code, and
/// an optional notification instruction for the observer table (§4.4's `resource.changed` /
/// `resource.deleted` flags, folded into one value since both drive the same fan-out call).
pub struct ResourceResponse {
    pub status: coap_lite::ResponseType,
    pub payload: Vec<u8>,
    pub notify: Option<Notify>,
}

impl ResourceResponse {
    pub fn ok_json(status: coap_lite::ResponseType, value: &impl serde::Serialize) -> Self {
        Self {
            status,
            payload: serde_json::to_vec(value).unwrap_or_default(),
            notify: None,
        }
    }

    pub fn with_notify(mut self, notify: Notify) -> Self {
        self.notify = Some(notify);
        self
    }
}

/// Resolves a CoAP peer's address to an [`Origin`] (§3 I6, §9 open question). The HTTP proxy
/// always dials the loopback CoAP listener (`homegate_common::defaults::coap_loopback_addr`),
/// so a loopback source is treated as a trusted local client; any other source is the device
/// itself, identified by its address.
pub fn origin_for(peer: Ipv4Addr) -> Origin {
    if peer.is_loopback() {
        Origin::LocalClient
    } else {
        Origin::Device(peer)
    }
}

/// Splits a CoAP Uri-Path option list into segments, rejecting the empty path (mirrors the
/// teacher's `uri_parser`, generalized to this tree's variable-depth paths).
pub fn path_segments(raw: &std::collections::LinkedList<Vec<u8>>) -> Result<Vec<String>, homegate_common::GatewayError> {
    let segments: Result<Vec<String>, _> = raw
        .iter()
        .map(|seg| String::from_utf8(seg.clone()))
        .collect();
    let segments = segments.map_err(|_| {
        homegate_common::GatewayError::BadRequest("path segment is not valid UTF-8".into())
    })?;
    if segments.is_empty() || segments.iter().all(|s| s.is_empty()) {
        return Err(homegate_common::GatewayError::NotFound("empty path".into()));
    }
    Ok(segments)
}

/// Routes a parsed request to its resource handler by the first Uri-Path segment (§4.4).
pub fn route(ctx: &crate::context::ServerContext, req: &ResourceRequest) -> Result<ResourceResponse, homegate_common::GatewayError> {
    match req.segments.split_first() {
        Some((head, rest)) if head == "info" && rest.is_empty() => crate::resources::info::handle(ctx, req),
        Some((head, rest)) if head == "services" && rest.is_empty() => crate::resources::services::handle(ctx, req),
        Some((head, rest)) if head == "configs" && rest.is_empty() => crate::resources::configs::handle(ctx, req),
        Some((head, rest)) if head == "devices" => crate::resources::devices::handle(ctx, req, rest),
        _ => Err(homegate_common::GatewayError::NotFound("no such resource".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_peer_is_a_local_client() {
        assert_eq!(
            origin_for(Ipv4Addr::new(127, 0, 0, 1)),
            Origin::LocalClient
        );
    }

    #[test]
    fn non_loopback_peer_is_the_device() {
        let addr = Ipv4Addr::new(192, 168, 1, 42);
        assert_eq!(origin_for(addr), Origin::Device(addr));
    }
}
