use crate::context::ServerContext;
use crate::dispatch::{self, Method, ResourceRequest};
use crate::notifier::Notifier;
use coap_lite::{CoapOption, CoapRequest, CoapResponse, MessageClass, RequestType};
use homegate_common::GatewayError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

const OBSERVABLE_PATHS: &[&str] = &["/devices", "/devices/{id}", "/devices/{id}/state"];

fn method_of(request: &CoapRequest<SocketAddr>) -> Result<Method, GatewayError> {
    match request.message.header.code {
        MessageClass::Request(RequestType::Get) => Ok(Method::Get),
        MessageClass::Request(RequestType::Post) => Ok(Method::Post),
        MessageClass::Request(RequestType::Put) => Ok(Method::Put),
        MessageClass::Request(RequestType::Delete) => Ok(Method::Delete),
        _ => Err(GatewayError::MethodNotAllowed),
    }
}

fn option_value(request: &CoapRequest<SocketAddr>, option: CoapOption) -> Option<u32> {
    request
        .message
        .get_option(option)
        .and_then(|values| values.front())
        .map(|bytes| decode_uint(bytes))
}

fn decode_uint(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

/// JSON content-format id per RFC 7252 §12.3 / the CoAP content-format registry.
const APPLICATION_JSON: u32 = 50;

fn query_string(request: &CoapRequest<SocketAddr>) -> Option<String> {
    request
        .message
        .get_option(CoapOption::UriQuery)
        .and_then(|values| values.front())
        .and_then(|bytes| String::from_utf8(bytes.clone()).ok())
}

fn peer_addr(request: &CoapRequest<SocketAddr>) -> Ipv4Addr {
    match request.source {
        Some(SocketAddr::V4(v4)) => *v4.ip(),
        Some(SocketAddr::V6(_)) | None => Ipv4Addr::UNSPECIFIED,
    }
}

/// A notification path name may carry a concrete id (`/devices/7/state`); the observable
/// paths list above is a template. Registration keys on the concrete path so two devices'
/// observers never collide.
fn dispatch_one(ctx: &ServerContext, request: &CoapRequest<SocketAddr>) -> Result<(String, crate::dispatch::ResourceResponse), GatewayError> {
    let segments = dispatch::path_segments(
        request
            .message
            .get_option(CoapOption::UriPath)
            .ok_or_else(|| GatewayError::NotFound("no path".into()))?,
    )?;
    let method = method_of(request)?;
    let query = query_string(request);

    if matches!(method, Method::Put | Method::Post) {
        match option_value(request, CoapOption::ContentFormat) {
            Some(APPLICATION_JSON) | None => {}
            Some(_) => return Err(GatewayError::UnsupportedMediaType("only application/json is accepted".into())),
        }
    }
    if let Some(accept) = option_value(request, CoapOption::Accept) {
        if accept != APPLICATION_JSON {
            return Err(GatewayError::NotAcceptable("only application/json is produced".into()));
        }
    }

    let path = format!("/{}", segments.join("/"));
    let origin = dispatch::origin_for(peer_addr(request));
    let req = ResourceRequest {
        method,
        segments: &segments,
        query: query.as_deref(),
        origin,
        body: &request.message.payload,
    };
    let response = dispatch::route(ctx, &req)?;
    Ok((path, response))
}

pub async fn handle(
    mut request: CoapRequest<SocketAddr>,
    ctx: Arc<ServerContext>,
    notifier: Arc<dyn Notifier>,
) -> Option<CoapResponse> {
    let observe = option_value(&request, CoapOption::Observe);
    let peer = request.source;
    let method = method_of(&request);

    let outcome = dispatch_one(&ctx, &request);

    match outcome {
        Ok((path, resource_response)) => {
            if let (Ok(Method::Get), Some(observe_value), Some(peer)) = (&method, observe, peer) {
                if OBSERVABLE_PATHS.iter().any(|p| path_matches_template(p, &path)) {
                    if *observe_value == 0 {
                        ctx.observers.register(&path, peer);
                    } else {
                        ctx.observers.deregister(&path, peer);
                    }
                }
            }

            if let Some(notify) = &resource_response.notify {
                let sequence = ctx.observers.next_sequence();
                let targets = ctx
                    .observers
                    .targets_for(&notify.path, notify.origin, notify.device_addr);
                for target in targets {
                    notifier.notify(target, sequence, &resource_response.payload).await;
                }
            }

            if let Some(resp) = request.response.as_mut() {
                resp.set_status(resource_response.status);
                resp.message.payload = resource_response.payload;
            }
        }
        Err(err) => {
            log::warn!("request failed: {err}");
            if let Some(resp) = request.response.as_mut() {
                resp.set_status(err.coap_status());
                resp.message.payload = err.coap_payload();
            }
        }
    }

    request.response
}

fn path_matches_template(template: &str, path: &str) -> bool {
    let t: Vec<&str> = template.trim_start_matches('/').split('/').collect();
    let p: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    t.len() == p.len()
        && t.iter()
            .zip(p.iter())
            .all(|(t, p)| *t == "{id}" || t == p)
}
