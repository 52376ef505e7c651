use crate::context::ServerContext;
use crate::dispatch::{Method, Notify, ResourceRequest, ResourceResponse};
use crate::observers::NotifyOrigin;
use coap_lite::ResponseType;
use homegate_common::GatewayError;
use homegate_registry::{DeviceUpdate, NewDevice, Origin};
use std::net::Ipv4Addr;

/// Dispatches everything under `/devices` (§4.4). `rest` is the segment list after the
/// leading `"devices"` element: `[]`, `[id]`, `[id, "state"]`, `[id, "type"]` or
/// `[id, "services"]`.
pub fn handle(ctx: &ServerContext, req: &ResourceRequest, rest: &[String]) -> Result<ResourceResponse, GatewayError> {
    match rest {
        [] => list_or_create(ctx, req),
        [id] => one(ctx, req, parse_id(id)?),
        [id, tail] if tail == "state" => state(ctx, req, parse_id(id)?),
        [id, tail] if tail == "type" => device_type(ctx, req, parse_id(id)?),
        [id, tail] if tail == "services" => services(ctx, req, parse_id(id)?),
        _ => Err(GatewayError::NotFound("no such device resource".into())),
    }
}

fn parse_id(raw: &str) -> Result<u32, GatewayError> {
    raw.parse()
        .map_err(|_| GatewayError::BadRequest(format!("invalid device id ({raw})")))
}

fn origin_addr(origin: Origin) -> Ipv4Addr {
    match origin {
        Origin::Device(addr) => addr,
        Origin::LocalClient => Ipv4Addr::UNSPECIFIED,
    }
}

fn list_or_create(ctx: &ServerContext, req: &ResourceRequest) -> Result<ResourceResponse, GatewayError> {
    match req.method {
        Method::Get => {
            let origin = match req.origin {
                Origin::Device(addr) => Some(addr),
                Origin::LocalClient => None,
            };
            Ok(ResourceResponse::ok_json(ResponseType::Content, &ctx.registry.list(origin)))
        }
        Method::Post => {
            let body: NewDevice = serde_json::from_slice(req.body)
                .map_err(|e| GatewayError::BadRequest(format!("malformed device: {e}")))?;
            let origin_port = match req.origin {
                Origin::Device(_) => body.port.unwrap_or(5683),
                Origin::LocalClient => body.port.unwrap_or(5683),
            };
            let info = ctx.registry.create(origin_addr(req.origin), origin_port, body)?;
            let device_addr: Ipv4Addr = info.address.parse().unwrap_or(Ipv4Addr::UNSPECIFIED);
            Ok(ResourceResponse::ok_json(ResponseType::Created, &info).with_notify(Notify {
                path: "/devices".into(),
                origin: NotifyOrigin::Other,
                device_addr,
            }))
        }
        _ => Err(GatewayError::MethodNotAllowed),
    }
}

fn one(ctx: &ServerContext, req: &ResourceRequest, id: u32) -> Result<ResourceResponse, GatewayError> {
    match req.method {
        Method::Get => Ok(ResourceResponse::ok_json(ResponseType::Content, &ctx.registry.get(id)?)),
        Method::Put => {
            let body: DeviceUpdate = serde_json::from_slice(req.body)
                .map_err(|e| GatewayError::BadRequest(format!("malformed device update: {e}")))?;
            let info = ctx.registry.update(id, req.origin, body)?;
            let device_addr: Ipv4Addr = info.address.parse().unwrap_or(Ipv4Addr::UNSPECIFIED);
            Ok(ResourceResponse::ok_json(ResponseType::Changed, &info).with_notify(Notify {
                path: format!("/devices/{id}"),
                origin: NotifyOrigin::Other,
                device_addr,
            }))
        }
        Method::Delete => {
            let info = ctx.registry.get(id)?;
            let device_addr: Ipv4Addr = info.address.parse().unwrap_or(Ipv4Addr::UNSPECIFIED);
            ctx.registry.delete(id, req.origin)?;
            Ok(ResourceResponse {
                status: ResponseType::Deleted,
                payload: Vec::new(),
                notify: Some(Notify {
                    path: format!("/devices/{id}"),
                    origin: NotifyOrigin::Other,
                    device_addr,
                }),
            })
        }
        _ => Err(GatewayError::MethodNotAllowed),
    }
}

fn state(ctx: &ServerContext, req: &ResourceRequest, id: u32) -> Result<ResourceResponse, GatewayError> {
    match req.method {
        Method::Get => {
            let info = ctx.registry.get(id)?;
            Ok(ResourceResponse::ok_json(
                ResponseType::Content,
                &serde_json::json!({
                    "current": homegate_registry::Device::simplified_state(&info.current_state),
                    "desired": homegate_registry::Device::simplified_state(&info.desired_state),
                }),
            ))
        }
        Method::Put => {
            let body: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(req.body)
                .map_err(|e| GatewayError::BadRequest(format!("malformed state: {e}")))?;
            let (info, device_originated) = ctx.registry.write_state(id, req.origin, &body)?;
            let device_addr: Ipv4Addr = info.address.parse().unwrap_or(Ipv4Addr::UNSPECIFIED);
            // §4.3: device-originated writes notify everyone but the device; client-originated
            // writes notify only the device itself.
            let notify_origin = if device_originated {
                NotifyOrigin::Device(device_addr)
            } else {
                NotifyOrigin::Client
            };
            Ok(ResourceResponse::ok_json(ResponseType::Changed, &info).with_notify(Notify {
                path: format!("/devices/{id}/state"),
                origin: notify_origin,
                device_addr,
            }))
        }
        _ => Err(GatewayError::MethodNotAllowed),
    }
}

fn device_type(ctx: &ServerContext, req: &ResourceRequest, id: u32) -> Result<ResourceResponse, GatewayError> {
    match req.method {
        Method::Get => {
            let type_ref = ctx.registry.device_type_of(id)?;
            Ok(ResourceResponse::ok_json(ResponseType::Content, &ctx.catalog.device_type(type_ref)?))
        }
        _ => Err(GatewayError::MethodNotAllowed),
    }
}

fn services(ctx: &ServerContext, req: &ResourceRequest, id: u32) -> Result<ResourceResponse, GatewayError> {
    match req.method {
        Method::Get => Ok(ResourceResponse::ok_json(ResponseType::Content, &ctx.registry.services_of(id)?)),
        Method::Put | Method::Post => {
            let services: Vec<u32> = serde_json::from_slice(req.body)
                .map_err(|e| GatewayError::BadRequest(format!("malformed services: {e}")))?;
            let services = if req.method == Method::Post {
                let mut current = ctx.registry.services_of(id)?;
                for s in services {
                    if !current.contains(&s) {
                        current.push(s);
                    }
                }
                current
            } else {
                services
            };
            ctx.registry.set_services(id, services.clone())?;
            Ok(ResourceResponse::ok_json(ResponseType::Changed, &services))
        }
        Method::Delete => {
            let service_id: u32 = req
                .query
                .and_then(|q| q.split('&').find_map(|p| p.strip_prefix("id=")))
                .ok_or_else(|| GatewayError::BadRequest("?id= is missing".into()))?
                .parse()
                .map_err(|_| GatewayError::BadRequest("?id= is not a number".into()))?;
            let mut current = ctx.registry.services_of(id)?;
            current.retain(|s| *s != service_id);
            ctx.registry.set_services(id, current.clone())?;
            Ok(ResourceResponse::ok_json(ResponseType::Changed, &current))
        }
    }
}
