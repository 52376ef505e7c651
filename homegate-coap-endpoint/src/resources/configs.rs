use crate::context::ServerContext;
use crate::dispatch::{Method, ResourceRequest, ResourceResponse};
use coap_lite::ResponseType;
use homegate_common::GatewayError;
use homegate_types::CatalogKind;
use serde_json::json;

/// `/configs` (§4.4): GET returns the whole type catalog; PUT replaces exactly one of the
/// four immutable-at-runtime kinds, selected by `?type=`.
pub fn handle(ctx: &ServerContext, req: &ResourceRequest) -> Result<ResourceResponse, GatewayError> {
    match req.method {
        Method::Get => Ok(ResourceResponse::ok_json(
            ResponseType::Content,
            &json!({
                "SCALAR_TYPES": ctx.catalog.scalar_types(),
                "ENUM_TYPES": ctx.catalog.enum_types(),
                "PROPERTY_TYPES": ctx.catalog.property_types(),
                "DEVICE_TYPES": ctx.catalog.device_types(),
            }),
        )),
        Method::Put => {
            let kind = req
                .query
                .and_then(parse_type_query)
                .and_then(CatalogKind::from_query)
                .ok_or_else(|| GatewayError::BadRequest("?type= is missing or unrecognized".into()))?;
            let list: Vec<serde_json::Value> = serde_json::from_slice(req.body)
                .map_err(|e| GatewayError::BadRequest(format!("malformed config list: {e}")))?;
            ctx.catalog.replace(kind, list)?;
            Ok(ResourceResponse {
                status: ResponseType::Changed,
                payload: Vec::new(),
                notify: None,
            })
        }
        _ => Err(GatewayError::MethodNotAllowed),
    }
}

fn parse_type_query(query: &str) -> Option<&str> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("type="))
}
