use crate::context::ServerContext;
use crate::dispatch::{Method, ResourceRequest, ResourceResponse};
use coap_lite::ResponseType;
use homegate_common::GatewayError;
use homegate_types::ServiceUpdate;

/// `/services` (§4.4): the mutable service catalog, separate from the immutable-at-runtime
/// type documents (§3, §4.1).
pub fn handle(ctx: &ServerContext, req: &ResourceRequest) -> Result<ResourceResponse, GatewayError> {
    match req.method {
        Method::Get => Ok(ResourceResponse::ok_json(ResponseType::Content, &ctx.catalog.services())),
        Method::Put => {
            let list: Vec<ServiceUpdate> = serde_json::from_slice(req.body)
                .map_err(|e| GatewayError::BadRequest(format!("malformed services list: {e}")))?;
            ctx.catalog.replace_services(list)?;
            Ok(ResourceResponse::ok_json(ResponseType::Changed, &ctx.catalog.services()))
        }
        _ => Err(GatewayError::MethodNotAllowed),
    }
}
