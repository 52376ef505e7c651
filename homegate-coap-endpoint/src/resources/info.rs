use crate::context::ServerContext;
use crate::dispatch::{Method, ResourceRequest, ResourceResponse};
use coap_lite::ResponseType;
use homegate_common::{GatewayError, ServerConf};
use homegate_registry::Origin;

/// `/info` (§4.4): the gateway's own identity. PUT is owner-only -- only a local client may
/// rewrite it, never a device (§7 "admin write by non-owner" -> Forbidden).
pub fn handle(ctx: &ServerContext, req: &ResourceRequest) -> Result<ResourceResponse, GatewayError> {
    match req.method {
        Method::Get => Ok(ResourceResponse::ok_json(ResponseType::Content, &ctx.server_conf.get())),
        Method::Put => {
            if req.origin != Origin::LocalClient {
                return Err(GatewayError::Forbidden(
                    "/info may only be updated by a local client".into(),
                ));
            }
            let conf: ServerConf = serde_json::from_slice(req.body)
                .map_err(|e| GatewayError::BadRequest(format!("malformed server config: {e}")))?;
            ctx.server_conf.replace(conf.clone())?;
            Ok(ResourceResponse::ok_json(ResponseType::Changed, &conf))
        }
        _ => Err(GatewayError::MethodNotAllowed),
    }
}
