use crate::error::GatewayError;
use coap_lite::{MessageClass, RequestType, ResponseType};
use std::time::Duration;

/// A CoAP reply preserving both the response code (needed by the HTTP proxy's code
/// translation, §4.5) and the payload.
pub struct CoapReply {
    pub status: ResponseType,
    pub payload: Vec<u8>,
}

/// Opens a fresh CoAP client per call and closes it on return (§9 open question resolution) --
/// shared by the HTTP proxy, the device monitor's liveness probe, and Cloud Sync's shadow
/// poller, all of which talk CoAP as a client rather than a server.
pub async fn request(method: RequestType, url: String, body: Vec<u8>, timeout: Duration) -> Result<CoapReply, GatewayError> {
    let joined = tokio::time::timeout(
        timeout,
        tokio::task::spawn_blocking(move || match method {
            RequestType::Get => coap::CoAPClient::get_with_timeout(&url, timeout),
            RequestType::Put => coap::CoAPClient::put(&url, body),
            RequestType::Post => coap::CoAPClient::post(&url, body),
            RequestType::Delete => coap::CoAPClient::delete(&url),
            _ => Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "unsupported CoAP method")),
        }),
    )
    .await
    .map_err(|_| GatewayError::Timeout)?
    .map_err(|e| GatewayError::Internal(format!("coap client join: {e}")))?;

    let response = joined.map_err(|e| {
        log::warn!("coap {method:?} failed: {e}");
        GatewayError::Timeout
    })?;

    let status = match response.message.header.code {
        MessageClass::Response(status) => status,
        other => {
            return Err(GatewayError::Internal(format!(
                "unexpected CoAP message class in reply: {other:?}"
            )))
        }
    };
    Ok(CoapReply {
        status,
        payload: response.message.payload,
    })
}

pub async fn get(url: String, timeout: Duration) -> Result<Vec<u8>, GatewayError> {
    request(RequestType::Get, url, Vec::new(), timeout)
        .await
        .map(|reply| reply.payload)
}

pub async fn put(url: String, body: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, GatewayError> {
    request(RequestType::Put, url, body, timeout)
        .await
        .map(|reply| reply.payload)
}
