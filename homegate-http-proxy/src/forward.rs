use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use coap_lite::RequestType;
use homegate_common::{coap_client, error::coap_to_http, GatewayError};
use std::time::Duration;

/// Mirrors one HTTP request onto a CoAP request on the same path (§4.5). Opens a fresh CoAP
/// client per call, per the documented open-question resolution (request rate is small enough
/// that the per-call connection cost is acceptable).
pub async fn forward(
    method: RequestType,
    coap_addr: &str,
    timeout: Duration,
    req: &HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    if !body.is_empty() {
        match req.headers().get(header::CONTENT_TYPE) {
            Some(v) if v.as_bytes().starts_with(b"application/json") => {}
            _ => {
                return error_response(GatewayError::UnsupportedMediaType(
                    "Content-Type must be application/json".into(),
                ))
            }
        }
    }
    if let Some(accept) = req.headers().get(header::ACCEPT) {
        let accept = accept.to_str().unwrap_or("");
        if !accept.is_empty() && accept != "*/*" && !accept.contains("application/json") {
            return error_response(GatewayError::NotAcceptable(
                "Accept must be application/json".into(),
            ));
        }
    }

    let mut url = format!("coap://{coap_addr}{}", req.path());
    if let Some(query) = req.uri().query() {
        url.push('?');
        url.push_str(query);
    }

    match coap_client::request(method, url, body.to_vec(), timeout).await {
        Ok(reply) => {
            let status = coap_to_http(reply.status)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_client_error() || status.is_server_error() {
                // The CoAP mirror adds a `status_line` field on top of the shared envelope
                // (§7); extract just `error_msg` and rebuild the HTTP-side envelope from it.
                let error_msg = serde_json::from_slice::<serde_json::Value>(&reply.payload)
                    .ok()
                    .and_then(|v| v.get("error_msg").and_then(|m| m.as_str()).map(str::to_string))
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
                HttpResponse::build(status).json(homegate_common::ErrorResponse {
                    error_code: status.as_u16(),
                    error_msg,
                })
            } else if reply.payload.is_empty() {
                HttpResponse::build(status).finish()
            } else {
                HttpResponse::build(status)
                    .content_type("application/json")
                    .body(reply.payload)
            }
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: GatewayError) -> HttpResponse {
    log::warn!("proxy request failed: {err}");
    HttpResponse::build(err.http_status()).json(err.error_response_body())
}
