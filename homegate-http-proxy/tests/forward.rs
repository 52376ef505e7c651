use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use actix_web::web::Bytes;
use coap_lite::RequestType;
use std::time::Duration;

#[path = "../src/forward.rs"]
mod forward;

#[actix_rt::test]
async fn body_without_json_content_type_is_rejected() {
    let req = TestRequest::put().uri("/devices/1/state").to_http_request();
    let resp = forward::forward(
        RequestType::Put,
        "127.0.0.1:5683",
        Duration::from_secs(5),
        &req,
        Bytes::from_static(b"{}"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[actix_rt::test]
async fn non_json_accept_header_is_rejected() {
    let req = TestRequest::get()
        .uri("/devices")
        .insert_header(("Accept", "text/html"))
        .to_http_request();
    let resp = forward::forward(
        RequestType::Get,
        "127.0.0.1:5683",
        Duration::from_secs(5),
        &req,
        Bytes::new(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
}
