mod config;
mod forward;
mod health_check;

use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use coap_lite::RequestType;
use config::ProxyConfig;
use homegate_common::health::HealthServer;
use homegate_common::{ConfigFromEnv, GatewayError};
use std::time::Duration;

struct AppState {
    coap_addr: String,
    timeout: Duration,
}

/// Every path under §4.4's tree lands here; the CoAP path and method are mirrored straight
/// through rather than re-declared route by route (the proxy does not know the resource
/// tree's shape, only that it is a 1:1 mirror of it).
async fn handle(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    let method = match *req.method() {
        actix_web::http::Method::GET => RequestType::Get,
        actix_web::http::Method::POST => RequestType::Post,
        actix_web::http::Method::PUT => RequestType::Put,
        actix_web::http::Method::DELETE => RequestType::Delete,
        _ => {
            let err = GatewayError::MethodNotAllowed;
            return HttpResponse::build(err.http_status()).json(err.error_response_body());
        }
    };
    forward::forward(method, &state.coap_addr, state.timeout, &req, body).await
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = ProxyConfig::from_env().unwrap_or_else(|err| {
        log::warn!("using default ProxyConfig, environment did not parse: {err}");
        ProxyConfig::default()
    });

    let state = web::Data::new(AppState {
        coap_addr: config.coap_addr.clone(),
        timeout: Duration::from_secs(config.comm_timeout_secs),
    });

    let health = HealthServer::new(
        config.health.clone(),
        vec![Box::new(health_check::CoapReachability::new(
            config.coap_addr.clone(),
            Duration::from_secs(config.comm_timeout_secs),
        ))],
    );

    log::info!("HTTP proxy listening on {}", config.proxy_bind_addr);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::new("%a \"%r\" %s"))
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(homegate_common::defaults::max_json_payload_size()))
            .default_service(web::route().to(handle))
    })
    .bind(config.proxy_bind_addr.clone())?
    .run();

    tokio::try_join!(health.run(), async { server.await.map_err(anyhow::Error::from) })?;
    Ok(())
}
