use crate::defaults;
use actix_web::{web, web::Data, App, HttpResponse, HttpServer};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct HealthServerConfig {
    #[serde(default = "defaults::health_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "defaults::health_workers")]
    pub workers: usize,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: defaults::health_bind_addr(),
            workers: defaults::health_workers(),
        }
    }
}

#[derive(Debug)]
pub struct HealthCheckError(pub String);

/// One thing worth reporting on: cloud reachability for the CoAP endpoint,
/// CoAP reachability for the HTTP proxy, child liveness for the supervisor.
#[async_trait]
pub trait HealthChecked: Send + Sync {
    async fn is_alive(&self) -> Result<(), HealthCheckError> {
        Ok(())
    }
    async fn is_ready(&self) -> Result<(), HealthCheckError>;
}

pub struct HealthChecker {
    checks: Vec<Box<dyn HealthChecked>>,
}

impl HealthChecker {
    pub async fn is_ready(&self) -> Vec<Result<(), HealthCheckError>> {
        stream::iter(self.checks.iter())
            .then(|check| check.is_ready())
            .collect()
            .await
    }

    pub async fn is_alive(&self) -> Vec<Result<(), HealthCheckError>> {
        stream::iter(self.checks.iter())
            .then(|check| check.is_alive())
            .collect()
            .await
    }
}

pub struct HealthServer {
    config: HealthServerConfig,
    checker: HealthChecker,
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({}))
}

async fn readiness(checker: Data<HealthChecker>) -> HttpResponse {
    let results = checker.is_ready().await;
    respond(results)
}

async fn liveness(checker: Data<HealthChecker>) -> HttpResponse {
    let results = checker.is_alive().await;
    respond(results)
}

fn respond(results: Vec<Result<(), HealthCheckError>>) -> HttpResponse {
    if results.iter().all(Result::is_ok) {
        HttpResponse::Ok().json(json!({"success": true}))
    } else {
        HttpResponse::ServiceUnavailable().json(json!({"success": false}))
    }
}

impl HealthServer {
    pub fn new(config: HealthServerConfig, checks: Vec<Box<dyn HealthChecked>>) -> Self {
        Self {
            config,
            checker: HealthChecker { checks },
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let checker = Data::new(self.checker);

        HttpServer::new(move || {
            App::new()
                .app_data(checker.clone())
                .route("/", web::get().to(index))
                .route("/readiness", web::get().to(readiness))
                .route("/liveness", web::get().to(liveness))
        })
        .bind(self.config.bind_addr)?
        .workers(self.config.workers)
        .run()
        .await?;

        Ok(())
    }
}
