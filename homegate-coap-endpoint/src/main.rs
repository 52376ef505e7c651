mod context;
mod dispatch;
mod handler;
mod notifier;
mod observers;
mod resources;

use coap::Server;
use context::ServerContext;
use futures::TryFutureExt;
use homegate_cloud_sync::{AwsShadowPoller, CloudSyncConfig, CloudSyncDispatcher};
use homegate_common::health::{HealthServer, HealthServerConfig};
use homegate_common::{ConfigFromEnv, ServerConfStore};
use homegate_registry::{CoapLivenessProbe, Registry};
use homegate_types::{Catalog, CatalogPaths};
use notifier::UdpNotifier;
use observers::ObserverTable;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// CoAP-endpoint-local settings (§6). Cloud Sync and catalog/server-conf paths are loaded
/// through their own structs so each crate owns the env vars it actually reads.
#[derive(Clone, Debug, Deserialize)]
struct GatewayConfig {
    #[serde(default = "homegate_common::defaults::coap_bind_addr")]
    coap_bind_addr: String,
    #[serde(default = "default_data_dir")]
    data_dir: String,
    #[serde(default = "homegate_common::defaults::device_probe_timeout_secs")]
    devices_monitoring_timeout: u64,
    #[serde(default = "homegate_common::defaults::device_monitor_tick_secs")]
    device_monitor_tick_secs: u64,
    #[serde(default)]
    health: HealthServerConfig,
}

fn default_data_dir() -> String {
    ".".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            coap_bind_addr: homegate_common::defaults::coap_bind_addr(),
            data_dir: default_data_dir(),
            devices_monitoring_timeout: homegate_common::defaults::device_probe_timeout_secs(),
            device_monitor_tick_secs: homegate_common::defaults::device_monitor_tick_secs(),
            health: HealthServerConfig::default(),
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = GatewayConfig::from_env().unwrap_or_else(|err| {
        log::warn!("using default GatewayConfig, environment did not parse: {err}");
        GatewayConfig::default()
    });
    let cloud_config = CloudSyncConfig::from_env().unwrap_or_else(|err| {
        log::warn!("Cloud Sync disabled, environment did not parse: {err}");
        CloudSyncConfig {
            allow_working_offline: true,
            cloud_base_url: None,
            email: None,
            password: None,
            aws_integration: false,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            coap_addr: homegate_common::defaults::coap_loopback_addr(),
            comm_timeout_secs: homegate_common::defaults::comm_timeout_secs(),
            aws_poll_tick_secs: homegate_common::defaults::aws_poll_tick_secs(),
        }
    });

    let data_dir = PathBuf::from(&config.data_dir);
    let catalog = Arc::new(Catalog::load(CatalogPaths {
        value_types: data_dir.join("value_types.json"),
        property_types: data_dir.join("property_types.json"),
        device_types: data_dir.join("device_types.json"),
        services: data_dir.join("services.json"),
    })?);
    let server_conf = Arc::new(ServerConfStore::load(data_dir.join("serverconf.json"))?);

    // The dispatcher needs to call back into the registry on a freshly-assigned
    // universal_id, but the registry needs the dispatcher (as its SyncSink) to exist first.
    // A slot filled in right after construction breaks the cycle.
    let registry_slot: Arc<OnceLock<Arc<Registry>>> = Arc::new(OnceLock::new());
    let callback_slot = registry_slot.clone();
    let on_universal_id: homegate_cloud_sync::dispatcher::UniversalIdCallback = Arc::new(move |id, universal_id| {
        if let Some(registry) = callback_slot.get() {
            registry.set_universal_id(id, universal_id);
        }
    });
    let dispatcher = CloudSyncDispatcher::from_config(&cloud_config, Some(on_universal_id)).await;

    let registry = Arc::new(Registry::new(
        catalog.clone(),
        Arc::new(dispatcher),
        Arc::new(CoapLivenessProbe),
        Duration::from_secs(config.devices_monitoring_timeout),
    ));
    registry_slot.set(registry.clone()).ok();

    let term_event = registry.term_event();
    tokio::spawn(registry.clone().monitor_loop(Duration::from_secs(config.device_monitor_tick_secs)));

    if cloud_config.aws_enabled() {
        if let (Some(key), Some(secret)) = (&cloud_config.aws_access_key_id, &cloud_config.aws_secret_access_key) {
            let client = homegate_cloud_sync::AwsShadowClient::new(key, secret).await;
            let poller = AwsShadowPoller::new(client, &cloud_config);
            let term_event = term_event.clone();
            tokio::spawn(poller.run(Duration::from_secs(cloud_config.aws_poll_tick_secs), term_event));
        }
    }

    let ctx = Arc::new(ServerContext {
        catalog,
        registry,
        server_conf,
        observers: Arc::new(ObserverTable::new()),
    });
    let notifier: Arc<dyn notifier::Notifier> = Arc::new(UdpNotifier::bind("0.0.0.0:0").await?);

    log::info!("CoAP endpoint listening on {}", config.coap_bind_addr);
    let mut server = Server::new(config.coap_bind_addr.clone()).unwrap();
    let coap_loop = server.run(move |request| {
        let ctx = ctx.clone();
        let notifier = notifier.clone();
        async move { handler::handle(request, ctx, notifier).await }
    });

    let health = HealthServer::new(
        config.health,
        vec![Box::new(homegate_cloud_sync::CloudReachability::new(&cloud_config))],
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutdown signal received");
            term_event.store(true, Ordering::SeqCst);
        }
    });

    futures::try_join!(health.run(), coap_loop.err_into())?;
    Ok(())
}
