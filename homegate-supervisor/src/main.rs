mod child;
mod config;
mod control;

use child::ManagedChild;
use config::SupervisorConfig;
use control::ControlSocket;
use homegate_common::ConfigFromEnv;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = SupervisorConfig::from_env().unwrap_or_else(|err| {
        log::warn!("using default SupervisorConfig, environment did not parse: {err}");
        SupervisorConfig::default()
    });

    let term_event = Arc::new(AtomicBool::new(false));
    let cooldown = Duration::from_secs(config.restart_cooldown_secs);
    let max_backoff = Duration::from_secs(config.max_restart_backoff_secs);

    let coap_child = Arc::new(ManagedChild::new("CoAP server", config.coap_endpoint_bin.clone(), cooldown, max_backoff));
    let proxy_child = Arc::new(ManagedChild::new("Proxy", config.http_proxy_bin.clone(), cooldown, max_backoff));

    let coap_state = coap_child.state_handle();
    let proxy_state = proxy_child.state_handle();

    let control = ControlSocket::bind(&config.control_socket_path)?;
    log::info!("control socket listening on {}", config.control_socket_path);

    let coap_task = {
        let term_event = term_event.clone();
        let coap_child = coap_child.clone();
        tokio::spawn(async move { coap_child.supervise(term_event).await })
    };
    let proxy_task = {
        let term_event = term_event.clone();
        let proxy_child = proxy_child.clone();
        tokio::spawn(async move { proxy_child.supervise(term_event).await })
    };
    let control_task = {
        let term_event = term_event.clone();
        tokio::spawn(async move { control.serve(term_event, coap_state, proxy_state).await })
    };

    let ctrlc_term_event = term_event.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("received ctrl-c, shutting down");
            ctrlc_term_event.store(true, Ordering::SeqCst);
        }
    });

    let (coap_res, proxy_res, control_res) = tokio::join!(coap_task, proxy_task, control_task);
    coap_res??;
    proxy_res??;
    control_res??;

    log::info!("supervisor exiting");
    Ok(())
}
