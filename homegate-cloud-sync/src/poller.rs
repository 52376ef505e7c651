use crate::aws_shadow::AwsShadowClient;
use crate::config::CloudSyncConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(serde::Deserialize)]
struct DeviceListEntry {
    local_id: u32,
    name: String,
}

/// Long-running poller (§4.6b, §5): every `tick`, lists local devices over CoAP, reads each
/// one's AWS shadow, and forwards a desired-state delta back as a local CoAP PUT. Grounded on
/// the source's `run_cloud_shadow_listener`.
pub struct AwsShadowPoller {
    client: AwsShadowClient,
    coap_addr: String,
    comm_timeout: Duration,
}

impl AwsShadowPoller {
    pub fn new(client: AwsShadowClient, config: &CloudSyncConfig) -> Self {
        Self {
            client,
            coap_addr: config.coap_addr.clone(),
            comm_timeout: Duration::from_secs(config.comm_timeout_secs),
        }
    }

    pub async fn run(self, tick: Duration, term_event: Arc<AtomicBool>) {
        let mut interval = tokio::time::interval(tick);
        let mut last_desired: HashMap<u32, Value> = HashMap::new();
        loop {
            interval.tick().await;
            if term_event.load(Ordering::SeqCst) {
                log::info!("AWS shadow poller stopping on term_event");
                return;
            }
            self.sweep(&mut last_desired).await;
        }
    }

    async fn sweep(&self, last_desired: &mut HashMap<u32, Value>) {
        let url = format!("coap://{}/devices", self.coap_addr);
        let body = match homegate_common::coap_client::get(url, self.comm_timeout).await {
            Ok(body) => body,
            Err(err) => {
                log::warn!("AWS shadow poller could not list local devices: {err}");
                return;
            }
        };
        let Ok(devices) = serde_json::from_slice::<Vec<DeviceListEntry>>(&body) else {
            log::warn!("AWS shadow poller got an unparsable /devices response");
            return;
        };

        for entry in devices {
            let Some(desired) = self.client.desired_state_by_name(entry.local_id, &entry.name).await else {
                continue;
            };
            if last_desired.get(&entry.local_id) == Some(&desired) {
                continue;
            }
            log::info!("AWS cloud desired-state update for device {}", entry.local_id);
            let put_url = format!("coap://{}/devices/{}/state", self.coap_addr, entry.local_id);
            let payload = desired.to_string().into_bytes();
            if let Err(err) = homegate_common::coap_client::put(put_url, payload, self.comm_timeout).await {
                log::warn!("failed to forward AWS desired state for device {}: {err}", entry.local_id);
                continue;
            }
            last_desired.insert(entry.local_id, desired);
        }
    }
}
