use crate::aws_shadow::AwsShadowClient;
use crate::config::CloudSyncConfig;
use crate::proprietary::ProprietaryCloudClient;
use homegate_registry::{SyncEvent, SyncSink};
use std::sync::Arc;
use std::time::Duration;

/// Fans a [`SyncEvent`] out to whichever sinks are configured. Each event is handled on its
/// own detached task (§4.6, §5): the registry's call into [`SyncSink::dispatch`] never blocks
/// on network I/O, and a sink failure is logged and dropped, never surfaced to the caller.
pub type UniversalIdCallback = Arc<dyn Fn(u32, String) + Send + Sync>;

pub struct CloudSyncDispatcher {
    proprietary: Option<Arc<ProprietaryCloudClient>>,
    aws: Option<Arc<AwsShadowClient>>,
    on_universal_id: Option<UniversalIdCallback>,
}

impl CloudSyncDispatcher {
    pub fn new(
        proprietary: Option<ProprietaryCloudClient>,
        aws: Option<AwsShadowClient>,
        on_universal_id: Option<UniversalIdCallback>,
    ) -> Self {
        Self {
            proprietary: proprietary.map(Arc::new),
            aws: aws.map(Arc::new),
            on_universal_id,
        }
    }

    pub async fn from_config(config: &CloudSyncConfig, on_universal_id: Option<UniversalIdCallback>) -> Self {
        let proprietary = if config.proprietary_enabled() {
            Some(ProprietaryCloudClient::new(
                config.cloud_base_url.clone().unwrap(),
                config.email.clone().unwrap(),
                config.password.clone().unwrap_or_default(),
                Duration::from_secs(config.comm_timeout_secs),
            ))
        } else {
            None
        };
        let aws = if config.aws_enabled() {
            match (&config.aws_access_key_id, &config.aws_secret_access_key) {
                (Some(key), Some(secret)) => Some(AwsShadowClient::new(key, secret).await),
                _ => {
                    log::warn!("AWS_INTEGRATION set but credentials are missing; disabling AWS sync");
                    None
                }
            }
        } else {
            None
        };
        Self::new(proprietary, aws, on_universal_id)
    }
}

impl SyncSink for CloudSyncDispatcher {
    fn dispatch(&self, event: SyncEvent) {
        if let Some(client) = self.proprietary.clone() {
            let event = event.clone();
            let on_universal_id = self.on_universal_id.clone();
            tokio::spawn(async move {
                let result = match &event {
                    SyncEvent::Registered(info) | SyncEvent::Heartbeat(info) => {
                        match client.register(info).await {
                            Ok(Some(universal_id)) => {
                                if let Some(cb) = &on_universal_id {
                                    cb(info.local_id, universal_id);
                                }
                                Ok(())
                            }
                            Ok(None) => Ok(()),
                            Err(err) => Err(err),
                        }
                    }
                    SyncEvent::StateChanged(info) => client.state_changed(info).await,
                    SyncEvent::Unregistered { universal_id: Some(id), .. } => {
                        client.unregister(id).await
                    }
                    SyncEvent::Unregistered { universal_id: None, .. } => Ok(()),
                };
                if let Err(err) = result {
                    log::warn!("proprietary cloud sync failed: {err}");
                }
            });
        }

        if let Some(client) = self.aws.clone() {
            tokio::spawn(async move {
                match event {
                    SyncEvent::Registered(info) => {
                        if let Err(err) = client.register(&info).await {
                            log::warn!("AWS registration failed: {err}");
                        }
                    }
                    SyncEvent::StateChanged(info) | SyncEvent::Heartbeat(info) => {
                        client.publish_shadow(&info).await;
                    }
                    SyncEvent::Unregistered { .. } => {}
                }
            });
        }
    }
}
