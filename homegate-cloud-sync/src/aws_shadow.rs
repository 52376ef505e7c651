use aws_sdk_iot::config::{Credentials, Region};
use homegate_registry::DeviceInfo;
use serde_json::Value;

pub fn thing_name(local_id: u32, name: &str) -> String {
    format!("{name}-{local_id}")
}

fn simplified(state: &[homegate_registry::StateSlot]) -> serde_json::Map<String, Value> {
    let mut map = serde_json::Map::new();
    for slot in state {
        map.insert(
            slot.property_id.to_string(),
            serde_json::to_value(&slot.value).unwrap(),
        );
    }
    map
}

fn shadow_payload(device: &DeviceInfo) -> Vec<u8> {
    serde_json::json!({
        "state": {
            "desired": simplified(&device.desired_state),
            "reported": simplified(&device.current_state),
        }
    })
    .to_string()
    .into_bytes()
}

/// Thin wrapper over the AWS IoT control plane (`create_thing`) and data plane
/// (`update_thing_shadow`/`get_thing_shadow`), grounded on the source's `AWSCommunicator`
/// (§4.6b).
pub struct AwsShadowClient {
    iot: aws_sdk_iot::Client,
    data: aws_sdk_iotdataplane::Client,
}

impl AwsShadowClient {
    pub async fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "homegate");
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .load()
            .await;
        Self {
            iot: aws_sdk_iot::Client::new(&config),
            data: aws_sdk_iotdataplane::Client::new(&config),
        }
    }

    pub async fn register(&self, device: &DeviceInfo) -> anyhow::Result<()> {
        let name = thing_name(device.local_id, &device.name);
        self.iot.create_thing().thing_name(&name).send().await?;
        self.publish_shadow(device).await;
        Ok(())
    }

    pub async fn unregister(&self, device: &DeviceInfo) {
        let name = thing_name(device.local_id, &device.name);
        log::info!("device {name} unregistered locally; its AWS thing is left in place");
    }

    pub async fn publish_shadow(&self, device: &DeviceInfo) {
        let name = thing_name(device.local_id, &device.name);
        let payload = aws_smithy_types::Blob::new(shadow_payload(device));
        if let Err(err) = self
            .data
            .update_thing_shadow()
            .thing_name(&name)
            .payload(payload)
            .send()
            .await
        {
            log::warn!("failed to update AWS shadow for {name}: {err}");
        }
    }

    /// Reads the shadow's `state.desired` document for the device identified by
    /// `local_id`/`name`, or `None` on any failure (logged, not surfaced -- cloud failures
    /// never block local operation, §7). Used by the poller, which only has the list view of
    /// a device, not its full [`DeviceInfo`].
    pub async fn desired_state_by_name(&self, local_id: u32, name: &str) -> Option<Value> {
        let thing = thing_name(local_id, name);
        let resp = self
            .data
            .get_thing_shadow()
            .thing_name(&thing)
            .send()
            .await
            .map_err(|err| log::warn!("failed to read AWS shadow for {thing}: {err}"))
            .ok()?;
        let bytes = resp.payload?.into_inner();
        let parsed: Value = serde_json::from_slice(&bytes).ok()?;
        parsed.get("state")?.get("desired").cloned()
    }
}
