use homegate_registry::DeviceInfo;
use serde_json::Value;
use std::time::Duration;

/// CSRF-then-basic-auth session client for the proprietary cloud (§4.6a). Grounded on the
/// source's `regist_device_on_cloud`/`unregist_device_from_cloud`: a HEAD to `/login/` mints a
/// CSRF cookie, then every request carries both the cookie header and HTTP basic auth.
pub struct ProprietaryCloudClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
    timeout: Duration,
}

impl ProprietaryCloudClient {
    pub fn new(base_url: String, email: String, password: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            email,
            password,
            timeout,
        }
    }

    async fn csrf_token(&self) -> Result<String, reqwest::Error> {
        let resp = self
            .http
            .head(format!("{}/login/", self.base_url.trim_end_matches('/')))
            .send()
            .await?;
        let token = resp
            .cookies()
            .find(|c| c.name() == "csrftoken")
            .map(|c| c.value().to_string())
            .unwrap_or_default();
        Ok(token)
    }

    /// PATCH an existing `universal_id` if known; otherwise POST and scan the (tolerant
    /// array-or-object) response for the address match, adopting the assigned id (§4.6a, §9).
    pub async fn register(&self, device: &DeviceInfo) -> Result<Option<String>, reqwest::Error> {
        let csrf = self.csrf_token().await?;
        let body = serde_json::json!({
            "name": device.name,
            "address": device.address,
            "device_type": device.device_type,
            "services": device.services,
            "state": simplified(&device.current_state),
        });

        if let Some(universal_id) = &device.universal_id {
            let resp = self
                .http
                .patch(format!(
                    "{}/api/devices/{}/",
                    self.base_url.trim_end_matches('/'),
                    universal_id
                ))
                .basic_auth(&self.email, Some(&self.password))
                .header("X-CSRFToken", &csrf)
                .json(&body)
                .timeout(self.timeout)
                .send()
                .await?;
            if resp.status().is_success() {
                return Ok(Some(universal_id.clone()));
            }
        }

        let resp = self
            .http
            .post(format!("{}/api/devices/", self.base_url.trim_end_matches('/')))
            .basic_auth(&self.email, Some(&self.password))
            .header("X-CSRFToken", &csrf)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Ok(None);
        }
        let parsed: Value = resp.json().await.unwrap_or(Value::Null);
        Ok(scan_for_address(&parsed, &device.address))
    }

    pub async fn state_changed(&self, device: &DeviceInfo) -> Result<(), reqwest::Error> {
        let Some(universal_id) = &device.universal_id else {
            return Ok(());
        };
        let csrf = self.csrf_token().await?;
        self.http
            .patch(format!(
                "{}/api/devices/{}/",
                self.base_url.trim_end_matches('/'),
                universal_id
            ))
            .basic_auth(&self.email, Some(&self.password))
            .header("X-CSRFToken", &csrf)
            .json(&serde_json::json!({ "state": simplified(&device.current_state) }))
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(())
    }

    pub async fn unregister(&self, universal_id: &str) -> Result<(), reqwest::Error> {
        let csrf = self.csrf_token().await?;
        self.http
            .delete(format!(
                "{}/api/devices/{}/",
                self.base_url.trim_end_matches('/'),
                universal_id
            ))
            .basic_auth(&self.email, Some(&self.password))
            .header("X-CSRFToken", &csrf)
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(())
    }
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

/// Tolerates both a bare record and a list of records (§9 open question).
fn scan_for_address(parsed: &Value, address: &str) -> Option<String> {
    let candidates: Vec<&Value> = match parsed {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![parsed],
        _ => vec![],
    };
    for item in candidates {
        if item.get("address").and_then(Value::as_str) == Some(address) {
            return item
                .get("id")
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_accepts_both_array_and_object_shapes() {
        let array = serde_json::json!([{"address": "192.168.1.50", "id": 7}]);
        assert_eq!(scan_for_address(&array, "192.168.1.50"), Some("7".into()));

        let object = serde_json::json!({"address": "192.168.1.50", "id": "abc"});
        assert_eq!(scan_for_address(&object, "192.168.1.50"), Some("abc".into()));

        let miss = serde_json::json!([{"address": "10.0.0.1", "id": 1}]);
        assert_eq!(scan_for_address(&miss, "192.168.1.50"), None);
    }
}
