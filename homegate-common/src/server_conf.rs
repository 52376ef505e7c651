use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::GatewayError;

/// `serverconf.json` (§6): the gateway's own identity and reachability, plus the proprietary
/// cloud credentials. Distinct from the type catalog -- this is a single record, not a list,
/// and it is the one resource only a local client may rewrite (`/info` is owner-only).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConf {
    pub id: String,
    pub name: String,
    pub coap_address: String,
    pub coap_port: u16,
    pub proxy_address: String,
    pub proxy_port: u16,
    pub multicast: bool,
    pub timeout: u64,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for ServerConf {
    fn default() -> Self {
        Self {
            id: "homegate".into(),
            name: "Home Server".into(),
            coap_address: "0.0.0.0".into(),
            coap_port: 5683,
            proxy_address: "0.0.0.0".into(),
            proxy_port: 8080,
            multicast: false,
            timeout: crate::defaults::comm_timeout_secs(),
            email: None,
            password: None,
        }
    }
}

/// Holds the current `ServerConf` and the path it was loaded from, so `/info` PUT can
/// persist a whole-file rewrite the same way the type catalog does (§4.1, §6).
pub struct ServerConfStore {
    path: PathBuf,
    current: RwLock<ServerConf>,
}

impl ServerConfStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, GatewayError> {
        let path = path.into();
        let current = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| GatewayError::Internal(format!("serverconf.json: {e}")))?,
            Err(_) => {
                log::info!(
                    "FILE: {} not found, starting with default server config",
                    path.display()
                );
                ServerConf::default()
            }
        };
        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    pub fn get(&self) -> ServerConf {
        self.current.read().unwrap().clone()
    }

    pub fn replace(&self, conf: ServerConf) -> Result<(), GatewayError> {
        write_atomic(&self.path, &conf)?;
        *self.current.write().unwrap() = conf;
        Ok(())
    }
}

fn write_atomic<T: Serialize>(path: &Path, doc: &T) -> Result<(), GatewayError> {
    let tmp = path.with_extension("json.tmp");
    let text = serde_json::to_string_pretty(doc)
        .map_err(|e| GatewayError::Internal(format!("serializing {}: {e}", path.display())))?;
    std::fs::write(&tmp, text)
        .map_err(|e| GatewayError::Internal(format!("writing {}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| GatewayError::Internal(format!("installing {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ServerConfStore::load(dir.path().join("serverconf.json")).unwrap();
        assert_eq!(store.get().name, "Home Server");
    }

    #[test]
    fn replace_persists_for_the_next_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serverconf.json");
        let store = ServerConfStore::load(&path).unwrap();
        let mut conf = store.get();
        conf.name = "Renamed Gateway".into();
        store.replace(conf).unwrap();

        let reloaded = ServerConfStore::load(&path).unwrap();
        assert_eq!(reloaded.get().name, "Renamed Gateway");
    }
}
