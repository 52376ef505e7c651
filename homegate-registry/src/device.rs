use homegate_types::Value;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Instant;

/// One property slot within a device's `current_state` or `desired_state` (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateSlot {
    pub property_id: u32,
    pub value: Value,
}

/// A device owned by the [`crate::Registry`] (§3). `last_access` is a monotonic instant,
/// never serialized -- callers read `DeviceInfo` for the wire view.
#[derive(Clone, Debug)]
pub struct Device {
    pub local_id: u32,
    pub universal_id: Option<String>,
    pub name: String,
    pub address: Ipv4Addr,
    pub port: u16,
    pub device_type_ref: u32,
    pub subscribed_services: Vec<u32>,
    pub timeout_seconds: u64,
    pub last_access: Instant,
    pub current_state: Vec<StateSlot>,
    pub desired_state: Vec<StateSlot>,
}

impl Device {
    pub fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    pub fn is_owner(&self, origin: Ipv4Addr) -> bool {
        self.address == origin
    }

    pub fn seconds_since_last_access(&self) -> u64 {
        self.last_access.elapsed().as_secs()
    }

    pub fn simplified_state(state: &[StateSlot]) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        for slot in state {
            map.insert(
                slot.property_id.to_string(),
                serde_json::to_value(&slot.value).unwrap(),
            );
        }
        map
    }
}

/// Wire view of a [`Device`] (§3, §8 R1): excludes `last_access` bookkeeping noise, includes
/// both states keyed by property id for API consumers.
#[derive(Clone, Debug, Serialize)]
pub struct DeviceInfo {
    pub local_id: u32,
    pub universal_id: Option<String>,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub device_type: u32,
    pub services: Vec<u32>,
    pub timeout: u64,
    pub current_state: Vec<StateSlot>,
    pub desired_state: Vec<StateSlot>,
}

impl From<&Device> for DeviceInfo {
    fn from(d: &Device) -> Self {
        Self {
            local_id: d.local_id,
            universal_id: d.universal_id.clone(),
            name: d.name.clone(),
            address: d.address.to_string(),
            port: d.port,
            device_type: d.device_type_ref,
            services: d.subscribed_services.clone(),
            timeout: d.timeout_seconds,
            current_state: d.current_state.clone(),
            desired_state: d.desired_state.clone(),
        }
    }
}

/// Body accepted by `POST /devices` (§4.2).
#[derive(Clone, Debug, Deserialize)]
pub struct NewDevice {
    pub name: String,
    pub address: Ipv4Addr,
    #[serde(default)]
    pub port: Option<u16>,
    pub device_type: u32,
    pub services: Vec<u32>,
    pub timeout: u64,
}

/// Body accepted by `PUT /devices/{id}` (§4.2): name always; type/services/timeout
/// reconfiguration is owner-only.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub device_type: Option<u32>,
    pub services: Option<Vec<u32>>,
    pub timeout: Option<u64>,
}
