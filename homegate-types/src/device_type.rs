use serde::{Deserialize, Serialize};

/// `Device type: {id, name, properties: ordered sequence of property-type refs}` (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: u32,
    pub name: String,
    pub properties: Vec<u32>,
}

/// `Service` (mutable): `{id, name, cloud_ref?}` (§3). Reloadable independently of the
/// immutable type catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Service {
    pub id: u32,
    pub name: String,
    pub cloud_ref: Option<u32>,
}
