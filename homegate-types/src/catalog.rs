use crate::device_type::{DeviceType, Service};
use crate::property_type::PropertyType;
use crate::value_type::{EnumType, ScalarType, Value, ValueType};
use homegate_common::GatewayError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogKind {
    Scalar,
    Enum,
    Property,
    Device,
}

impl CatalogKind {
    pub fn from_query(s: &str) -> Option<Self> {
        match s {
            "SCALAR_TYPES" => Some(Self::Scalar),
            "ENUM_TYPES" => Some(Self::Enum),
            "PROPERTY_TYPES" => Some(Self::Property),
            "DEVICE_TYPES" => Some(Self::Device),
            _ => None,
        }
    }
}

#[derive(Clone, Default)]
struct Snapshot {
    scalars: HashMap<u32, ScalarType>,
    enums: HashMap<u32, EnumType>,
    properties: HashMap<u32, PropertyType>,
    devices: HashMap<u32, DeviceType>,
    services: HashMap<u32, Service>,
}

#[derive(Clone)]
pub struct CatalogPaths {
    pub value_types: PathBuf,
    pub property_types: PathBuf,
    pub device_types: PathBuf,
    pub services: PathBuf,
}

/// C1: the immutable-at-runtime catalog of scalar, enum, property, device and service
/// definitions (§4.1). Read-mostly: readers dereference a cloned snapshot without taking
/// the write lock; updates install a brand new snapshot under a write lock (§5).
pub struct Catalog {
    snapshot: RwLock<Arc<Snapshot>>,
    paths: CatalogPaths,
}

#[derive(Deserialize)]
struct ScalarRecord {
    id: u32,
    name: String,
    units: String,
    min_value: f64,
    max_value: f64,
    step: f64,
    default_value: f64,
}

#[derive(Deserialize)]
struct EnumRecord {
    id: u32,
    name: String,
    choices: std::collections::BTreeMap<String, serde_json::Value>,
    default_value: String,
}

#[derive(Deserialize, Serialize)]
struct ValueTypesDoc {
    #[serde(default)]
    #[serde(rename = "SCALAR_TYPES")]
    scalar_types: Vec<serde_json::Value>,
    #[serde(default)]
    #[serde(rename = "ENUM_TYPES")]
    enum_types: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct PropertyRecord {
    id: u32,
    name: String,
    access_mode: crate::property_type::AccessMode,
    #[allow(dead_code)]
    value_type_class: String,
    value_type_id: u32,
}

#[derive(Deserialize, Serialize)]
struct PropertyTypesDoc {
    #[serde(rename = "PROPERTY_TYPES")]
    property_types: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct DeviceRecord {
    id: u32,
    name: String,
    properties: Vec<u32>,
}

#[derive(Deserialize, Serialize)]
struct DeviceTypesDoc {
    #[serde(rename = "DEVICE_TYPES")]
    device_types: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ServiceRecord {
    id: u32,
    name: String,
    #[serde(default)]
    core_service_ref: Option<u32>,
}

#[derive(Deserialize, Serialize)]
struct ServicesDoc {
    #[serde(rename = "SERVICES")]
    services: Vec<serde_json::Value>,
}

impl Catalog {
    /// Load the four documents plus the services list at startup. Duplicate ids within a
    /// document are overwritten, with a warning logged (§4.1).
    pub fn load(paths: CatalogPaths) -> Result<Self, GatewayError> {
        let mut snapshot = Snapshot::default();

        if let Ok(text) = std::fs::read_to_string(&paths.value_types) {
            let doc: ValueTypesDoc = serde_json::from_str(&text)
                .map_err(|e| GatewayError::Internal(format!("value_types.json: {e}")))?;
            for raw in doc.scalar_types {
                let r: ScalarRecord = serde_json::from_value(raw)
                    .map_err(|e| GatewayError::Internal(format!("scalar record: {e}")))?;
                let t = ScalarType::new(
                    r.id,
                    r.name,
                    r.units,
                    r.min_value,
                    r.max_value,
                    r.step,
                    r.default_value,
                )
                .map_err(|e| GatewayError::Internal(format!("scalar {}: {e}", r.id)))?;
                if snapshot.scalars.insert(t.id, t).is_some() {
                    log::warn!("duplicate scalar type id {} overwritten", r.id);
                }
            }
            for raw in doc.enum_types {
                let r: EnumRecord = serde_json::from_value(raw)
                    .map_err(|e| GatewayError::Internal(format!("enum record: {e}")))?;
                let t = EnumType::new(r.id, r.name, r.choices, r.default_value)
                    .map_err(|e| GatewayError::Internal(format!("enum {}: {e}", r.id)))?;
                if snapshot.enums.insert(t.id, t).is_some() {
                    log::warn!("duplicate enum type id {} overwritten", r.id);
                }
            }
        } else {
            log::info!(
                "FILE: {} not found, starting with an empty value type catalog",
                paths.value_types.display()
            );
        }

        if let Ok(text) = std::fs::read_to_string(&paths.property_types) {
            let doc: PropertyTypesDoc = serde_json::from_str(&text)
                .map_err(|e| GatewayError::Internal(format!("property_types.json: {e}")))?;
            for raw in doc.property_types {
                let r: PropertyRecord = serde_json::from_value(raw)
                    .map_err(|e| GatewayError::Internal(format!("property record: {e}")))?;
                if !snapshot.scalars.contains_key(&r.value_type_id)
                    && !snapshot.enums.contains_key(&r.value_type_id)
                {
                    return Err(GatewayError::Internal(format!(
                        "property {} references unknown value type {}",
                        r.id, r.value_type_id
                    )));
                }
                let p = PropertyType {
                    id: r.id,
                    name: r.name,
                    access: r.access_mode,
                    value_type_ref: r.value_type_id,
                };
                if snapshot.properties.insert(p.id, p).is_some() {
                    log::warn!("duplicate property type id {} overwritten", r.id);
                }
            }
        } else {
            log::info!(
                "FILE: {} not found, starting with an empty property type catalog",
                paths.property_types.display()
            );
        }

        if let Ok(text) = std::fs::read_to_string(&paths.device_types) {
            let doc: DeviceTypesDoc = serde_json::from_str(&text)
                .map_err(|e| GatewayError::Internal(format!("device_types.json: {e}")))?;
            for raw in doc.device_types {
                let r: DeviceRecord = serde_json::from_value(raw)
                    .map_err(|e| GatewayError::Internal(format!("device record: {e}")))?;
                for prop_id in &r.properties {
                    if !snapshot.properties.contains_key(prop_id) {
                        return Err(GatewayError::Internal(format!(
                            "device type {} references unknown property {}",
                            r.id, prop_id
                        )));
                    }
                }
                let d = DeviceType {
                    id: r.id,
                    name: r.name,
                    properties: r.properties,
                };
                if snapshot.devices.insert(d.id, d).is_some() {
                    log::warn!("duplicate device type id {} overwritten", r.id);
                }
            }
        } else {
            log::info!(
                "FILE: {} not found, starting with an empty device type catalog",
                paths.device_types.display()
            );
        }

        if let Ok(text) = std::fs::read_to_string(&paths.services) {
            let doc: ServicesDoc = serde_json::from_str(&text)
                .map_err(|e| GatewayError::Internal(format!("services.json: {e}")))?;
            for raw in doc.services {
                let r: ServiceRecord = serde_json::from_value(raw)
                    .map_err(|e| GatewayError::Internal(format!("service record: {e}")))?;
                let s = Service {
                    id: r.id,
                    name: r.name,
                    cloud_ref: r.core_service_ref,
                };
                if snapshot.services.insert(s.id, s).is_some() {
                    log::warn!("duplicate service id {} overwritten", r.id);
                }
            }
        } else {
            log::info!(
                "FILE: {} not found, starting with an empty services list",
                paths.services.display()
            );
        }

        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            paths,
        })
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().unwrap().clone()
    }

    pub fn validate_device_type(&self, id: u32) -> bool {
        self.current().devices.contains_key(&id)
    }

    /// §3 I5: membership is checked against the *current* service set, not a cached one.
    pub fn validate_services(&self, ids: &[u32]) -> bool {
        let snap = self.current();
        ids.iter().all(|id| snap.services.contains_key(id))
    }

    pub fn property_type(&self, id: u32) -> Result<PropertyType, GatewayError> {
        self.current()
            .properties
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownType(format!("property {id}")))
    }

    pub fn value_type(&self, id: u32) -> Result<ValueType, GatewayError> {
        let snap = self.current();
        if let Some(s) = snap.scalars.get(&id) {
            return Ok(ValueType::Scalar(s.clone()));
        }
        if let Some(e) = snap.enums.get(&id) {
            return Ok(ValueType::Enum(e.clone()));
        }
        Err(GatewayError::UnknownType(format!("value type {id}")))
    }

    pub fn device_type(&self, id: u32) -> Result<DeviceType, GatewayError> {
        self.current()
            .devices
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownType(format!("device type {id}")))
    }

    pub fn device_type_exists(&self, id: u32) -> bool {
        self.current().devices.contains_key(&id)
    }

    pub fn services(&self) -> Vec<Service> {
        self.current().services.values().cloned().collect()
    }

    pub fn scalar_types(&self) -> Vec<ScalarType> {
        self.current().scalars.values().cloned().collect()
    }

    pub fn enum_types(&self) -> Vec<EnumType> {
        self.current().enums.values().cloned().collect()
    }

    pub fn property_types(&self) -> Vec<PropertyType> {
        self.current().properties.values().cloned().collect()
    }

    pub fn device_types(&self) -> Vec<DeviceType> {
        self.current().devices.values().cloned().collect()
    }

    /// Build an (id -> Value) default state for a device type, in type order (I3).
    pub fn default_state(&self, device_type_id: u32) -> Result<Vec<(u32, Value)>, GatewayError> {
        let device_type = self.device_type(device_type_id)?;
        let snap = self.current();
        device_type
            .properties
            .iter()
            .map(|prop_id| {
                let prop = snap
                    .properties
                    .get(prop_id)
                    .ok_or_else(|| GatewayError::UnknownType(format!("property {prop_id}")))?;
                let vt = if let Some(s) = snap.scalars.get(&prop.value_type_ref) {
                    ValueType::Scalar(s.clone())
                } else if let Some(e) = snap.enums.get(&prop.value_type_ref) {
                    ValueType::Enum(e.clone())
                } else {
                    return Err(GatewayError::UnknownType(format!(
                        "value type {}",
                        prop.value_type_ref
                    )));
                };
                Ok((*prop_id, vt.default()))
            })
            .collect()
    }

    /// `replace(kind, list)` (§4.1): well-formedness and cross-reference preconditions
    /// must already hold, or the whole replace fails and nothing installs.
    pub fn replace(&self, kind: CatalogKind, list: Vec<serde_json::Value>) -> Result<(), GatewayError> {
        let mut next = (*self.current()).clone();

        match kind {
            CatalogKind::Scalar => {
                let mut scalars = HashMap::new();
                for raw in list {
                    let r: ScalarRecord = serde_json::from_value(raw)
                        .map_err(|e| GatewayError::BadRequest(format!("malformed scalar: {e}")))?;
                    let t = ScalarType::new(
                        r.id,
                        r.name,
                        r.units,
                        r.min_value,
                        r.max_value,
                        r.step,
                        r.default_value,
                    )
                    .map_err(|e| GatewayError::BadRequest(format!("malformed scalar {}: {e}", r.id)))?;
                    scalars.insert(t.id, t);
                }
                next.scalars = scalars;
            }
            CatalogKind::Enum => {
                let mut enums = HashMap::new();
                for raw in list {
                    let r: EnumRecord = serde_json::from_value(raw)
                        .map_err(|e| GatewayError::BadRequest(format!("malformed enum: {e}")))?;
                    let t = EnumType::new(r.id, r.name, r.choices, r.default_value)
                        .map_err(|e| GatewayError::BadRequest(format!("malformed enum {}: {e}", r.id)))?;
                    enums.insert(t.id, t);
                }
                next.enums = enums;
            }
            CatalogKind::Property => {
                let mut properties = HashMap::new();
                for raw in list {
                    let r: PropertyRecord = serde_json::from_value(raw)
                        .map_err(|e| GatewayError::BadRequest(format!("malformed property: {e}")))?;
                    if !next.scalars.contains_key(&r.value_type_id)
                        && !next.enums.contains_key(&r.value_type_id)
                    {
                        return Err(GatewayError::BadRequest(format!(
                            "property {} references unknown value type {}",
                            r.id, r.value_type_id
                        )));
                    }
                    properties.insert(
                        r.id,
                        PropertyType {
                            id: r.id,
                            name: r.name,
                            access: r.access_mode,
                            value_type_ref: r.value_type_id,
                        },
                    );
                }
                next.properties = properties;
            }
            CatalogKind::Device => {
                let mut devices = HashMap::new();
                for raw in list {
                    let r: DeviceRecord = serde_json::from_value(raw)
                        .map_err(|e| GatewayError::BadRequest(format!("malformed device type: {e}")))?;
                    for prop_id in &r.properties {
                        if !next.properties.contains_key(prop_id) {
                            return Err(GatewayError::BadRequest(format!(
                                "device type {} references unknown property {}",
                                r.id, prop_id
                            )));
                        }
                    }
                    devices.insert(
                        r.id,
                        DeviceType {
                            id: r.id,
                            name: r.name,
                            properties: r.properties,
                        },
                    );
                }
                next.devices = devices;
            }
        }

        let path = self.file_for(kind);
        persist_kind(&path, kind, &next)?;

        *self.snapshot.write().unwrap() = Arc::new(next);
        Ok(())
    }

    /// Replace the mutable services set (separate from the immutable-at-runtime catalog
    /// kinds, per §3's "The set is reloadable").
    pub fn replace_services(&self, list: Vec<ServiceUpdate>) -> Result<(), GatewayError> {
        let mut next = (*self.current()).clone();
        let mut services = HashMap::new();
        for s in list {
            services.insert(
                s.id,
                Service {
                    id: s.id,
                    name: s.name,
                    cloud_ref: s.core_service_ref,
                },
            );
        }
        next.services = services;

        let doc = ServicesDoc {
            services: next
                .services
                .values()
                .map(|s| serde_json::to_value(ServiceRecordOut::from(s)).unwrap())
                .collect(),
        };
        write_atomic(&self.paths.services, &doc)?;

        *self.snapshot.write().unwrap() = Arc::new(next);
        Ok(())
    }

    fn file_for(&self, kind: CatalogKind) -> PathBuf {
        match kind {
            CatalogKind::Scalar | CatalogKind::Enum => self.paths.value_types.clone(),
            CatalogKind::Property => self.paths.property_types.clone(),
            CatalogKind::Device => self.paths.device_types.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct ServiceUpdate {
    pub id: u32,
    pub name: String,
    pub core_service_ref: Option<u32>,
}

#[derive(Serialize)]
struct ServiceRecordOut {
    id: u32,
    name: String,
    core_service_ref: Option<u32>,
}

impl From<&Service> for ServiceRecordOut {
    fn from(s: &Service) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            core_service_ref: s.cloud_ref,
        }
    }
}

fn persist_kind(path: &Path, kind: CatalogKind, snap: &Snapshot) -> Result<(), GatewayError> {
    match kind {
        CatalogKind::Scalar | CatalogKind::Enum => {
            let doc = ValueTypesDoc {
                scalar_types: snap
                    .scalars
                    .values()
                    .map(|s| {
                        serde_json::json!({
                            "id": s.id, "name": s.name, "units": s.units,
                            "min_value": s.min_value, "max_value": s.max_value,
                            "step": s.step, "default_value": s.default_value,
                        })
                    })
                    .collect(),
                enum_types: snap
                    .enums
                    .values()
                    .map(|e| {
                        serde_json::json!({
                            "id": e.id, "name": e.name, "choices": e.choices,
                            "default_value": e.default_value,
                        })
                    })
                    .collect(),
            };
            write_atomic(path, &doc)
        }
        CatalogKind::Property => {
            let doc = PropertyTypesDoc {
                property_types: snap
                    .properties
                    .values()
                    .map(|p| {
                        serde_json::json!({
                            "id": p.id, "name": p.name,
                            "access_mode": p.access,
                            "value_type_class": if snap.scalars.contains_key(&p.value_type_ref) { "SCALAR" } else { "ENUM" },
                            "value_type_id": p.value_type_ref,
                        })
                    })
                    .collect(),
            };
            write_atomic(path, &doc)
        }
        CatalogKind::Device => {
            let doc = DeviceTypesDoc {
                device_types: snap
                    .devices
                    .values()
                    .map(|d| {
                        serde_json::json!({
                            "id": d.id, "name": d.name, "properties": d.properties,
                        })
                    })
                    .collect(),
            };
            write_atomic(path, &doc)
        }
    }
}

/// Whole-file replace-write (§4.1): write to a temp file in the same directory, then
/// rename over the target, so a crash mid-write never leaves a half-written catalog file.
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
