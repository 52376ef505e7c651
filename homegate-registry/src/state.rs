use crate::device::{Device, StateSlot};
use homegate_common::GatewayError;
use homegate_types::{Catalog, Value, ValueType};
use std::collections::HashMap;

fn value_from_json(raw: &serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Label(s.clone()),
        other => Value::Label(other.to_string()),
    }
}

fn canonicalize(vt: &ValueType, value: &Value) -> Value {
    match vt {
        ValueType::Scalar(_) => Value::Number(value.as_f64().unwrap_or(f64::NAN)),
        ValueType::Enum(_) => Value::Label(value.as_label()),
    }
}

fn set_slot(state: &mut [StateSlot], property_id: u32, value: Value) {
    if let Some(slot) = state.iter_mut().find(|s| s.property_id == property_id) {
        slot.value = value;
    }
}

/// The §4.3 write algorithm. Returns `true` when the write was device-originated (i.e. it
/// landed in both `current_state` and `desired_state`).
///
/// Steps 1-4 validate the whole request before step 5 applies anything, so a single
/// rejected key leaves both states untouched (§8 P5).
pub fn write_state(
    device: &mut Device,
    catalog: &Catalog,
    body: &serde_json::Map<String, serde_json::Value>,
    is_owner: bool,
) -> Result<bool, GatewayError> {
    let device_type = catalog.device_type(device.device_type_ref)?;

    let mut by_name = HashMap::new();
    let mut properties = HashMap::new();
    for prop_id in &device_type.properties {
        let pt = catalog.property_type(*prop_id)?;
        by_name.insert(pt.name.clone(), *prop_id);
        properties.insert(*prop_id, pt);
    }

    let mut resolved = Vec::with_capacity(body.len());
    for (key, raw) in body {
        let prop_id = if let Ok(id) = key.parse::<u32>() {
            if properties.contains_key(&id) {
                id
            } else {
                return Err(GatewayError::BadRequest(format!(
                    "device does not have property ({key})"
                )));
            }
        } else if let Some(id) = by_name.get(key) {
            *id
        } else {
            return Err(GatewayError::BadRequest(format!(
                "device does not have property ({key})"
            )));
        };
        resolved.push((prop_id, value_from_json(raw)));
    }

    let mut writes = Vec::with_capacity(resolved.len());
    for (prop_id, value) in &resolved {
        let pt = &properties[prop_id];
        let vt = catalog.value_type(pt.value_type_ref)?;
        if !vt.validate(value) {
            return Err(GatewayError::BadRequest(format!(
                "invalid property new value for ({prop_id})"
            )));
        }
        if !is_owner && !pt.access.writable_by_non_owner() {
            return Err(GatewayError::Forbidden(format!(
                "property ({prop_id}) can not be written (access mode: {:?})",
                pt.access
            )));
        }
        writes.push((*prop_id, canonicalize(&vt, value)));
    }

    for (prop_id, value) in writes {
        if is_owner {
            set_slot(&mut device.current_state, prop_id, value.clone());
        }
        set_slot(&mut device.desired_state, prop_id, value);
    }
    if is_owner {
        device.desired_state = device.current_state.clone();
    }

    Ok(is_owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use homegate_types::catalog::CatalogPaths;
    use homegate_types::CatalogKind;
    use std::io::Write;
    use std::net::Ipv4Addr;
    use std::time::Instant;

    fn build_catalog(dir: &std::path::Path) -> Catalog {
        let paths = CatalogPaths {
            value_types: dir.join("value_types.json"),
            property_types: dir.join("property_types.json"),
            device_types: dir.join("device_types.json"),
            services: dir.join("services.json"),
        };
        let catalog = Catalog::load(paths.clone()).unwrap();
        catalog
            .replace(
                CatalogKind::Scalar,
                vec![serde_json::json!({
                    "id": 1, "name": "temp", "units": "C", "min_value": 0.0,
                    "max_value": 40.0, "step": 0.5, "default_value": 20.0
                })],
            )
            .unwrap();
        catalog
            .replace(
                CatalogKind::Enum,
                vec![serde_json::json!({
                    "id": 2, "name": "power", "choices": {"on": 1, "off": 0}, "default_value": "off"
                })],
            )
            .unwrap();
        catalog
            .replace(
                CatalogKind::Property,
                vec![
                    serde_json::json!({"id": 10, "name": "Temperature", "access_mode": "RO", "value_type_class": "SCALAR", "value_type_id": 1}),
                    serde_json::json!({"id": 11, "name": "Power", "access_mode": "RW", "value_type_class": "ENUM", "value_type_id": 2}),
                ],
            )
            .unwrap();
        catalog
            .replace(
                CatalogKind::Device,
                vec![serde_json::json!({"id": 100, "name": "thermostat", "properties": [10, 11]})],
            )
            .unwrap();
        catalog
    }

    fn build_device(catalog: &Catalog) -> Device {
        let state: Vec<StateSlot> = catalog
            .default_state(100)
            .unwrap()
            .into_iter()
            .map(|(property_id, value)| StateSlot { property_id, value })
            .collect();
        Device {
            local_id: 1,
            universal_id: None,
            name: "therm1".into(),
            address: Ipv4Addr::new(192, 168, 1, 50),
            port: 5683,
            device_type_ref: 100,
            subscribed_services: vec![],
            timeout_seconds: 60,
            last_access: Instant::now(),
            current_state: state.clone(),
            desired_state: state,
        }
    }

    #[test]
    fn non_owner_write_to_rw_lands_only_in_desired() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = build_catalog(dir.path());
        let mut device = build_device(&catalog);

        let mut body = serde_json::Map::new();
        body.insert("Power".into(), serde_json::json!("on"));
        let owner_write = write_state(&mut device, &catalog, &body, false).unwrap();

        assert!(!owner_write);
        let desired = device
            .desired_state
            .iter()
            .find(|s| s.property_id == 11)
            .unwrap();
        assert_eq!(desired.value, Value::Label("on".into()));
        let current = device
            .current_state
            .iter()
            .find(|s| s.property_id == 11)
            .unwrap();
        assert_eq!(current.value, Value::Label("off".into()));
    }

    #[test]
    fn non_owner_write_to_ro_is_forbidden_and_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = build_catalog(dir.path());
        let mut device = build_device(&catalog);

        let mut body = serde_json::Map::new();
        body.insert("Temperature".into(), serde_json::json!(25.0));
        let err = write_state(&mut device, &catalog, &body, false).unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden(_)));
        assert_eq!(
            device.current_state[0].value,
            device.desired_state[0].value
        );
    }

    #[test]
    fn owner_write_updates_both_states() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = build_catalog(dir.path());
        let mut device = build_device(&catalog);

        let mut body = serde_json::Map::new();
        body.insert("Temperature".into(), serde_json::json!(25.0));
        let owner_write = write_state(&mut device, &catalog, &body, true).unwrap();

        assert!(owner_write);
        assert_eq!(device.current_state[0].value, Value::Number(25.0));
        assert_eq!(device.desired_state[0].value, Value::Number(25.0));
    }

    #[test]
    fn unknown_property_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = build_catalog(dir.path());
        let mut device = build_device(&catalog);

        let mut body = serde_json::Map::new();
        body.insert("Humidity".into(), serde_json::json!(10.0));
        assert!(write_state(&mut device, &catalog, &body, true).is_err());
    }
}
