use async_trait::async_trait;
use homegate_registry::{NewDevice, NullSink, Origin, Registry};
use homegate_types::{Catalog, CatalogKind};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct AlwaysAlive;

#[async_trait]
impl homegate_registry::LivenessProbe for AlwaysAlive {
    async fn probe(&self, _address: Ipv4Addr, _port: u16, _timeout: Duration) -> bool {
        true
    }
}

struct AlwaysDead;

#[async_trait]
impl homegate_registry::LivenessProbe for AlwaysDead {
    async fn probe(&self, _address: Ipv4Addr, _port: u16, _timeout: Duration) -> bool {
        false
    }
}

fn build_catalog(dir: &std::path::Path) -> Arc<Catalog> {
    let paths = homegate_types::catalog::CatalogPaths {
        value_types: dir.join("value_types.json"),
        property_types: dir.join("property_types.json"),
        device_types: dir.join("device_types.json"),
        services: dir.join("services.json"),
    };
    let catalog = Catalog::load(paths).unwrap();
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
            vec![serde_json::json!({
                "id": 11, "name": "Power", "access_mode": "RW", "value_type_class": "ENUM", "value_type_id": 2
            })],
        )
        .unwrap();
    catalog
        .replace(
            CatalogKind::Device,
            vec![serde_json::json!({"id": 2, "name": "lamp", "properties": [11]})],
        )
        .unwrap();
    Arc::new(catalog)
}

fn new_device(address: Ipv4Addr, timeout: u64) -> NewDevice {
    NewDevice {
        name: "lamp1".into(),
        address,
        port: None,
        device_type: 2,
        services: vec![],
        timeout,
    }
}

#[test]
fn register_and_drive_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = build_catalog(dir.path());
    let registry = Registry::new(catalog, Arc::new(NullSink), Arc::new(AlwaysAlive), Duration::from_secs(1));

    let device_addr = Ipv4Addr::new(192, 168, 1, 50);
    let info = registry
        .create(device_addr, 5683, new_device(device_addr, 60))
        .unwrap();
    assert_eq!(info.local_id, 1);

    let client_addr = Ipv4Addr::new(192, 168, 1, 10);
    let mut body = serde_json::Map::new();
    body.insert("Power".into(), serde_json::json!("on"));
    let (updated, device_originated) = registry
        .write_state(info.local_id, Origin::Device(client_addr), &body)
        .unwrap();

    assert!(!device_originated);
    let desired = updated
        .desired_state
        .iter()
        .find(|s| s.property_id == 11)
        .unwrap();
    assert_eq!(desired.value, homegate_types::Value::Label("on".into()));
    let current = updated
        .current_state
        .iter()
        .find(|s| s.property_id == 11)
        .unwrap();
    assert_eq!(current.value, homegate_types::Value::Label("off".into()));
}

#[test]
fn device_reports_back_updates_both_states() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = build_catalog(dir.path());
    let registry = Registry::new(catalog, Arc::new(NullSink), Arc::new(AlwaysAlive), Duration::from_secs(1));

    let device_addr = Ipv4Addr::new(192, 168, 1, 50);
    let info = registry
        .create(device_addr, 5683, new_device(device_addr, 60))
        .unwrap();

    let mut body = serde_json::Map::new();
    body.insert("Power".into(), serde_json::json!("on"));
    let (updated, device_originated) = registry
        .write_state(info.local_id, Origin::Device(device_addr), &body)
        .unwrap();

    assert!(device_originated);
    assert_eq!(
        updated.current_state[0].value,
        updated.desired_state[0].value
    );
}

#[test]
fn duplicate_address_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = build_catalog(dir.path());
    let registry = Registry::new(catalog, Arc::new(NullSink), Arc::new(AlwaysAlive), Duration::from_secs(1));

    let addr = Ipv4Addr::new(192, 168, 1, 50);
    registry.create(addr, 5683, new_device(addr, 60)).unwrap();
    let err = registry.create(addr, 5683, new_device(addr, 60)).unwrap_err();
    assert!(matches!(err, homegate_common::GatewayError::DuplicateAddress(_)));
}

#[test]
fn non_owner_delete_via_coap_origin_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = build_catalog(dir.path());
    let registry = Registry::new(catalog, Arc::new(NullSink), Arc::new(AlwaysAlive), Duration::from_secs(1));

    let addr = Ipv4Addr::new(192, 168, 1, 50);
    let info = registry.create(addr, 5683, new_device(addr, 60)).unwrap();

    let other = Ipv4Addr::new(192, 168, 1, 10);
    let err = registry
        .delete(info.local_id, Origin::Device(other))
        .unwrap_err();
    assert!(matches!(err, homegate_common::GatewayError::Forbidden(_)));

    registry.delete(info.local_id, Origin::LocalClient).unwrap();
    assert!(registry.get(info.local_id).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn unresponsive_device_is_evicted_after_one_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = build_catalog(dir.path());
    let registry = Arc::new(Registry::new(
        catalog,
        Arc::new(NullSink),
        Arc::new(AlwaysDead),
        Duration::from_millis(50),
    ));

    let addr = Ipv4Addr::new(192, 168, 1, 50);
    let info = registry.create(addr, 5683, new_device(addr, 0)).unwrap();

    let term = registry.term_event();
    let handle = tokio::spawn(registry.clone().monitor_loop(Duration::from_millis(10)));
    tokio::time::sleep(Duration::from_millis(60)).await;
    term.store(true, Ordering::SeqCst);
    let _ = tokio::time::timeout(Duration::from_millis(200), handle).await;

    assert!(registry.get(info.local_id).is_err());
}
