use homegate_types::catalog::{Catalog, CatalogKind, CatalogPaths};
use std::io::Write;

fn paths_in(dir: &std::path::Path) -> CatalogPaths {
    CatalogPaths {
        value_types: dir.join("value_types.json"),
        property_types: dir.join("property_types.json"),
        device_types: dir.join("device_types.json"),
        services: dir.join("services.json"),
    }
}

fn write(path: &std::path::Path, json: &str) {
    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(json.as_bytes()).unwrap();
}

#[test]
fn loads_full_catalog_and_resolves_cross_references() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());

    write(
        &paths.value_types,
        r#"{
            "SCALAR_TYPES": [
                {"id": 1, "name": "temperature", "units": "C", "min_value": -10.0, "max_value": 50.0, "step": 0.5, "default_value": 20.0}
            ],
            "ENUM_TYPES": [
                {"id": 2, "name": "power", "choices": {"on": 1, "off": 0}, "default_value": "off"}
            ]
        }"#,
    );
    write(
        &paths.property_types,
        r#"{"PROPERTY_TYPES": [
            {"id": 10, "name": "current_temp", "access_mode": "RO", "value_type_class": "SCALAR", "value_type_id": 1},
            {"id": 11, "name": "power_state", "access_mode": "RW", "value_type_class": "ENUM", "value_type_id": 2}
        ]}"#,
    );
    write(
        &paths.device_types,
        r#"{"DEVICE_TYPES": [
            {"id": 100, "name": "thermostat", "properties": [10, 11]}
        ]}"#,
    );
    write(&paths.services, r#"{"SERVICES": [{"id": 1000, "name": "alerts", "core_service_ref": null}]}"#);

    let catalog = Catalog::load(paths).unwrap();
    assert!(catalog.validate_device_type(100));
    assert!(!catalog.validate_device_type(999));
    assert!(catalog.validate_services(&[1000]));
    assert!(!catalog.validate_services(&[1, 1000]));

    let default_state = catalog.default_state(100).unwrap();
    assert_eq!(default_state.len(), 2);
    assert_eq!(default_state[0].0, 10);

    let prop = catalog.property_type(11).unwrap();
    assert_eq!(prop.name, "power_state");
}

#[test]
fn missing_files_load_as_an_empty_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::load(paths_in(dir.path())).unwrap();
    assert!(!catalog.validate_device_type(1));
    assert!(catalog.validate_services(&[]));
    assert!(catalog.property_type(1).is_err());
}

#[test]
fn property_referencing_unknown_value_type_is_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    write(
        &paths.property_types,
        r#"{"PROPERTY_TYPES": [
            {"id": 10, "name": "current_temp", "access_mode": "RO", "value_type_class": "SCALAR", "value_type_id": 999}
        ]}"#,
    );
    assert!(Catalog::load(paths).is_err());
}

#[test]
fn replace_is_all_or_nothing_on_a_bad_cross_reference() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    write(
        &paths.value_types,
        r#"{"SCALAR_TYPES": [
            {"id": 1, "name": "temperature", "units": "C", "min_value": 0.0, "max_value": 100.0, "step": 1.0, "default_value": 20.0}
        ], "ENUM_TYPES": []}"#,
    );
    let catalog = Catalog::load(paths).unwrap();

    let good = vec![serde_json::json!({
        "id": 10, "name": "current_temp", "access_mode": "RO", "value_type_class": "SCALAR", "value_type_id": 1
    })];
    catalog.replace(CatalogKind::Property, good).unwrap();
    assert!(catalog.property_type(10).is_ok());

    let bad = vec![serde_json::json!({
        "id": 20, "name": "bogus", "access_mode": "RO", "value_type_class": "SCALAR", "value_type_id": 404
    })];
    assert!(catalog.replace(CatalogKind::Property, bad).is_err());
    // the earlier, valid set is still installed -- nothing was partially applied.
    assert!(catalog.property_type(10).is_ok());
    assert!(catalog.property_type(20).is_err());
}

#[test]
fn replace_persists_to_disk_for_the_next_load() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    let catalog = Catalog::load(paths.clone()).unwrap();

    let scalars = vec![serde_json::json!({
        "id": 1, "name": "humidity", "units": "%", "min_value": 0.0, "max_value": 100.0, "step": 1.0, "default_value": 50.0
    })];
    catalog.replace(CatalogKind::Scalar, scalars).unwrap();

    let reloaded = Catalog::load(paths).unwrap();
    assert!(reloaded.value_type(1).is_ok());
}
