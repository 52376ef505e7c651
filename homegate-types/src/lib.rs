pub mod catalog;
pub mod device_type;
pub mod property_type;
pub mod value_type;

pub use catalog::{Catalog, CatalogKind, CatalogPaths, ServiceUpdate};
pub use device_type::{DeviceType, Service};
pub use property_type::{AccessMode, PropertyType};
pub use value_type::{EnumType, ScalarType, Value, ValueType};
