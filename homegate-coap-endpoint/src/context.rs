use crate::observers::ObserverTable;
use homegate_common::ServerConfStore;
use homegate_registry::Registry;
use homegate_types::Catalog;
use std::sync::Arc;

/// Everything a resource handler needs to act: the immutable-at-runtime catalog, the device
/// registry, the gateway's own identity record, and the observer fan-out table (§4.4, §5).
pub struct ServerContext {
    pub catalog: Arc<Catalog>,
    pub registry: Arc<Registry>,
    pub server_conf: Arc<ServerConfStore>,
    pub observers: Arc<ObserverTable>,
}
