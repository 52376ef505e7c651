use crate::device::DeviceInfo;

/// Lifecycle events the registry publishes to Cloud Sync (§4.6). Dispatch is fire-and-forget:
/// the registry never blocks a client request on a sink (§5 "No handler may block on a cloud
/// call").
#[derive(Clone, Debug)]
pub enum SyncEvent {
    Registered(DeviceInfo),
    Unregistered {
        local_id: u32,
        universal_id: Option<String>,
    },
    StateChanged(DeviceInfo),
    Heartbeat(DeviceInfo),
}

/// Implemented by Cloud Sync; injected into the registry so this crate never depends on the
/// sink's transport concerns (§4.6).
pub trait SyncSink: Send + Sync {
    fn dispatch(&self, event: SyncEvent);
}

/// Used when `WORKING_OFFLINE` is set or no sink was configured (§4.6).
pub struct NullSink;

impl SyncSink for NullSink {
    fn dispatch(&self, _event: SyncEvent) {}
}
