use crate::device::{Device, DeviceInfo, DeviceUpdate, NewDevice, StateSlot};
use crate::probe::LivenessProbe;
use crate::state::write_state;
use crate::sync::{SyncEvent, SyncSink};
use homegate_common::GatewayError;
use homegate_types::Catalog;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Who is driving a request into the registry (§3 I6, §4.2 delete semantics).
///
/// The CoAP resource tree resolves this from the request's source address; the HTTP proxy
/// always forwards as [`Origin::LocalClient`] since it terminates the client connection
/// itself -- local apps are never the device's owner address, but are trusted to delete and
/// to write RW/WO properties like any other non-owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Device(Ipv4Addr),
    LocalClient,
}

impl Origin {
    fn is_owner_of(&self, device: &Device) -> bool {
        match self {
            Origin::Device(addr) => device.is_owner(*addr),
            Origin::LocalClient => false,
        }
    }
}

struct Inner {
    devices: HashMap<u32, Device>,
}

/// C2: owns the set of devices (§4.2). Readers and writers share one mutex per §5 -- the
/// population is small and mutations are coarse-grained, so a single lock is sufficient.
pub struct Registry {
    inner: Mutex<Inner>,
    catalog: Arc<Catalog>,
    sync_sink: Arc<dyn SyncSink>,
    probe: Arc<dyn LivenessProbe>,
    probe_timeout: Duration,
    term_event: Arc<AtomicBool>,
}

impl Registry {
    pub fn new(
        catalog: Arc<Catalog>,
        sync_sink: Arc<dyn SyncSink>,
        probe: Arc<dyn LivenessProbe>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                devices: HashMap::new(),
            }),
            catalog,
            sync_sink,
            probe,
            probe_timeout,
            term_event: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn term_event(&self) -> Arc<AtomicBool> {
        self.term_event.clone()
    }

    /// §4.2 `list()`: a snapshot; touches `last_access` for the device matching `origin`.
    pub fn list(&self, origin: Option<Ipv4Addr>) -> Vec<DeviceInfo> {
        let mut guard = self.inner.lock().unwrap();
        if let Some(addr) = origin {
            if let Some(d) = guard.devices.values_mut().find(|d| d.address == addr) {
                d.touch();
            }
        }
        guard.devices.values().map(DeviceInfo::from).collect()
    }

    fn next_id(devices: &HashMap<u32, Device>) -> u32 {
        devices.keys().max().map(|m| m + 1).unwrap_or(1)
    }

    /// §4.2 `create()`.
    pub fn create(&self, origin_addr: Ipv4Addr, origin_port: u16, body: NewDevice) -> Result<DeviceInfo, GatewayError> {
        if !self.catalog.validate_device_type(body.device_type) {
            return Err(GatewayError::BadRequest(format!(
                "unknown device type ({})",
                body.device_type
            )));
        }
        if !self.catalog.validate_services(&body.services) {
            return Err(GatewayError::BadRequest(
                "one or more subscribed services are unknown".into(),
            ));
        }

        let mut guard = self.inner.lock().unwrap();
        if guard.devices.values().any(|d| d.address == body.address) {
            return Err(GatewayError::DuplicateAddress(format!(
                "device with address ({}) already exists",
                body.address
            )));
        }

        let default_state: Vec<StateSlot> = self
            .catalog
            .default_state(body.device_type)?
            .into_iter()
            .map(|(property_id, value)| StateSlot { property_id, value })
            .collect();

        let local_id = Self::next_id(&guard.devices);
        let device = Device {
            local_id,
            universal_id: None,
            name: body.name,
            address: body.address,
            port: body.port.unwrap_or(origin_port),
            device_type_ref: body.device_type,
            subscribed_services: body.services,
            timeout_seconds: body.timeout,
            last_access: Instant::now(),
            current_state: default_state.clone(),
            desired_state: default_state,
        };
        let info = DeviceInfo::from(&device);
        guard.devices.insert(local_id, device);
        drop(guard);

        self.sync_sink.dispatch(SyncEvent::Registered(info.clone()));
        Ok(info)
    }

    pub fn get(&self, id: u32) -> Result<DeviceInfo, GatewayError> {
        let guard = self.inner.lock().unwrap();
        guard
            .devices
            .get(&id)
            .map(DeviceInfo::from)
            .ok_or_else(|| GatewayError::NotFound(format!("device ({id}) not found")))
    }

    /// Adopts the cloud-assigned `universal_id` on first successful registration (§3
    /// Lifecycle): "stable for the lifetime of the device" once set, so a later call with a
    /// different value is ignored rather than overwriting it.
    pub fn set_universal_id(&self, id: u32, universal_id: String) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(device) = guard.devices.get_mut(&id) {
            if device.universal_id.is_none() {
                device.universal_id = Some(universal_id);
            }
        }
    }

    /// §4.2 `update()`: name always; type/services/timeout reconfiguration is owner-only.
    pub fn update(&self, id: u32, origin: Origin, body: DeviceUpdate) -> Result<DeviceInfo, GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        let device = guard
            .devices
            .get_mut(&id)
            .ok_or_else(|| GatewayError::NotFound(format!("device ({id}) not found")))?;

        if let Some(name) = body.name {
            device.name = name;
        }

        let reconfigures = body.device_type.is_some() || body.services.is_some() || body.timeout.is_some();
        if reconfigures {
            if !origin.is_owner_of(device) {
                return Err(GatewayError::Forbidden(
                    "only the device itself may reconfigure type, services or timeout".into(),
                ));
            }
            if let Some(services) = &body.services {
                if !self.catalog.validate_services(services) {
                    return Err(GatewayError::BadRequest(
                        "one or more subscribed services are unknown".into(),
                    ));
                }
            }
            if let Some(device_type) = body.device_type {
                if !self.catalog.validate_device_type(device_type) {
                    return Err(GatewayError::BadRequest(format!(
                        "unknown device type ({device_type})"
                    )));
                }
                device.device_type_ref = device_type;
                let default_state: Vec<StateSlot> = self
                    .catalog
                    .default_state(device_type)?
                    .into_iter()
                    .map(|(property_id, value)| StateSlot { property_id, value })
                    .collect();
                device.current_state = default_state.clone();
                device.desired_state = default_state;
            }
            if let Some(services) = body.services {
                device.subscribed_services = services;
            }
            if let Some(timeout) = body.timeout {
                device.timeout_seconds = timeout;
            }
        }

        Ok(DeviceInfo::from(&*device))
    }

    /// §4.2 `delete()`: owner-only via CoAP; local HTTP clients may delete unconditionally.
    pub fn delete(&self, id: u32, origin: Origin) -> Result<(), GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        let device = guard
            .devices
            .get(&id)
            .ok_or_else(|| GatewayError::NotFound(format!("device ({id}) not found")))?;

        if let Origin::Device(_) = origin {
            if !origin.is_owner_of(device) {
                return Err(GatewayError::Forbidden(
                    "only the device itself may delete its own registration".into(),
                ));
            }
        }

        let universal_id = device.universal_id.clone();
        guard.devices.remove(&id);
        drop(guard);

        self.sync_sink.dispatch(SyncEvent::Unregistered {
            local_id: id,
            universal_id,
        });
        Ok(())
    }

    /// Applies the §4.3 write algorithm and fires the asymmetric notification policy's
    /// dispatch half (C4 owns the observer fan-out; this returns which state changed so the
    /// caller can drive it).
    pub fn write_state(
        &self,
        id: u32,
        origin: Origin,
        body: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(DeviceInfo, bool), GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        let device = guard
            .devices
            .get_mut(&id)
            .ok_or_else(|| GatewayError::NotFound(format!("device ({id}) not found")))?;

        let is_owner = match origin {
            Origin::Device(addr) => device.is_owner(addr),
            Origin::LocalClient => false,
        };
        let device_originated = write_state(device, &self.catalog, body, is_owner)?;
        let info = DeviceInfo::from(&*device);
        drop(guard);

        self.sync_sink.dispatch(SyncEvent::StateChanged(info.clone()));
        Ok((info, device_originated))
    }

    pub fn device_type_of(&self, id: u32) -> Result<u32, GatewayError> {
        let guard = self.inner.lock().unwrap();
        guard
            .devices
            .get(&id)
            .map(|d| d.device_type_ref)
            .ok_or_else(|| GatewayError::NotFound(format!("device ({id}) not found")))
    }

    /// §3 I5: a service removed from the catalog after a device subscribed to it must stop
    /// being reported, even though it's still on the device's stored subscription list.
    pub fn services_of(&self, id: u32) -> Result<Vec<u32>, GatewayError> {
        let guard = self.inner.lock().unwrap();
        let services = guard
            .devices
            .get(&id)
            .map(|d| d.subscribed_services.clone())
            .ok_or_else(|| GatewayError::NotFound(format!("device ({id}) not found")))?;
        drop(guard);
        Ok(services
            .into_iter()
            .filter(|id| self.catalog.validate_services(std::slice::from_ref(id)))
            .collect())
    }

    pub fn set_services(&self, id: u32, services: Vec<u32>) -> Result<(), GatewayError> {
        if !self.catalog.validate_services(&services) {
            return Err(GatewayError::BadRequest(
                "one or more subscribed services are unknown".into(),
            ));
        }
        let mut guard = self.inner.lock().unwrap();
        let device = guard
            .devices
            .get_mut(&id)
            .ok_or_else(|| GatewayError::NotFound(format!("device ({id}) not found")))?;
        device.subscribed_services = services;
        Ok(())
    }

    /// §4.2 `monitor_loop()`: runs on a dedicated task, coarse ~1 s tick (§5). Timed-out
    /// devices are probed with a short-timeout CoAP GET; unresponsive devices are collected
    /// during the sweep and evicted only after it completes, so the map is never mutated
    /// mid-traversal.
    pub async fn monitor_loop(self: Arc<Self>, tick: Duration) {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;
            if self.term_event.load(Ordering::SeqCst) {
                log::info!("device monitor stopping on term_event");
                return;
            }
            self.monitor_sweep().await;
        }
    }

    async fn monitor_sweep(&self) {
        let candidates: Vec<(u32, Ipv4Addr, u16)> = {
            let guard = self.inner.lock().unwrap();
            guard
                .devices
                .values()
                .filter(|d| d.seconds_since_last_access() > d.timeout_seconds)
                .map(|d| (d.local_id, d.address, d.port))
                .collect()
        };

        let mut to_evict = Vec::new();
        for (id, address, port) in candidates {
            if self.probe.probe(address, port, self.probe_timeout).await {
                let mut guard = self.inner.lock().unwrap();
                if let Some(d) = guard.devices.get_mut(&id) {
                    d.touch();
                }
            } else {
                to_evict.push(id);
            }
        }

        for id in to_evict {
            let removed = {
                let mut guard = self.inner.lock().unwrap();
                guard.devices.remove(&id)
            };
            if let Some(device) = removed {
                log::warn!("device {id} unresponsive past its timeout, evicting");
                self.sync_sink.dispatch(SyncEvent::Unregistered {
                    local_id: id,
                    universal_id: device.universal_id,
                });
            }
        }
    }
}
