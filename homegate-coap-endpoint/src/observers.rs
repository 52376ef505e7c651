use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Why a resource changed -- drives which observers get notified (§4.3's asymmetric core).
#[derive(Clone, Copy, Debug)]
pub enum NotifyOrigin {
    /// The device itself reported a change (`current_state` write).
    Device(Ipv4Addr),
    /// A non-device client requested a change (`desired_state` write).
    Client,
    /// Any other resource change (creation, rename, deletion, ...).
    Other,
}

/// Tracks which peers observe which resource paths. The CoAP library is assumed to own
/// retransmission and sequence-number bookkeeping for the Observe option itself (§4.4); this
/// table only decides, for a given change, which registered peers should receive the new
/// representation.
#[derive(Default)]
pub struct ObserverTable {
    by_path: Mutex<HashMap<String, HashSet<SocketAddr>>>,
    sequence: AtomicU32,
}

impl ObserverTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: &str, peer: SocketAddr) {
        self.by_path
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .insert(peer);
    }

    pub fn deregister(&self, path: &str, peer: SocketAddr) {
        if let Some(set) = self.by_path.lock().unwrap().get_mut(path) {
            set.remove(&peer);
        }
    }

    pub fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Computes the §4.3 notification set for a path given why it changed. `device_addr` is
    /// the owning device's address, needed to split the device itself out of (or into) the
    /// target set.
    pub fn targets_for(&self, path: &str, origin: NotifyOrigin, device_addr: Ipv4Addr) -> Vec<SocketAddr> {
        let table = self.by_path.lock().unwrap();
        let Some(observers) = table.get(path) else {
            return Vec::new();
        };
        match origin {
            NotifyOrigin::Device(_) => observers
                .iter()
                .filter(|addr| addr.ip() != device_addr)
                .copied()
                .collect(),
            NotifyOrigin::Client => observers
                .iter()
                .filter(|addr| addr.ip() == device_addr)
                .copied()
                .collect(),
            NotifyOrigin::Other => observers.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(ip: [u8; 4], port: u16) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::from(ip), port))
    }

    #[test]
    fn device_originated_change_excludes_the_device() {
        let table = ObserverTable::new();
        let device = addr([192, 168, 1, 50], 5683);
        let client = addr([192, 168, 1, 10], 5683);
        table.register("/devices/1/state", device);
        table.register("/devices/1/state", client);

        let targets = table.targets_for(
            "/devices/1/state",
            NotifyOrigin::Device(Ipv4Addr::new(192, 168, 1, 50)),
            Ipv4Addr::new(192, 168, 1, 50),
        );
        assert_eq!(targets, vec![client]);
    }

    #[test]
    fn client_originated_change_notifies_only_the_device() {
        let table = ObserverTable::new();
        let device = addr([192, 168, 1, 50], 5683);
        let client = addr([192, 168, 1, 10], 5683);
        table.register("/devices/1/state", device);
        table.register("/devices/1/state", client);

        let targets = table.targets_for(
            "/devices/1/state",
            NotifyOrigin::Client,
            Ipv4Addr::new(192, 168, 1, 50),
        );
        assert_eq!(targets, vec![device]);
    }

    #[test]
    fn other_changes_notify_everyone() {
        let table = ObserverTable::new();
        let device = addr([192, 168, 1, 50], 5683);
        let client = addr([192, 168, 1, 10], 5683);
        table.register("/devices/1", device);
        table.register("/devices/1", client);

        let mut targets = table.targets_for(
            "/devices/1",
            NotifyOrigin::Other,
            Ipv4Addr::new(192, 168, 1, 50),
        );
        targets.sort_by_key(|a| a.to_string());
        let mut expected = vec![device, client];
        expected.sort_by_key(|a| a.to_string());
        assert_eq!(targets, expected);
    }
}
