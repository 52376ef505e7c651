pub mod device;
pub mod probe;
pub mod registry;
pub mod state;
pub mod sync;

pub use device::{Device, DeviceInfo, DeviceUpdate, NewDevice, StateSlot};
pub use probe::{CoapLivenessProbe, LivenessProbe};
pub use registry::{Origin, Registry};
pub use sync::{NullSink, SyncEvent, SyncSink};
