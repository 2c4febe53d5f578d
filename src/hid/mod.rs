//! HID module - USB HID transport for the RE:Flex v2 pad
//!
//! Discovery goes through [`DeviceRegistry`]; a connected pad is driven by a
//! [`PadSession`] which owns one reader and one writer [`EndpointWorker`].

pub mod device;
pub mod protocol;
pub mod session;
pub mod simulated;
pub mod worker;

pub use device::{DeviceRegistry, HidApiBackend, HidBackend, HidEndpoint, HidError};
pub use protocol::{DeviceSignature, FrameAddress, LedPacket, Packet, SensorSample, PACKET_SIZE};
pub use session::{PadSession, SessionError, SessionState};
pub use simulated::SimulatedBackend;
pub use worker::{DropOldestQueue, EndpointWorker, WorkerExit, WorkerTiming};
