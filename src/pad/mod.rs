//! Pad module - fixed topology, live pad data and sensor-limit profiles

pub mod model;
pub mod profile;
pub mod topology;

pub use model::{Edge, LedColour, PadState, PanelState, SensorLimits, SensorReading};
pub use profile::{JsonFileStorage, MemoryStorage, ProfileController, ProfileRecord};
pub use topology::{Coord, PadTopology};
