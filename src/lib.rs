//! RE:Flex Pad
//!
//! Host-side driver for the RE:Flex v2 dance pad.
//!
//! # Features
//! - Discovers pads over USB HID and drives one connected pad
//! - Debounces the 16 force sensors into panel press/release events
//! - Animates and streams the per-panel LED grids
//! - Routes typed commands from a presentation layer to the pad and back
//! - Stores named sensor-limit profiles

pub mod core;
pub mod engine;
pub mod hid;
pub mod pad;
pub mod router;

pub use crate::core::config::Config;
pub use crate::core::events::{Response, ResponseId, ResponseValue};
pub use pad::PadState;
pub use router::{Command, DataProcessHandle, PadContext};
