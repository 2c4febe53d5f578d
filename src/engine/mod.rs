//! Engine module - sensor debounce, LED animation and frame encoding

pub mod animation;
pub mod led;
pub mod sensor;

pub use animation::LedAnimator;
pub use led::{FrameCounter, LedEncoder};
pub use sensor::{PanelTransition, SensorEngine};
