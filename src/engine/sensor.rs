//! Sensor debounce engine
//!
//! Applies decoded samples to the pad and reports panel-level press and
//! release transitions.

use crate::hid::protocol::SensorSample;
use crate::pad::model::{Edge, PadState};
use serde::Serialize;
use tracing::{debug, trace};

/// A panel changed between pressed and released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelTransition {
    pub panel: usize,
    pub edge: Edge,
}

/// Feeds samples into the pad model
#[derive(Debug)]
pub struct SensorEngine {
    baseline_pending: bool,
}

impl Default for SensorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorEngine {
    /// The first processed sample becomes the baseline
    pub fn new() -> Self {
        Self {
            baseline_pending: true,
        }
    }

    /// Take the next sample as the new resting level
    pub fn request_baseline(&mut self) {
        self.baseline_pending = true;
    }

    pub fn baseline_pending(&self) -> bool {
        self.baseline_pending
    }

    /// Apply one sample, returning panel transitions in panel order
    pub fn process(&mut self, pad: &mut PadState, sample: &SensorSample) -> Vec<PanelTransition> {
        let rebaseline = std::mem::take(&mut self.baseline_pending);
        if rebaseline {
            debug!("Capturing sensor baseline");
        }

        let mut transitions = Vec::new();
        for (index, values) in sample.values().iter().enumerate() {
            let Some(panel) = pad.panel_mut(index) else {
                continue;
            };
            let was_active = panel.is_active();

            for (sensor_index, &value) in values.iter().enumerate() {
                let Some(sensor) = panel.sensor_mut(sensor_index) else {
                    continue;
                };
                if rebaseline {
                    sensor.set_base_value(i32::from(value));
                }
                if let Some(edge) = sensor.set_current_value(i32::from(value)) {
                    trace!("Panel {} sensor {} {:?}", index, sensor_index, edge);
                }
            }

            match (was_active, panel.is_active()) {
                (false, true) => transitions.push(PanelTransition {
                    panel: index,
                    edge: Edge::Press,
                }),
                (true, false) => transitions.push(PanelTransition {
                    panel: index,
                    edge: Edge::Release,
                }),
                _ => {}
            }
        }
        transitions
    }
}
