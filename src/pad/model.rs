//! Pad data model: sensor readings, LED colours, panels and the pad root

use super::topology::{
    led_index, Coord, BLANKS, LED_CELLS, PANEL_COUNT, SENSORS_PER_PANEL,
};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Ceiling of a 12-bit ADC reading
pub const B12_MAX: i32 = 4095;

/// Largest accepted threshold
pub const MAX_THRESHOLD: i32 = 100;

/// Ceiling of `current_value`, leaving headroom for the largest threshold
pub const MAX_CURRENT: i32 = B12_MAX - MAX_THRESHOLD;

/// Ceiling of an 8-bit colour channel
pub const B8_MAX: i32 = 255;

/// Debounce edge produced by a sensor update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Press,
    Release,
}

/// On-threshold and hysteresis pair for one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorLimits {
    pub threshold: u8,
    pub hysteresis: u8,
}

impl Default for SensorLimits {
    fn default() -> Self {
        Self {
            threshold: 30,
            hysteresis: 5,
        }
    }
}

/// Which sensor limit an adjustment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitField {
    Threshold,
    Hysteresis,
}

/// Relative change to one sensor's limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorAdjustment {
    pub panel: usize,
    pub sensor: usize,
    pub field: LimitField,
    pub delta: i32,
}

/// One force sensor with Schmitt-trigger debounce
///
/// `threshold` is always in `[hysteresis, 100]` and `hysteresis` in
/// `[1, threshold]`; the setters clamp rather than reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorReading {
    base_value: u16,
    current_value: u16,
    threshold: u8,
    hysteresis: u8,
    active: bool,
}

impl Default for SensorReading {
    fn default() -> Self {
        Self::new(SensorLimits::default())
    }
}

impl SensorReading {
    pub fn new(limits: SensorLimits) -> Self {
        let mut reading = Self {
            base_value: 0,
            current_value: 0,
            threshold: MAX_THRESHOLD as u8,
            hysteresis: 1,
            active: false,
        };
        reading.restore_limits(limits.threshold.into(), limits.hysteresis.into());
        reading
    }

    pub fn base_value(&self) -> u16 {
        self.base_value
    }

    pub fn current_value(&self) -> u16 {
        self.current_value
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn hysteresis(&self) -> u8 {
        self.hysteresis
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn limits(&self) -> SensorLimits {
        SensorLimits {
            threshold: self.threshold,
            hysteresis: self.hysteresis,
        }
    }

    /// Set the resting level deltas are measured against
    pub fn set_base_value(&mut self, value: i32) {
        self.base_value = value.clamp(0, B12_MAX) as u16;
    }

    /// Store a new sample and run the debounce state machine
    pub fn set_current_value(&mut self, value: i32) -> Option<Edge> {
        self.current_value = value.clamp(0, MAX_CURRENT) as u16;
        self.evaluate()
    }

    pub fn set_threshold(&mut self, value: i32) {
        self.threshold = value.clamp(self.hysteresis.into(), MAX_THRESHOLD) as u8;
    }

    pub fn set_hysteresis(&mut self, value: i32) {
        self.hysteresis = value.clamp(1, self.threshold.into()) as u8;
    }

    /// Apply both limits; threshold first, hysteresis clamped to the result
    pub fn set_limits(&mut self, threshold: i32, hysteresis: i32) {
        self.set_threshold(threshold);
        self.set_hysteresis(hysteresis);
    }

    /// Apply a stored pair regardless of the limits currently held
    ///
    /// The hysteresis floor is dropped first so a valid stored threshold is
    /// never clamped up by the outgoing hysteresis.
    pub fn restore_limits(&mut self, threshold: i32, hysteresis: i32) {
        self.hysteresis = 1;
        self.set_limits(threshold, hysteresis);
    }

    /// Distance of the current sample above the baseline
    pub fn delta(&self) -> i32 {
        i32::from(self.current_value) - i32::from(self.base_value)
    }

    fn evaluate(&mut self) -> Option<Edge> {
        let delta = self.delta();
        let threshold = i32::from(self.threshold);
        let pressed = delta >= threshold;
        let released = delta <= threshold - i32::from(self.hysteresis);

        if !self.active && pressed {
            self.active = true;
            Some(Edge::Press)
        } else if self.active && released {
            self.active = false;
            Some(Edge::Release)
        } else {
            None
        }
    }
}

/// One LED colour, each channel clamped to `0..=255`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedColour {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl LedColour {
    /// Build a colour from unclamped channel values
    pub fn clamped(red: i32, green: i32, blue: i32) -> Self {
        Self {
            red: red.clamp(0, B8_MAX) as u8,
            green: green.clamp(0, B8_MAX) as u8,
            blue: blue.clamp(0, B8_MAX) as u8,
        }
    }
}

/// Sensors and LED grid of one panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelState {
    sensors: [SensorReading; SENSORS_PER_PANEL],
    leds: Vec<LedColour>,
}

impl PanelState {
    pub fn new(limits: SensorLimits) -> Self {
        Self {
            sensors: std::array::from_fn(|_| SensorReading::new(limits)),
            leds: vec![LedColour::default(); LED_CELLS],
        }
    }

    /// Derived: a panel is active while any of its sensors is
    pub fn is_active(&self) -> bool {
        self.sensors.iter().any(SensorReading::is_active)
    }

    pub fn sensors(&self) -> &[SensorReading; SENSORS_PER_PANEL] {
        &self.sensors
    }

    pub fn sensor(&self, index: usize) -> Option<&SensorReading> {
        self.sensors.get(index)
    }

    pub fn sensor_mut(&mut self, index: usize) -> Option<&mut SensorReading> {
        self.sensors.get_mut(index)
    }

    /// Colour buffer, indexed by [`led_index`]
    pub fn leds(&self) -> &[LedColour] {
        &self.leds
    }

    pub fn led(&self, coord: Coord) -> Option<LedColour> {
        self.leds.get(led_index(coord)).copied()
    }

    pub fn set_led(&mut self, coord: Coord, red: i32, green: i32, blue: i32) {
        if let Some(led) = self.leds.get_mut(led_index(coord)) {
            *led = LedColour::clamped(red, green, blue);
        }
    }

    pub fn limits(&self) -> [SensorLimits; SENSORS_PER_PANEL] {
        std::array::from_fn(|i| self.sensors[i].limits())
    }

    pub fn apply_limits(&mut self, limits: &[SensorLimits; SENSORS_PER_PANEL]) {
        for (sensor, limits) in self.sensors.iter_mut().zip(limits) {
            sensor.restore_limits(limits.threshold.into(), limits.hysteresis.into());
        }
    }
}

impl Serialize for PanelState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PanelState", 3)?;
        state.serialize_field("active", &self.is_active())?;
        state.serialize_field("sensors", &self.sensors)?;
        state.serialize_field("leds", &self.leds)?;
        state.end()
    }
}

/// Root of all pad data for a running session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PadState {
    blanks: [Coord; 5],
    panels: [PanelState; PANEL_COUNT],
    /// Limits changed since the last profile save/load
    updated: bool,
    #[serde(skip)]
    defaults: SensorLimits,
}

impl Default for PadState {
    fn default() -> Self {
        Self::new(SensorLimits::default())
    }
}

impl PadState {
    pub fn new(defaults: SensorLimits) -> Self {
        Self {
            blanks: BLANKS,
            panels: std::array::from_fn(|_| PanelState::new(defaults)),
            updated: false,
            defaults,
        }
    }

    pub fn blanks(&self) -> &[Coord; 5] {
        &self.blanks
    }

    pub fn panels(&self) -> &[PanelState; PANEL_COUNT] {
        &self.panels
    }

    pub fn panel(&self, index: usize) -> Option<&PanelState> {
        self.panels.get(index)
    }

    pub fn panel_mut(&mut self, index: usize) -> Option<&mut PanelState> {
        self.panels.get_mut(index)
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn mark_saved(&mut self) {
        self.updated = false;
    }

    /// Apply a relative limit change; returns whether the sensor exists
    ///
    /// A positive delta raises the threshold but narrows the hysteresis band.
    pub fn adjust_sensor(&mut self, adjustment: SensorAdjustment) -> bool {
        let Some(sensor) = self
            .panels
            .get_mut(adjustment.panel)
            .and_then(|panel| panel.sensor_mut(adjustment.sensor))
        else {
            return false;
        };

        match adjustment.field {
            LimitField::Threshold => {
                sensor.set_threshold(i32::from(sensor.threshold()) + adjustment.delta)
            }
            LimitField::Hysteresis => {
                sensor.set_hysteresis(i32::from(sensor.hysteresis()) - adjustment.delta)
            }
        }
        self.updated = true;
        true
    }

    /// Reset every sensor's limits to the configured defaults
    pub fn set_default(&mut self) {
        let defaults = [self.defaults; SENSORS_PER_PANEL];
        for panel in &mut self.panels {
            panel.apply_limits(&defaults);
        }
        self.updated = false;
    }

    /// Limits of every sensor, panel-major
    pub fn limits(&self) -> [[SensorLimits; SENSORS_PER_PANEL]; PANEL_COUNT] {
        std::array::from_fn(|i| self.panels[i].limits())
    }

    pub fn apply_limits(&mut self, limits: &[[SensorLimits; SENSORS_PER_PANEL]; PANEL_COUNT]) {
        for (panel, limits) in self.panels.iter_mut().zip(limits) {
            panel.apply_limits(limits);
        }
        self.updated = false;
    }

    /// Copy of every panel's colour buffer
    pub fn led_snapshot(&self) -> Vec<Vec<LedColour>> {
        self.panels.iter().map(|panel| panel.leds.clone()).collect()
    }
}
