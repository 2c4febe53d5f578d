//! Software stand-in for a connected pad
//!
//! Produces resting sensor values for a short settling period, then a slow
//! sine wave per sensor so every panel is pressed and released in turn.
//! Written LED packets are counted and discarded.

use super::device::{HidBackend, HidEndpoint, HidError};
use super::protocol::{DeviceSignature, Packet, SensorSample};
use crate::pad::topology::{PANEL_COUNT, SENSORS_PER_PANEL};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serial reported by the simulated pad
pub const SIMULATED_SERIAL: &str = "SIMULATED-0001";

/// Resting ADC level of every simulated sensor
pub const REST_VALUE: u16 = 1000;

/// Reads returning the resting level before the wave starts
const SETTLE_READS: u64 = 100;

/// Peak excursion above rest
const AMPLITUDE: f64 = 100.0;

/// Backend exposing exactly one simulated pad
#[derive(Debug, Default, Clone)]
pub struct SimulatedBackend {
    writes: Arc<AtomicUsize>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// LED packets written across every endpoint opened so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl HidBackend for SimulatedBackend {
    fn serials(&self, _signature: &DeviceSignature) -> Result<Vec<String>, HidError> {
        Ok(vec![SIMULATED_SERIAL.to_string()])
    }

    fn open(
        &self,
        _signature: &DeviceSignature,
        serial: &str,
    ) -> Result<Box<dyn HidEndpoint>, HidError> {
        if serial != SIMULATED_SERIAL {
            return Err(HidError::DeviceNotFound(serial.to_string()));
        }
        Ok(Box::new(SimulatedEndpoint {
            tick: 0,
            writes: Arc::clone(&self.writes),
        }))
    }
}

struct SimulatedEndpoint {
    tick: u64,
    writes: Arc<AtomicUsize>,
}

/// Sensor values at a given read count
pub fn sample_at(tick: u64) -> SensorSample {
    let mut values = [[REST_VALUE; SENSORS_PER_PANEL]; PANEL_COUNT];
    if tick < SETTLE_READS {
        return SensorSample::from_values(values);
    }
    let t = (tick - SETTLE_READS) as f64;
    for (panel, sensors) in values.iter_mut().enumerate() {
        for (sensor, value) in sensors.iter_mut().enumerate() {
            let phase = 5.0 * (panel * SENSORS_PER_PANEL + sensor) as f64;
            let lift = (t / 50.0 + phase).sin().max(0.0) * AMPLITUDE;
            *value = REST_VALUE + lift as u16;
        }
    }
    SensorSample::from_values(values)
}

impl HidEndpoint for SimulatedEndpoint {
    fn read(&mut self, buffer: &mut Packet, _timeout: Duration) -> Result<usize, HidError> {
        // Roughly the hardware's 1 kHz report rate.
        std::thread::sleep(Duration::from_millis(1));
        *buffer = sample_at(self.tick).to_packet();
        self.tick += 1;
        Ok(buffer.len())
    }

    fn write(&mut self, packet: &Packet) -> Result<usize, HidError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(packet.len())
    }
}
