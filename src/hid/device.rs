//! HID device discovery and endpoint access

use super::protocol::{DeviceSignature, Packet, PACKET_SIZE};
use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Transport failures
#[derive(Debug, Error)]
pub enum HidError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("HID API error: {0}")]
    Api(String),

    #[error("HID read error: {0}")]
    Read(String),

    #[error("HID write error: {0}")]
    Write(String),

    #[error("Failed to spawn endpoint worker: {0}")]
    Spawn(String),
}

/// One opened device, used by exactly one endpoint worker
pub trait HidEndpoint: Send {
    /// Read one packet; `Ok(0)` means the timeout elapsed without data
    fn read(&mut self, buffer: &mut Packet, timeout: Duration) -> Result<usize, HidError>;

    fn write(&mut self, packet: &Packet) -> Result<usize, HidError>;
}

/// Platform HID access
pub trait HidBackend: Send + Sync {
    /// Serial numbers of attached devices matching the signature
    fn serials(&self, signature: &DeviceSignature) -> Result<Vec<String>, HidError>;

    /// Open the device with the given serial
    fn open(
        &self,
        signature: &DeviceSignature,
        serial: &str,
    ) -> Result<Box<dyn HidEndpoint>, HidError>;
}

/// Enumerates and opens devices of one signature
#[derive(Clone)]
pub struct DeviceRegistry {
    backend: Arc<dyn HidBackend>,
    signature: DeviceSignature,
}

impl DeviceRegistry {
    pub fn new(backend: Arc<dyn HidBackend>, signature: DeviceSignature) -> Self {
        Self { backend, signature }
    }

    pub fn signature(&self) -> &DeviceSignature {
        &self.signature
    }

    /// Deduplicated serials of attached devices
    ///
    /// Order is not stable across calls; callers diff against their own set.
    pub fn enumerate(&self) -> Result<Vec<String>, HidError> {
        let mut serials: Vec<String> = Vec::new();
        for serial in self.backend.serials(&self.signature)? {
            if !serials.contains(&serial) {
                serials.push(serial);
            }
        }
        debug!(
            "Found {} device(s) for {:04X}:{:04X}",
            serials.len(),
            self.signature.vendor_id,
            self.signature.product_id
        );
        Ok(serials)
    }

    pub fn open_by_serial(&self, serial: &str) -> Result<Box<dyn HidEndpoint>, HidError> {
        self.backend.open(&self.signature, serial)
    }
}

/// `hidapi`-backed device access
pub struct HidApiBackend {
    api: Mutex<HidApi>,
}

impl HidApiBackend {
    pub fn new() -> Result<Self, HidError> {
        let api = HidApi::new().map_err(|e| HidError::Api(e.to_string()))?;
        Ok(Self {
            api: Mutex::new(api),
        })
    }
}

impl HidBackend for HidApiBackend {
    fn serials(&self, signature: &DeviceSignature) -> Result<Vec<String>, HidError> {
        let mut api = self.api.lock();
        api.refresh_devices()
            .map_err(|e| HidError::Api(e.to_string()))?;

        Ok(api
            .device_list()
            .filter(|d| signature.matches(d.vendor_id(), d.product_id()))
            .filter_map(|d| d.serial_number().map(str::to_string))
            .collect())
    }

    fn open(
        &self,
        signature: &DeviceSignature,
        serial: &str,
    ) -> Result<Box<dyn HidEndpoint>, HidError> {
        let mut api = self.api.lock();
        api.refresh_devices()
            .map_err(|e| HidError::Api(e.to_string()))?;

        let device_info = api
            .device_list()
            .find(|d| {
                signature.matches(d.vendor_id(), d.product_id())
                    && d.serial_number() == Some(serial)
            })
            .ok_or_else(|| HidError::DeviceNotFound(serial.to_string()))?;

        let device = device_info
            .open_device(&api)
            .map_err(|e| HidError::Api(e.to_string()))?;

        info!(
            "Opened device: {} {} ({})",
            device_info.manufacturer_string().unwrap_or("Unknown"),
            device_info.product_string().unwrap_or("Unknown"),
            serial
        );
        Ok(Box::new(HidApiEndpoint { device }))
    }
}

struct HidApiEndpoint {
    device: HidDevice,
}

impl HidEndpoint for HidApiEndpoint {
    fn read(&mut self, buffer: &mut Packet, timeout: Duration) -> Result<usize, HidError> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        self.device
            .read_timeout(buffer, timeout_ms)
            .map_err(|e| HidError::Read(e.to_string()))
    }

    fn write(&mut self, packet: &Packet) -> Result<usize, HidError> {
        // hidapi expects the report number first; the pad uses unnumbered reports.
        let mut data = Vec::with_capacity(PACKET_SIZE + 1);
        data.push(0x00);
        data.extend_from_slice(packet);

        let written = self
            .device
            .write(&data)
            .map_err(|e| HidError::Write(e.to_string()))?;
        trace!("Wrote {} bytes to HID device", written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ListBackend(Vec<&'static str>);

    impl HidBackend for ListBackend {
        fn serials(&self, _signature: &DeviceSignature) -> Result<Vec<String>, HidError> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }

        fn open(
            &self,
            _signature: &DeviceSignature,
            serial: &str,
        ) -> Result<Box<dyn HidEndpoint>, HidError> {
            Err(HidError::DeviceNotFound(serial.to_string()))
        }
    }

    #[test]
    fn test_enumerate_deduplicates() {
        let registry = DeviceRegistry::new(
            Arc::new(ListBackend(vec!["A1", "B2", "A1", "C3", "B2"])),
            DeviceSignature::REFLEX_V2,
        );
        assert_eq!(registry.enumerate().unwrap(), vec!["A1", "B2", "C3"]);
    }

    #[test]
    fn test_open_unknown_serial() {
        let registry = DeviceRegistry::new(Arc::new(ListBackend(vec![])), DeviceSignature::REFLEX_V2);
        assert!(matches!(
            registry.open_by_serial("nope"),
            Err(HidError::DeviceNotFound(s)) if s == "nope"
        ));
    }

    #[test]
    fn test_error_display() {
        let err = HidError::DeviceNotFound("XYZ".to_string());
        assert_eq!(format!("{}", err), "Device not found: XYZ");
    }
}
