//! HID protocol definitions for RE:Flex v2 communication
//!
//! Both endpoints exchange 64-byte packets:
//! - Read: 16 little-endian sensor readings (4 panels x 4 sensors, panel-major)
//! - Write: byte 0 frame address, bytes 1-63 as 21 (green, red, blue) triplets

use crate::pad::topology::{LEDS_PER_SEGMENT, PANEL_COUNT, SENSORS_PER_PANEL};

/// HID packet size in bytes
pub const PACKET_SIZE: usize = 64;

/// Number of animation frames before the frame index wraps
pub const FRAME_COUNT: usize = 16;

/// A raw packet as exchanged with an endpoint
pub type Packet = [u8; PACKET_SIZE];

/// USB identity and endpoint layout of one hardware generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSignature {
    pub vendor_id: u16,
    pub product_id: u16,
    pub read_endpoint: u8,
    pub write_endpoint: u8,
    pub packet_size: usize,
}

impl DeviceSignature {
    /// RE:Flex v2 dance pad
    pub const REFLEX_V2: Self = Self {
        vendor_id: 0x0483,
        product_id: 0x5750,
        read_endpoint: 0x81,
        write_endpoint: 0x01,
        packet_size: PACKET_SIZE,
    };

    /// Whether a USB vendor/product pair belongs to this signature
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl Default for DeviceSignature {
    fn default() -> Self {
        Self::REFLEX_V2
    }
}

/// Packed `(panel << 6) | (segment << 4) | frame` header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameAddress(u8);

impl FrameAddress {
    /// Pack an address; out-of-range components are masked to their field width
    pub fn new(panel: u8, segment: u8, frame: u8) -> Self {
        Self(((panel & 0x03) << 6) | ((segment & 0x03) << 4) | (frame & 0x0F))
    }

    pub fn panel(self) -> u8 {
        self.0 >> 6
    }

    pub fn segment(self) -> u8 {
        (self.0 >> 4) & 0x03
    }

    pub fn frame(self) -> u8 {
        self.0 & 0x0F
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }
}

/// Decoded sensor readings of one inbound packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorSample {
    values: [[u16; SENSORS_PER_PANEL]; PANEL_COUNT],
}

impl SensorSample {
    /// Decode two little-endian bytes per sensor; missing bytes read as zero
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut values = [[0u16; SENSORS_PER_PANEL]; PANEL_COUNT];
        for (panel, sensors) in values.iter_mut().enumerate() {
            for (sensor, value) in sensors.iter_mut().enumerate() {
                let offset = (panel * SENSORS_PER_PANEL + sensor) * 2;
                let lo = bytes.get(offset).copied().unwrap_or(0);
                let hi = bytes.get(offset + 1).copied().unwrap_or(0);
                *value = u16::from(lo) | (u16::from(hi) << 8);
            }
        }
        Self { values }
    }

    /// Encode back into packet layout
    pub fn to_packet(&self) -> Packet {
        let mut packet = [0u8; PACKET_SIZE];
        for (i, value) in self.values.iter().flatten().enumerate() {
            let [lo, hi] = value.to_le_bytes();
            packet[i * 2] = lo;
            packet[i * 2 + 1] = hi;
        }
        packet
    }

    pub fn from_values(values: [[u16; SENSORS_PER_PANEL]; PANEL_COUNT]) -> Self {
        Self { values }
    }

    pub fn value(&self, panel: usize, sensor: usize) -> Option<u16> {
        self.values.get(panel)?.get(sensor).copied()
    }

    pub fn values(&self) -> &[[u16; SENSORS_PER_PANEL]; PANEL_COUNT] {
        &self.values
    }
}

/// One outbound LED packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedPacket {
    data: Packet,
}

impl LedPacket {
    /// Create an all-dark packet for the given address
    pub fn new(address: FrameAddress) -> Self {
        let mut data = [0u8; PACKET_SIZE];
        data[0] = address.as_byte();
        Self { data }
    }

    pub fn address(&self) -> FrameAddress {
        FrameAddress::from_byte(self.data[0])
    }

    /// Set the wire triplet of the `index`-th LED of the segment
    pub fn set_led(&mut self, index: usize, green: u8, red: u8, blue: u8) {
        if index >= LEDS_PER_SEGMENT {
            return;
        }
        let offset = 1 + index * 3;
        self.data[offset] = green;
        self.data[offset + 1] = red;
        self.data[offset + 2] = blue;
    }

    /// Wire triplet `(green, red, blue)` of the `index`-th LED
    pub fn led(&self, index: usize) -> Option<(u8, u8, u8)> {
        if index >= LEDS_PER_SEGMENT {
            return None;
        }
        let offset = 1 + index * 3;
        Some((self.data[offset], self.data[offset + 1], self.data[offset + 2]))
    }

    /// Get raw packet data for sending
    pub fn as_bytes(&self) -> &Packet {
        &self.data
    }

    pub fn into_bytes(self) -> Packet {
        self.data
    }
}

const _: () = assert!(1 + LEDS_PER_SEGMENT * 3 == PACKET_SIZE);
const _: () = assert!(PANEL_COUNT * SENSORS_PER_PANEL * 2 <= PACKET_SIZE);
