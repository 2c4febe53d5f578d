//! LED frame encoder
//!
//! The pad accepts one segment (21 LEDs) per write. [`FrameCounter`] walks
//! segment-fastest through every panel, bumping the frame index once per full
//! sweep; [`LedEncoder`] re-samples the pad's colours at the start of each
//! sweep so all 16 packets of one frame come from the same snapshot.

use crate::hid::protocol::{FrameAddress, LedPacket, FRAME_COUNT};
use crate::pad::model::{LedColour, PadState};
use crate::pad::topology::{led_index, PadTopology, PANEL_COUNT, SEGMENT_COUNT};
use once_cell::sync::Lazy;
use tracing::trace;

/// Perceptual gamma applied to every transmitted channel
pub const GAMMA: f64 = 2.2;

static GAMMA_TABLE: Lazy<[u8; 256]> = Lazy::new(|| {
    let mut table = [0u8; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let normalised = i as f64 / 255.0;
        *entry = (normalised.powf(GAMMA) * 255.0).round() as u8;
    }
    table
});

/// Gamma-correct one channel value
pub fn gamma(value: u8) -> u8 {
    GAMMA_TABLE[usize::from(value)]
}

/// Panel, segment and frame cycling counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounter {
    panel: u8,
    segment: u8,
    frame: u8,
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCounter {
    /// Start on the last address so the first advance lands on `(0, 0, 0)`
    pub fn new() -> Self {
        Self {
            panel: (PANEL_COUNT - 1) as u8,
            segment: (SEGMENT_COUNT - 1) as u8,
            frame: (FRAME_COUNT - 1) as u8,
        }
    }

    /// Move to the next address and return it
    pub fn advance(&mut self) -> FrameAddress {
        self.segment = (self.segment + 1) % SEGMENT_COUNT as u8;
        if self.segment == 0 {
            self.panel = (self.panel + 1) % PANEL_COUNT as u8;
            if self.panel == 0 {
                self.frame = (self.frame + 1) % FRAME_COUNT as u8;
            }
        }
        self.address()
    }

    pub fn address(&self) -> FrameAddress {
        FrameAddress::new(self.panel, self.segment, self.frame)
    }

    /// Whether the current address opens a new sweep
    pub fn at_sweep_start(&self) -> bool {
        self.panel == 0 && self.segment == 0
    }
}

/// Serialises the pad's colours into outbound packets
#[derive(Debug, Default)]
pub struct LedEncoder {
    counter: FrameCounter,
    snapshot: Option<Vec<Vec<LedColour>>>,
    snapshots: u64,
}

impl LedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart from the first address with no snapshot
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn counter(&self) -> &FrameCounter {
        &self.counter
    }

    /// Colour snapshots taken since creation or the last reset
    pub fn snapshot_count(&self) -> u64 {
        self.snapshots
    }

    /// Advance the counters and encode the packet for the new address
    pub fn tick(&mut self, pad: &PadState) -> LedPacket {
        let address = self.counter.advance();
        if self.counter.at_sweep_start() {
            self.snapshot = Some(pad.led_snapshot());
            self.snapshots += 1;
            trace!("LED snapshot {} for frame {}", self.snapshots, address.frame());
        }
        self.encode(address)
    }

    fn encode(&self, address: FrameAddress) -> LedPacket {
        let mut packet = LedPacket::new(address);
        let colours = self
            .snapshot
            .as_ref()
            .and_then(|panels| panels.get(usize::from(address.panel())));
        let (Some(colours), Some(segment)) = (
            colours,
            PadTopology::get().segment(usize::from(address.segment())),
        ) else {
            return packet;
        };

        for (index, &coord) in segment.iter().enumerate() {
            if let Some(colour) = colours.get(led_index(coord)) {
                packet.set_led(index, gamma(colour.green), gamma(colour.red), gamma(colour.blue));
            }
        }
        packet
    }
}
