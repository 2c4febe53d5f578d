//! Fixed RE:Flex v2 pad topology
//!
//! Four panels in a cross, four force sensors per panel and a 12x12 LED grid
//! per panel of which the diamond-shaped region is populated. The populated
//! cells are split into four segments of 21 LEDs, one segment per protocol
//! write.

use once_cell::sync::Lazy;

/// Grid coordinate `(x, y)`
pub type Coord = (u8, u8);

/// Number of panels on the pad
pub const PANEL_COUNT: usize = 4;

/// Number of force sensors per panel
pub const SENSORS_PER_PANEL: usize = 4;

/// Width and height of a panel's LED grid
pub const GRID_SIZE: usize = 12;

/// Cells in a panel's LED grid (populated or not)
pub const LED_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// Segments a panel's populated LEDs are split into
pub const SEGMENT_COUNT: usize = 4;

/// LEDs addressed by one segment write
pub const LEDS_PER_SEGMENT: usize = 21;

/// Populated LEDs per panel
pub const LIT_LEDS: usize = SEGMENT_COUNT * LEDS_PER_SEGMENT;

/// Panel positions on the 3x3 pad layout, in protocol order
pub const PANELS: [Coord; PANEL_COUNT] = [(0, 1), (1, 0), (1, 2), (2, 1)];

/// Sensor positions within a panel, in protocol order
pub const SENSORS: [Coord; SENSORS_PER_PANEL] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// Decorative (non-panel) positions on the 3x3 pad layout
pub const BLANKS: [Coord; 5] = [(0, 0), (0, 2), (1, 1), (2, 0), (2, 2)];

const DIAMOND: [[u8; GRID_SIZE]; GRID_SIZE] = [
    [0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0],
    [0, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 0],
    [0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0],
    [0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0],
    [0, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0],
];

static TOPOLOGY: Lazy<PadTopology> = Lazy::new(PadTopology::build);

/// Read-only description of the pad layout
#[derive(Debug)]
pub struct PadTopology {
    /// Populated cells, row-major
    led_mask: Vec<Coord>,
    /// Populated cells per segment, in wire order
    segments: [[Coord; LEDS_PER_SEGMENT]; SEGMENT_COUNT],
}

impl PadTopology {
    /// Shared topology instance
    pub fn get() -> &'static PadTopology {
        &TOPOLOGY
    }

    fn build() -> Self {
        let mut led_mask = Vec::with_capacity(LIT_LEDS);
        for (y, row) in DIAMOND.iter().enumerate() {
            for (x, &cell) in row.iter().enumerate() {
                if cell != 0 {
                    led_mask.push((x as u8, y as u8));
                }
            }
        }

        // Diagonal stripes: order by anti-diagonal, then column.
        let mut diagonal = led_mask.clone();
        diagonal.sort_by_key(|&(x, y)| (x + y, x));

        let mut segments = [[(0, 0); LEDS_PER_SEGMENT]; SEGMENT_COUNT];
        for (i, coord) in diagonal.into_iter().enumerate() {
            if let Some(slot) = segments
                .get_mut(i / LEDS_PER_SEGMENT)
                .and_then(|segment| segment.get_mut(i % LEDS_PER_SEGMENT))
            {
                *slot = coord;
            }
        }

        Self { led_mask, segments }
    }

    /// Populated LED cells, row-major
    pub fn led_mask(&self) -> &[Coord] {
        &self.led_mask
    }

    /// Cells addressed by a segment, in wire order
    pub fn segment(&self, index: usize) -> Option<&[Coord; LEDS_PER_SEGMENT]> {
        self.segments.get(index)
    }

    /// Whether a grid cell carries an LED
    pub fn is_lit(&self, coord: Coord) -> bool {
        DIAMOND
            .get(coord.1 as usize)
            .and_then(|row| row.get(coord.0 as usize))
            .is_some_and(|&cell| cell != 0)
    }
}

/// Flat index of a grid cell inside a panel's colour buffer
pub fn led_index(coord: Coord) -> usize {
    coord.1 as usize * GRID_SIZE + coord.0 as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mask_has_84_cells() {
        let topology = PadTopology::get();
        assert_eq!(topology.led_mask().len(), LIT_LEDS);
        assert!(topology.led_mask().iter().all(|&c| topology.is_lit(c)));
    }

    #[test]
    fn test_segments_cover_mask_disjointly() {
        let topology = PadTopology::get();
        let mut seen = HashSet::new();
        for index in 0..SEGMENT_COUNT {
            for &coord in topology.segment(index).unwrap() {
                assert!(topology.is_lit(coord));
                assert!(seen.insert(coord), "{:?} appears twice", coord);
            }
        }
        assert_eq!(seen.len(), LIT_LEDS);
        assert!(topology.segment(SEGMENT_COUNT).is_none());
    }

    #[test]
    fn test_segments_are_diagonal_stripes() {
        let topology = PadTopology::get();
        let last_of_first = topology.segment(0).unwrap()[LEDS_PER_SEGMENT - 1];
        let first_of_second = topology.segment(1).unwrap()[0];
        assert!(last_of_first.0 + last_of_first.1 <= first_of_second.0 + first_of_second.1);
    }

    #[test]
    fn test_led_index() {
        assert_eq!(led_index((0, 0)), 0);
        assert_eq!(led_index((11, 11)), LED_CELLS - 1);
        assert_eq!(led_index((5, 1)), 17);
        assert!(!PadTopology::get().is_lit((0, 0)));
        assert!(!PadTopology::get().is_lit((12, 0)));
    }
}
