//! Press-reactive LED animation
//!
//! Each panel shows an arrow pointing away from the pad centre. A pressed
//! panel fades in over the attack time and fades out over the decay time once
//! released; the colour is a hue gradient that drifts with every update.

use crate::pad::model::PadState;
use crate::pad::topology::{Coord, GRID_SIZE, PANEL_COUNT};
use std::time::{Duration, Instant};

/// Fade-in time after a press
pub const ATTACK: Duration = Duration::from_millis(50);

/// Fade-out time after a release
pub const DECAY: Duration = Duration::from_millis(100);

/// Channel ceiling for animated colours
pub const BRIGHTNESS: f64 = 75.0;

const HUE_DRIFT: f64 = 0.003;

const ARROW: [[u8; GRID_SIZE]; GRID_SIZE] = [
    [0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0],
    [0, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 0],
    [0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [0, 1, 1, 0, 1, 1, 1, 1, 0, 1, 1, 0],
    [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0],
];

/// Quarter turns clockwise per panel (left, down, up, right)
const ROTATIONS: [usize; PANEL_COUNT] = [3, 2, 0, 1];

type Grid = [[u8; GRID_SIZE]; GRID_SIZE];

fn rotate_clockwise(grid: &Grid) -> Grid {
    let mut rotated = [[0u8; GRID_SIZE]; GRID_SIZE];
    for (y, row) in rotated.iter_mut().enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = grid[GRID_SIZE - 1 - x][y];
        }
    }
    rotated
}

fn arrow_cells(rotations: usize) -> Vec<Coord> {
    let mut grid = ARROW;
    for _ in 0..rotations {
        grid = rotate_clockwise(&grid);
    }
    let mut cells = Vec::new();
    for (y, row) in grid.iter().enumerate() {
        for (x, &cell) in row.iter().enumerate() {
            if cell != 0 {
                cells.push((x as u8, y as u8));
            }
        }
    }
    cells
}

#[derive(Debug, Clone, Copy, Default)]
enum Envelope {
    #[default]
    Idle,
    Attack(Instant),
    Release(Instant),
}

/// Drives the pad's LED colours from panel activity
#[derive(Debug)]
pub struct LedAnimator {
    arrows: [Vec<Coord>; PANEL_COUNT],
    envelopes: [Envelope; PANEL_COUNT],
    tick: u64,
}

impl Default for LedAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl LedAnimator {
    pub fn new() -> Self {
        Self {
            arrows: std::array::from_fn(|panel| arrow_cells(ROTATIONS[panel])),
            envelopes: [Envelope::Idle; PANEL_COUNT],
            tick: 0,
        }
    }

    /// Cells lit by the animation on a panel
    pub fn arrow(&self, panel: usize) -> Option<&[Coord]> {
        self.arrows.get(panel).map(Vec::as_slice)
    }

    /// Recompute every arrow colour for the instant `now`
    pub fn update(&mut self, pad: &mut PadState, now: Instant) {
        self.tick += 1;
        let phase = self.tick as f64 * HUE_DRIFT;

        for panel_index in 0..PANEL_COUNT {
            let Some(panel) = pad.panel_mut(panel_index) else {
                continue;
            };
            let level = self.level(panel_index, panel.is_active(), now);
            let value = (255.0 * level) as u8;

            for &coord in &self.arrows[panel_index] {
                let hue = hue_at(panel_index, coord, phase);
                let (r, g, b) = hsv_to_rgb(hue, 255, value);
                panel.set_led(coord, r.into(), g.into(), b.into());
            }
        }
    }

    fn level(&mut self, panel: usize, active: bool, now: Instant) -> f64 {
        let envelope = &mut self.envelopes[panel];
        match (*envelope, active) {
            (Envelope::Attack(start), true) => ramp(now.saturating_duration_since(start), ATTACK),
            (_, true) => {
                *envelope = Envelope::Attack(now);
                0.0
            }
            (Envelope::Attack(_), false) => {
                *envelope = Envelope::Release(now);
                1.0
            }
            (Envelope::Release(end), false) => {
                1.0 - ramp(now.saturating_duration_since(end), DECAY)
            }
            (Envelope::Idle, false) => 0.0,
        }
    }
}

fn ramp(elapsed: Duration, span: Duration) -> f64 {
    if elapsed >= span {
        1.0
    } else {
        elapsed.as_secs_f64() / span.as_secs_f64()
    }
}

fn hue_at(panel: usize, (x, y): Coord, phase: f64) -> u8 {
    let (x, y) = (f64::from(x), f64::from(y));
    let edge = (GRID_SIZE - 1) as f64;
    let (dx, dy) = match panel {
        1 => (x * 0.01, y * 0.05),
        3 => (x * 0.05, y * 0.01),
        2 => ((edge - x) * 0.01, (edge - y) * 0.05),
        _ => ((edge - x) * 0.05, (edge - y) * 0.01),
    };
    (((phase + dx + dy) * 255.0) as u64 % 255) as u8
}

/// Convert 8-bit HSV to RGB scaled to [`BRIGHTNESS`]
pub fn hsv_to_rgb(hue: u8, saturation: u8, value: u8) -> (u8, u8, u8) {
    let h = f64::from(hue) * 360.0 / 255.0;
    let s = f64::from(saturation) / 255.0;
    let v = f64::from(value) / 255.0;

    let (r, g, b) = if s == 0.0 {
        (v, v, v)
    } else {
        let sector = (h / 60.0).floor();
        let f = h / 60.0 - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        match sector as u32 % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        }
    };
    let scale = |c: f64| (c * BRIGHTNESS) as u8;
    (scale(r), scale(g), scale(b))
}
