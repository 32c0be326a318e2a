//! Colored-noise synthesis
//!
//! Six fixed noise algorithms producing signed 16-bit mono PCM at 44.1 kHz.
//! Each generator owns its random source and per-algorithm continuity state,
//! so sample streams are continuous across buffer boundaries within one
//! playback run. State resets only when a new generator is constructed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Working sample rate for all synthesis and output (Hz)
pub const SAMPLE_RATE: u32 = 44_100;

/// Number of accumulator rows for the Voss-McCartney pink approximation
const PINK_ROWS: usize = 16;

/// Maximum per-sample step of the brown-noise random walk (unit domain)
const BROWN_STEP: f32 = 0.02;

/// Modulation frequency for green noise (Hz)
const GREEN_FREQ: f32 = 500.0;

/// The six colored-noise algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    White,
    Pink,
    Brown,
    Green,
    Blue,
    Violet,
}

impl NoiseKind {
    /// All kinds in carousel order
    pub const ALL: [NoiseKind; 6] = [
        NoiseKind::White,
        NoiseKind::Pink,
        NoiseKind::Brown,
        NoiseKind::Green,
        NoiseKind::Blue,
        NoiseKind::Violet,
    ];

    /// User-facing display label
    pub fn display_name(&self) -> &'static str {
        match self {
            NoiseKind::White => "White Noise",
            NoiseKind::Pink => "Pink Noise",
            NoiseKind::Brown => "Brown Noise",
            NoiseKind::Green => "Green Noise",
            NoiseKind::Blue => "Blue Noise",
            NoiseKind::Violet => "Violet Noise",
        }
    }

    /// Next kind in carousel order (wraps)
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Previous kind in carousel order (wraps)
    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoiseKind::White => write!(f, "white"),
            NoiseKind::Pink => write!(f, "pink"),
            NoiseKind::Brown => write!(f, "brown"),
            NoiseKind::Green => write!(f, "green"),
            NoiseKind::Blue => write!(f, "blue"),
            NoiseKind::Violet => write!(f, "violet"),
        }
    }
}

impl FromStr for NoiseKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" => Ok(NoiseKind::White),
            "pink" => Ok(NoiseKind::Pink),
            "brown" => Ok(NoiseKind::Brown),
            "green" => Ok(NoiseKind::Green),
            "blue" => Ok(NoiseKind::Blue),
            "violet" => Ok(NoiseKind::Violet),
            other => Err(format!("unknown noise kind: {}", other)),
        }
    }
}

/// Stateful sample generator for one noise kind.
///
/// `next_sample` yields pre-scale samples in the unit domain; blue and violet
/// may exceed ±1 there and are clamped at int16 conversion. Brown walk value,
/// pink rows, difference history and green phase persist across calls.
pub struct NoiseGenerator {
    kind: NoiseKind,
    rng: SmallRng,
    pink_rows: [f32; PINK_ROWS],
    brown_last: f32,
    white_prev: f32,
    blue_prev: f32,
    phase: u64,
}

impl NoiseGenerator {
    /// Create a generator seeded from the OS
    pub fn new(kind: NoiseKind) -> Self {
        Self::from_rng(kind, SmallRng::from_os_rng())
    }

    /// Create a deterministic generator (tests, property checks)
    pub fn seeded(kind: NoiseKind, seed: u64) -> Self {
        Self::from_rng(kind, SmallRng::seed_from_u64(seed))
    }

    fn from_rng(kind: NoiseKind, rng: SmallRng) -> Self {
        Self {
            kind,
            rng,
            pink_rows: [0.0; PINK_ROWS],
            brown_last: 0.0,
            white_prev: 0.0,
            blue_prev: 0.0,
            phase: 0,
        }
    }

    pub fn kind(&self) -> NoiseKind {
        self.kind
    }

    /// Produce one pre-scale sample.
    ///
    /// Every kind draws exactly one uniform value per sample (pink draws a row
    /// index as well), so two generators with the same seed see the same
    /// underlying white sequence regardless of kind.
    pub fn next_sample(&mut self) -> f32 {
        match self.kind {
            NoiseKind::White => self.rng.random_range(-1.0..1.0),
            NoiseKind::Pink => {
                let row = self.rng.random_range(0..PINK_ROWS);
                self.pink_rows[row] = self.rng.random_range(-1.0..1.0);
                self.pink_rows.iter().sum::<f32>() / PINK_ROWS as f32
            }
            NoiseKind::Brown => {
                let white: f32 = self.rng.random_range(-1.0..1.0);
                self.brown_last = (self.brown_last + BROWN_STEP * white).clamp(-1.0, 1.0);
                self.brown_last
            }
            NoiseKind::Green => {
                // Phase wraps at one second; 500 is integral so the modulator
                // stays continuous across the wrap.
                let t = (self.phase % SAMPLE_RATE as u64) as f32 / SAMPLE_RATE as f32;
                self.phase += 1;
                let white: f32 = self.rng.random_range(-1.0..1.0);
                white * (std::f32::consts::TAU * GREEN_FREQ * t).sin()
            }
            NoiseKind::Blue => {
                let white: f32 = self.rng.random_range(-1.0..1.0);
                let blue = white - self.white_prev;
                self.white_prev = white;
                blue
            }
            NoiseKind::Violet => {
                let white: f32 = self.rng.random_range(-1.0..1.0);
                let blue = white - self.white_prev;
                self.white_prev = white;
                let violet = blue - self.blue_prev;
                self.blue_prev = blue;
                violet
            }
        }
    }

    /// Fill a buffer with scaled int16 samples
    pub fn fill(&mut self, buffer: &mut [i16]) {
        for slot in buffer.iter_mut() {
            *slot = scale_to_i16(self.next_sample());
        }
    }

    /// Produce exactly `len` scaled int16 samples; `len == 0` yields an empty
    /// buffer. Never fails.
    pub fn generate(&mut self, len: usize) -> Vec<i16> {
        let mut buffer = vec![0i16; len];
        self.fill(&mut buffer);
        buffer
    }
}

/// Truncate and clamp a unit-domain sample to the valid int16 range
fn scale_to_i16(sample: f32) -> i16 {
    (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
