//! Audio synthesis and output

pub mod generator;
pub mod sink;

pub use generator::{NoiseGenerator, NoiseKind, SAMPLE_RATE};
pub use sink::{AudioSink, CpalSink};
