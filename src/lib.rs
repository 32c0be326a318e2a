//! # chromatone
//!
//! Continuous colored-noise player: six fixed noise algorithms synthesized as
//! 16-bit mono PCM at 44.1 kHz, streamed to the system audio device on a
//! dedicated production thread, with play/stop/volume/timer control over an
//! HTTP+SSE surface.
//!
//! A `PlaybackEngine` thread pulls buffers from a `NoiseGenerator` and writes
//! them to an `AudioSink`; the `PlaybackSession` state machine coordinates
//! engine runs and the one-second countdown tick.

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod playback;

pub use error::{Error, Result};
pub use playback::session::PlaybackSession;
