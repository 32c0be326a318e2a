//! Playback engine and session state machine

pub mod engine;
pub mod session;

pub use engine::{BufferSource, PlaybackEngine};
pub use session::{PlaybackSession, SessionStatus};
