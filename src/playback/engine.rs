//! Production loop
//!
//! One background thread pulls sample buffers from a `BufferSource`, applies
//! volume scaling and writes them to an `AudioSink`. The sink's blocking
//! `write` is the only pacing mechanism. At most one loop runs at a time;
//! `start` is idempotent and `stop` is safe to call whenever.

use crate::audio::generator::NoiseGenerator;
use crate::audio::sink::AudioSink;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Bounded wait for the production thread to observe the stop flag
const STOP_JOIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Supplier of sample buffers for the production loop.
///
/// `produce` returns exactly `len` samples, costs no more than generation
/// time, and never fails for valid input.
pub trait BufferSource: Send {
    fn produce(&mut self, len: usize) -> Vec<i16>;
}

impl BufferSource for NoiseGenerator {
    fn produce(&mut self, len: usize) -> Vec<i16> {
        self.generate(len)
    }
}

/// Deferred sink acquisition, run on the production thread.
///
/// cpal streams are not `Send`, so the sink is opened inside the thread that
/// owns it; the open result is reported back so `start` can still fail
/// synchronously.
pub type SinkOpen = Box<dyn FnOnce() -> Result<Box<dyn AudioSink>> + Send>;

/// Owner of the single active production loop
pub struct PlaybackEngine {
    handle: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        Self {
            handle: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a production loop is currently running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start the production loop.
    ///
    /// No-op if a loop is already running. The volume is fixed for the
    /// lifetime of this run; changing it is a stop-then-start hot-swap at the
    /// session level.
    ///
    /// # Errors
    /// `Error::AudioDevice` if sink acquisition fails; the engine stays in
    /// the not-running state and no thread is left behind.
    pub fn start(
        &mut self,
        mut source: Box<dyn BufferSource>,
        volume: f32,
        open_sink: SinkOpen,
    ) -> Result<()> {
        if self.is_running() {
            debug!("production loop already running, start ignored");
            return Ok(());
        }
        // Reap a previously finished thread before replacing the handle
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        let volume = volume.clamp(0.0, 1.0);
        let stop_flag = Arc::new(AtomicBool::new(false));
        self.stop_flag = Arc::clone(&stop_flag);

        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let handle = thread::Builder::new()
            .name("noise-playback".to_string())
            .spawn(move || {
                let mut sink = match open_sink() {
                    Ok(sink) => {
                        let _ = ready_tx.send(Ok(()));
                        sink
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let buffer_len = sink.preferred_buffer_len();
                debug!(buffer_len, volume, "production loop started");

                while !stop_flag.load(Ordering::SeqCst) {
                    let mut buffer = source.produce(buffer_len);
                    apply_volume(&mut buffer, volume);
                    if let Err(e) = sink.write(&buffer) {
                        warn!("sink write failed, stopping loop: {}", e);
                        break;
                    }
                }

                sink.stop();
                debug!("production loop exited");
            })
            .map_err(|e| Error::Playback(format!("failed to spawn playback thread: {}", e)))?;

        self.handle = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                Err(e)
            }
            Err(_) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                Err(Error::AudioDevice(
                    "playback thread exited before opening the audio device".to_string(),
                ))
            }
        }
    }

    /// Signal the loop to exit and wait for it, bounded.
    ///
    /// The flag is observed at the top of each iteration, so the loop exits
    /// within one buffer-write latency. Safe to call when not running.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + STOP_JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                // Still inside a long sink write; it exits on its own once the
                // flag is observed, so detach rather than stall the caller.
                warn!(
                    "playback thread did not exit within {:?}, detaching",
                    STOP_JOIN_TIMEOUT
                );
            }
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Scale every sample, rounding and clamping to the int16 range
fn apply_volume(buffer: &mut [i16], volume: f32) {
    for sample in buffer.iter_mut() {
        let scaled = (*sample as f32 * volume).round();
        *sample = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}
