//! Test doubles shared across integration tests

use chromatone::audio::sink::AudioSink;
use chromatone::error::{Error, Result};
use chromatone::playback::session::SinkFactory;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Shared counters observing the sinks a session opens
#[derive(Clone, Default)]
pub struct SinkProbe {
    /// Total write calls across all sinks
    pub writes: Arc<AtomicUsize>,
    /// Total sinks opened
    pub opens: Arc<AtomicUsize>,
    /// Gauge of sinks currently open (hot-swap must keep this at one)
    pub open_sinks: Arc<AtomicUsize>,
    /// Most recent buffer handed to a sink
    pub last_buffer: Arc<Mutex<Vec<i16>>>,
}

impl SinkProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink factory producing counting sinks wired to this probe
    pub fn factory(&self) -> SinkFactory {
        let probe = self.clone();
        Arc::new(move || {
            probe.opens.fetch_add(1, Ordering::SeqCst);
            probe.open_sinks.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingSink {
                probe: probe.clone(),
            }) as Box<dyn AudioSink>)
        })
    }

    /// Block until at least `at_least` writes have landed (real time)
    pub fn wait_for_writes(&self, at_least: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.writes.load(Ordering::SeqCst) < at_least && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(
            self.writes.load(Ordering::SeqCst) >= at_least,
            "expected at least {} sink writes",
            at_least
        );
    }
}

/// Sink double that counts writes and simulates device pacing
pub struct CountingSink {
    probe: SinkProbe,
}

impl AudioSink for CountingSink {
    fn preferred_buffer_len(&self) -> usize {
        64
    }

    fn write(&mut self, samples: &[i16]) -> Result<()> {
        self.probe.writes.fetch_add(1, Ordering::SeqCst);
        *self.probe.last_buffer.lock().unwrap() = samples.to_vec();
        std::thread::sleep(Duration::from_millis(1));
        Ok(())
    }

    fn stop(&mut self) {}
}

impl Drop for CountingSink {
    fn drop(&mut self) {
        self.probe.open_sinks.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Factory whose sinks always fail to open
pub fn unavailable_factory() -> SinkFactory {
    Arc::new(|| Err(Error::AudioDevice("device busy".to_string())))
}
