//! Playback session state machine
//!
//! Owns the current noise kind, volume, timer configuration and the
//! `PlaybackEngine`, and drives the once-per-second countdown tick. All
//! session state lives in a single mutex-guarded struct so every timeline
//! (command callers, the production loop, the tick task) observes consistent
//! snapshots. Stale ticks are fenced by a generation counter captured at
//! schedule time and re-checked before each tick's effects are applied.

use crate::audio::generator::{NoiseGenerator, NoiseKind};
use crate::audio::sink::{AudioSink, CpalSink};
use crate::error::Result;
use crate::events::{EventBus, PlayerEvent};
use crate::playback::engine::{PlaybackEngine, SinkOpen};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{debug, info};

/// Longest accepted timer, in whole minutes
pub const MAX_TIMER_MINUTES: u32 = 480;

/// Startup volume when none is configured
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Sink constructor used for each engine start; swappable for tests
pub type SinkFactory = Arc<dyn Fn() -> Result<Box<dyn AudioSink>> + Send + Sync>;

/// Read-only snapshot of the session for display
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub kind: NoiseKind,
    pub volume: f32,
    pub timer_minutes: Option<u32>,
    pub remaining_seconds: Option<u32>,
    pub playing: bool,
}

struct SessionInner {
    kind: NoiseKind,
    volume: f32,
    timer_minutes: Option<u32>,
    remaining_seconds: Option<u32>,
    playing: bool,
    engine: PlaybackEngine,
    /// Bumped whenever a running countdown must die; ticks carry the value
    /// captured at schedule time and bail on mismatch.
    timer_generation: u64,
}

/// The playback session state machine.
///
/// Constructed behind an `Arc`; the countdown task holds a weak handle so a
/// dropped session never keeps ticking.
pub struct PlaybackSession {
    inner: Mutex<SessionInner>,
    events: EventBus,
    sink_factory: SinkFactory,
    me: Weak<PlaybackSession>,
}

impl PlaybackSession {
    /// Create a session backed by the system audio device
    pub fn new(events: EventBus, device: Option<String>) -> Arc<Self> {
        let factory: SinkFactory = Arc::new(move || {
            CpalSink::open(device.as_deref()).map(|sink| Box::new(sink) as Box<dyn AudioSink>)
        });
        Self::with_sink_factory(events, factory)
    }

    /// Create a session with a custom sink factory (test doubles)
    pub fn with_sink_factory(events: EventBus, sink_factory: SinkFactory) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            inner: Mutex::new(SessionInner {
                kind: NoiseKind::White,
                volume: DEFAULT_VOLUME,
                timer_minutes: None,
                remaining_seconds: None,
                playing: false,
                engine: PlaybackEngine::new(),
                timer_generation: 0,
            }),
            events,
            sink_factory,
            me: me.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap()
    }

    /// Current session snapshot
    pub fn status(&self) -> SessionStatus {
        let inner = self.lock();
        SessionStatus {
            kind: inner.kind,
            volume: inner.volume,
            timer_minutes: inner.timer_minutes,
            remaining_seconds: inner.remaining_seconds,
            playing: inner.playing,
        }
    }

    /// Select the noise kind; hot-swaps the engine when playing
    pub fn select_noise(&self, kind: NoiseKind) -> Result<()> {
        let mut inner = self.lock();
        let changed = inner.kind != kind;
        inner.kind = kind;
        if inner.playing {
            self.hot_swap(&mut inner)?;
        }
        drop(inner);

        if changed {
            info!("noise kind set to {}", kind);
            self.events.broadcast(PlayerEvent::NoiseChanged { kind });
        }
        Ok(())
    }

    /// Advance to the next kind in carousel order
    pub fn next_noise(&self) -> Result<()> {
        let kind = self.lock().kind.next();
        self.select_noise(kind)
    }

    /// Step back to the previous kind in carousel order
    pub fn prev_noise(&self) -> Result<()> {
        let kind = self.lock().kind.prev();
        self.select_noise(kind)
    }

    /// Set the volume, clamped to [0.0, 1.0]; hot-swaps when playing
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        let volume = volume.clamp(0.0, 1.0);
        let mut inner = self.lock();
        let changed = inner.volume != volume;
        inner.volume = volume;
        if inner.playing {
            self.hot_swap(&mut inner)?;
        }
        drop(inner);

        if changed {
            debug!("volume set to {:.2}", volume);
            self.events.broadcast(PlayerEvent::VolumeChanged { volume });
        }
        Ok(())
    }

    /// Configure or clear the auto-stop timer.
    ///
    /// Minutes are clamped to 0..=480. `None` cancels a running countdown
    /// immediately. Playback itself is untouched, but a new timer set while
    /// playing starts counting right away.
    pub fn set_timer(&self, minutes: Option<u32>) {
        let minutes = minutes.map(|m| m.min(MAX_TIMER_MINUTES));

        let mut inner = self.lock();
        // Fences out any countdown scheduled before this call
        inner.timer_generation += 1;
        inner.timer_minutes = minutes;
        inner.remaining_seconds = minutes.map(|m| m * 60);
        let arm = inner.playing && minutes.is_some();
        let generation = inner.timer_generation;
        drop(inner);

        info!(?minutes, "timer configured");
        self.events.broadcast(PlayerEvent::TimerSet { minutes });
        if arm {
            self.spawn_tick(generation);
        }
    }

    /// Start playback with the current kind and volume.
    ///
    /// No-op when already playing. On sink failure the session stays
    /// `Stopped` and the error is surfaced; `play` may simply be retried.
    pub fn play(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.playing {
            debug!("already playing, play ignored");
            return Ok(());
        }

        self.start_engine(&mut inner)?;
        inner.playing = true;
        inner.timer_generation += 1;
        let generation = inner.timer_generation;
        let arm = inner.remaining_seconds.is_some();
        let kind = inner.kind;
        drop(inner);

        info!("playback started ({})", kind);
        self.events
            .broadcast(PlayerEvent::StateChanged { playing: true });
        if arm {
            self.spawn_tick(generation);
        }
        Ok(())
    }

    /// Stop playback, preserving any configured timer for a later resume
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.timer_generation += 1;
        if !inner.playing {
            debug!("not playing, stop ignored");
            return;
        }
        inner.engine.stop();
        inner.playing = false;
        drop(inner);

        info!("playback stopped");
        self.events
            .broadcast(PlayerEvent::StateChanged { playing: false });
    }

    /// Stop when playing, otherwise play
    pub fn toggle(&self) -> Result<()> {
        let playing = self.lock().playing;
        if playing {
            self.stop();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Tear the session down: stop the engine and fence out any countdown
    pub fn shutdown(&self) {
        self.stop();
    }

    /// Start a fresh engine run for the current kind/volume
    fn start_engine(&self, inner: &mut SessionInner) -> Result<()> {
        let source = Box::new(NoiseGenerator::new(inner.kind));
        let factory = Arc::clone(&self.sink_factory);
        let open: SinkOpen = Box::new(move || factory());
        inner.engine.start(source, inner.volume, open)
    }

    /// Stop-then-start under the lock so no second loop can appear.
    ///
    /// On restart failure the session drops to Stopped so a later `play`
    /// can retry from a clean state.
    fn hot_swap(&self, inner: &mut SessionInner) -> Result<()> {
        inner.engine.stop();
        match self.start_engine(inner) {
            Ok(()) => Ok(()),
            Err(e) => {
                inner.playing = false;
                inner.timer_generation += 1;
                self.events
                    .broadcast(PlayerEvent::StateChanged { playing: false });
                Err(e)
            }
        }
    }

    /// Spawn the once-per-second countdown task for one timer generation
    fn spawn_tick(&self, generation: u64) {
        let Some(session) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if !session.apply_tick(generation) {
                    break;
                }
            }
        });
    }

    /// Apply one countdown tick; returns false when the task must stop.
    ///
    /// Effects apply only while the captured generation still matches and the
    /// session is playing, so a tick scheduled for an old run can never stop
    /// a since-restarted session.
    fn apply_tick(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.timer_generation != generation || !inner.playing {
            return false;
        }
        let Some(remaining) = inner.remaining_seconds else {
            return false;
        };

        let remaining = remaining.saturating_sub(1);
        inner.remaining_seconds = Some(remaining);

        if remaining == 0 {
            // Timer consumed on expiry
            inner.engine.stop();
            inner.playing = false;
            inner.timer_minutes = None;
            inner.remaining_seconds = None;
            inner.timer_generation += 1;
            drop(inner);

            info!("timer expired, playback stopped");
            self.events.broadcast(PlayerEvent::TimerExpired);
            self.events
                .broadcast(PlayerEvent::StateChanged { playing: false });
            false
        } else {
            drop(inner);
            self.events.broadcast(PlayerEvent::TimerTick {
                remaining_seconds: remaining,
            });
            true
        }
    }
}
