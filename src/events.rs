//! Event system
//!
//! State transitions are broadcast as `PlayerEvent`s over a tokio broadcast
//! channel; SSE clients subscribe through `EventBus::subscribe_stream`.

use crate::audio::generator::NoiseKind;
use axum::response::sse::Event;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

/// Events emitted by the playback session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Playback started or stopped
    StateChanged { playing: bool },
    /// Noise kind selected
    NoiseChanged { kind: NoiseKind },
    /// Volume changed (0.0-1.0)
    VolumeChanged { volume: f32 },
    /// Timer configured or cleared
    TimerSet { minutes: Option<u32> },
    /// One second of countdown elapsed
    TimerTick { remaining_seconds: u32 },
    /// Countdown reached zero; timer consumed, playback stopped
    TimerExpired,
}

impl PlayerEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::StateChanged { .. } => "state_changed",
            PlayerEvent::NoiseChanged { .. } => "noise_changed",
            PlayerEvent::VolumeChanged { .. } => "volume_changed",
            PlayerEvent::TimerSet { .. } => "timer_set",
            PlayerEvent::TimerTick { .. } => "timer_tick",
            PlayerEvent::TimerExpired => "timer_expired",
        }
    }
}

/// Broadcast fan-out for player events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast an event; no receivers is not an error
    pub fn broadcast(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Number of connected subscribers
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// SSE stream for a new client connection
    pub fn subscribe_stream(&self) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
        let stream = BroadcastStream::new(self.tx.subscribe());

        stream.filter_map(|result| async move {
            match result {
                Ok(player_event) => {
                    let event = Event::default()
                        .event(player_event.name())
                        .json_data(&player_event)
                        .ok();
                    event.map(Ok)
                }
                Err(e) => {
                    // Lagged receiver; skip and keep the connection alive
                    warn!("SSE client error: {:?}", e);
                    None
                }
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.broadcast(PlayerEvent::StateChanged { playing: true });

        match rx.recv().await.unwrap() {
            PlayerEvent::StateChanged { playing } => assert!(playing),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_broadcast_without_subscribers_is_ok() {
        let bus = EventBus::default();
        bus.broadcast(PlayerEvent::TimerExpired);
        assert_eq!(bus.client_count(), 0);
    }

    #[test]
    fn test_event_serialization_shape() {
        let json = serde_json::to_value(PlayerEvent::TimerTick {
            remaining_seconds: 599,
        })
        .unwrap();
        assert_eq!(json["type"], "timer_tick");
        assert_eq!(json["remaining_seconds"], 599);

        let json = serde_json::to_value(PlayerEvent::NoiseChanged {
            kind: NoiseKind::Violet,
        })
        .unwrap();
        assert_eq!(json["kind"], "violet");
    }
}
