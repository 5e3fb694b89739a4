use std::sync::Arc;

use crate::track::TrackId;

/// Events emitted by the playback controller for user-facing reporting
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A new track was published and its source handed to the resource
    TrackLoading { track_id: TrackId, title: String },

    /// A start attempt resolved successfully
    PlaybackStarted { track_id: TrackId },

    /// Playback was paused on request
    PlaybackPaused { track_id: Option<TrackId> },

    /// A start attempt failed; the track stays loaded but not playing
    PlaybackFailed { track_id: TrackId, error: String },

    /// A play request was rejected before touching the resource
    TrackRejected { reason: String },

    /// The current track played to completion
    PlaybackEnded { track_id: Option<TrackId> },

    /// The playback cursor was moved
    Seeked { position: f64 },
}

/// Trait for reporting controller events.
///
/// Implementations can use this to print status lines, drive notifications
/// or collect statistics.
pub trait PlayerReporter: Send + Sync {
    /// Report an event
    fn report(&self, event: PlayerEvent);
}

/// A shared reference to a reporter
pub type SharedPlayerReporter = Arc<dyn PlayerReporter>;

/// A reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl PlayerReporter for NoopReporter {
    fn report(&self, _event: PlayerEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedPlayerReporter {
        Arc::new(Self)
    }
}
