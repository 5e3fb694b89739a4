use serde::Serialize;

use crate::track::{Track, TrackId};

/// Coarse playback status derived from [`PlaybackState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackStatus {
    /// No track has been loaded yet
    Idle,
    /// A start attempt is in flight and playback has not been confirmed
    Loading,
    Playing,
    Paused,
    /// The current track ran to completion
    Ended,
}

/// Published playback state of a controller.
///
/// `position` and `duration` are in seconds and only meaningful relative to
/// `current_track`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub position: f64,
    pub duration: f64,
    pub ended: bool,
    pub loading: bool,
}

impl PlaybackState {
    pub fn status(&self) -> PlaybackStatus {
        if self.current_track.is_none() {
            PlaybackStatus::Idle
        } else if self.ended {
            PlaybackStatus::Ended
        } else if self.is_playing {
            PlaybackStatus::Playing
        } else if self.loading {
            PlaybackStatus::Loading
        } else {
            PlaybackStatus::Paused
        }
    }

    /// Id of the loaded track, if any
    pub fn current_id(&self) -> Option<&TrackId> {
        self.current_track.as_ref().map(|track| &track.id)
    }

    /// Whether `id` is the loaded track and it is currently playing.
    ///
    /// Per-episode buttons use this to choose between "Play" and "Pause".
    pub fn is_track_playing(&self, id: &TrackId) -> bool {
        self.is_playing && self.current_id() == Some(id)
    }

    /// The player bar is shown while a track is loaded and has not ended
    pub fn bar_visible(&self) -> bool {
        self.current_track.is_some() && !self.ended
    }

    /// Position and duration in whole seconds, e.g. `"42 / 1800s"`
    pub fn progress_label(&self) -> String {
        format!(
            "{} / {}s",
            whole_seconds(self.position),
            whole_seconds(self.duration)
        )
    }
}

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    }
}
