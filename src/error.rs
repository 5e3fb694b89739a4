use std::path::PathBuf;
use thiserror::Error;

use crate::track::TrackId;

/// Errors raised while validating a track descriptor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    #[error("Track '{id}' has no audio source")]
    MissingAudio { id: TrackId },
}

/// Errors reported by an audio resource when a start attempt fails
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("No source loaded")]
    NoSource,

    #[error("Unsupported audio source {source_url}: {reason}")]
    UnsupportedSource { source_url: String, reason: String },

    #[error("Playback was blocked by the host: {0}")]
    Blocked(String),

    #[error("Failed to start playback of {source_url}: {reason}")]
    StartFailed { source_url: String, reason: String },
}

/// Errors that can occur when loading a catalogue of tracks
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to fetch catalogue from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to read catalogue file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    FeedParseFailed(#[from] rss::Error),

    #[error("Failed to parse show document: {0}")]
    ShowParseFailed(#[from] serde_json::Error),

    #[error("Invalid catalogue URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("A show id is required")]
    EmptyShowId,
}

/// Errors surfaced to holders of a player handle
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerError {
    #[error("The playback controller is not running")]
    NotRunning,
}
