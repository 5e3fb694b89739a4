use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::TrackError;

/// Stable identity of one playable episode.
///
/// Two descriptors refer to the same track exactly when their ids are equal;
/// the id is never derived from the audio URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Composite id for an episode of a show: `"{podcast}-{season}-{episode}"`.
    ///
    /// Episode numbers restart with every season, so the season is part of
    /// the key.
    pub fn for_episode(podcast_id: &str, season: u32, episode: u32) -> Self {
        Self(format!("{podcast_id}-{season}-{episode}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Descriptor of a playable episode: identity, display metadata and audio URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub podcast_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl Track {
    /// Create a track with an id and audio source and empty metadata
    pub fn new(id: impl Into<TrackId>, audio: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            podcast_title: String::new(),
            image: None,
            audio: Some(audio.into()),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_podcast_title(mut self, podcast_title: impl Into<String>) -> Self {
        self.podcast_title = podcast_title.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// The audio source, or an error when it is missing or blank
    pub fn audio_source(&self) -> Result<&str, TrackError> {
        self.audio
            .as_deref()
            .map(str::trim)
            .filter(|audio| !audio.is_empty())
            .ok_or_else(|| TrackError::MissingAudio {
                id: self.id.clone(),
            })
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn composite_id_includes_season() {
        let id = TrackId::for_episode("10716", 2, 5);
        assert_eq!(id.as_str(), "10716-2-5");
        assert_ne!(
            TrackId::for_episode("10716", 1, 1),
            TrackId::for_episode("10716", 2, 1)
        );
    }

    #[test]
    fn equality_is_defined_by_id() {
        let a = Track::new("p1-1", "https://example.com/a.mp3").with_title("A");
        let b = Track::new("p1-1", "https://example.com/other.mp3").with_title("B");
        let c = Track::new("p1-2", "https://example.com/a.mp3").with_title("A");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Track> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn audio_source_rejects_missing_and_blank() {
        let mut track = Track::new("x", "https://example.com/x.mp3");
        assert_eq!(track.audio_source(), Ok("https://example.com/x.mp3"));

        track.audio = Some("   ".to_string());
        assert_eq!(
            track.audio_source(),
            Err(TrackError::MissingAudio { id: "x".into() })
        );

        track.audio = None;
        assert!(track.audio_source().is_err());
    }

    #[test]
    fn deserializes_front_end_descriptor() {
        let json = r#"{
            "id": "10716-1-3",
            "title": "Episode 3",
            "podcastTitle": "Something Was Wrong",
            "image": "https://example.com/cover.jpg",
            "audio": "https://example.com/ep3.mp3"
        }"#;

        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.id.as_str(), "10716-1-3");
        assert_eq!(track.podcast_title, "Something Was Wrong");
        assert_eq!(track.image.as_deref(), Some("https://example.com/cover.jpg"));
        assert_eq!(track.audio.as_deref(), Some("https://example.com/ep3.mp3"));
    }

    #[test]
    fn deserializes_descriptor_without_audio() {
        let track: Track = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(track.audio.is_none());
        assert!(track.audio_source().is_err());
    }
}
