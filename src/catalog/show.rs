use serde::{Deserialize, Deserializer};

use crate::error::CatalogError;
use crate::track::{Track, TrackId};

use super::{Catalog, CatalogEntry};

/// A show document as served by the podcast API
#[derive(Debug, Clone, Deserialize)]
pub struct Show {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Season {
    pub season: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub episodes: Vec<ShowEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowEpisode {
    pub episode: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Audio URL; some episodes are published without one
    #[serde(default)]
    pub file: Option<String>,
}

impl Show {
    /// Flatten seasons into catalogue entries, season by season
    pub fn into_catalog(self) -> Catalog {
        let mut entries = Vec::new();

        for season in &self.seasons {
            let image = season.image.clone().or_else(|| self.image.clone());

            for episode in &season.episodes {
                let track = Track {
                    id: TrackId::for_episode(&self.id, season.season, episode.episode),
                    title: episode.title.clone(),
                    podcast_title: self.title.clone(),
                    image: image.clone(),
                    audio: episode.file.clone(),
                };

                entries.push(CatalogEntry {
                    track,
                    season: Some(season.season),
                    episode: Some(episode.episode),
                    duration: None,
                    published: None,
                });
            }
        }

        Catalog {
            title: self.title,
            entries,
        }
    }
}

/// Parse a show JSON document into a catalogue
pub fn parse_show(bytes: &[u8]) -> Result<Catalog, CatalogError> {
    let show: Show = serde_json::from_slice(bytes)?;
    Ok(show.into_catalog())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
