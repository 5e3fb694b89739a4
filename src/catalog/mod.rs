//! Track source provider: turns podcast shows and RSS feeds into track
//! descriptors the controller can play.

mod feed;
mod fetch;
mod show;

use chrono::{DateTime, FixedOffset};

use crate::error::CatalogError;
use crate::track::{Track, TrackId};

pub use feed::{parse_feed, parse_itunes_duration};
pub use fetch::{DEFAULT_SHOW_API, is_url, load_catalog, show_url};
pub use show::{Season, Show, ShowEpisode, parse_show};

/// An ordered list of playable episodes from one show or feed
#[derive(Debug, Clone)]
pub struct Catalog {
    pub title: String,
    pub entries: Vec<CatalogEntry>,
}

/// One episode of a catalogue
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub track: Track,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Length in seconds, when the source advertises it
    pub duration: Option<f64>,
    pub published: Option<DateTime<FixedOffset>>,
}

impl Catalog {
    /// Entry by 1-based position, as shown in listings
    pub fn get(&self, number: usize) -> Option<&CatalogEntry> {
        number
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
    }

    pub fn find(&self, id: &TrackId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| &entry.track.id == id)
    }

    /// Advertised durations keyed by audio source
    pub fn durations(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().filter_map(|entry| {
            let audio = entry.track.audio.as_deref()?;
            Some((audio, entry.duration?))
        })
    }
}

/// Parse a catalogue document, choosing the format from its first byte.
///
/// JSON show documents start with `{`; anything else is treated as RSS.
/// `origin` is the URL or path the bytes came from.
pub fn parse_catalog(bytes: &[u8], origin: &str) -> Result<Catalog, CatalogError> {
    let first = bytes.iter().copied().find(|b| !b.is_ascii_whitespace());

    if first == Some(b'{') {
        parse_show(bytes)
    } else {
        parse_feed(bytes, origin)
    }
}
