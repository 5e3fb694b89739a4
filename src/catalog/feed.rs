// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset};

use crate::error::CatalogError;
use crate::track::{Track, TrackId};

use super::{Catalog, CatalogEntry};

/// Parse RSS feed XML bytes into a catalogue
///
/// Items without an enclosure are skipped. `origin` is the feed URL or path
/// and seeds track ids for items that carry no guid.
pub fn parse_feed(xml_bytes: &[u8], origin: &str) -> Result<Catalog, CatalogError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let podcast_title = channel.title().to_string();
    let image = channel
        .image()
        .map(|img| img.url().to_string())
        .or_else(|| {
            channel
                .itunes_ext()
                .and_then(|ext| ext.image())
                .map(String::from)
        });

    let entries = channel
        .items()
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            parse_item(item, index, origin, &podcast_title, image.as_deref())
        })
        .collect();

    Ok(Catalog {
        title: podcast_title,
        entries,
    })
}

fn parse_item(
    item: &rss::Item,
    index: usize,
    origin: &str,
    podcast_title: &str,
    channel_image: Option<&str>,
) -> Option<CatalogEntry> {
    let enclosure = item.enclosure()?;
    let itunes = item.itunes_ext();

    let episode = itunes
        .and_then(|ext| ext.episode())
        .and_then(|e| e.trim().parse().ok());
    let season = itunes
        .and_then(|ext| ext.season())
        .and_then(|s| s.trim().parse().ok());

    let id = item
        .guid()
        .map(|g| g.value().trim())
        .filter(|guid| !guid.is_empty())
        .map(TrackId::new)
        .unwrap_or_else(|| match episode {
            Some(episode) => TrackId::for_episode(origin, season.unwrap_or(1), episode),
            None => TrackId::new(format!("{origin}#{index}")),
        });

    let image = itunes
        .and_then(|ext| ext.image())
        .or(channel_image)
        .map(String::from);

    let track = Track {
        id,
        title: item
            .title()
            .map(String::from)
            .unwrap_or_else(|| "Untitled Episode".to_string()),
        podcast_title: podcast_title.to_string(),
        image,
        audio: Some(enclosure.url().to_string()).filter(|url| !url.trim().is_empty()),
    };

    Some(CatalogEntry {
        track,
        season,
        episode,
        duration: itunes
            .and_then(|ext| ext.duration())
            .and_then(parse_itunes_duration),
        published: item.pub_date().and_then(parse_pub_date),
    })
}

/// Parse an `itunes:duration` value (`SS`, `MM:SS` or `HH:MM:SS`) into seconds
pub fn parse_itunes_duration(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let mut seconds = 0.0;
    for part in parts {
        let part: f64 = part.trim().parse().ok()?;
        if !part.is_finite() || part < 0.0 {
            return None;
        }
        seconds = seconds * 60.0 + part;
    }

    Some(seconds).filter(|s| *s > 0.0)
}

/// Parse RFC 2822 dates, tolerating a few common deviations
fn parse_pub_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    const RELAXED_FORMATS: [&str; 3] = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    DateTime::parse_from_rfc2822(date_str.trim()).ok().or_else(|| {
        RELAXED_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(date_str.trim(), format).ok())
    })
}
