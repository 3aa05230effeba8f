use once_cell::sync::Lazy;
use regex::Regex;

use super::{FetchError, MediaEntity, TweetRecord, VideoVariant, MP4_CONTENT_TYPE};

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:https?|ftp)://\S+").expect("valid regex"));

/// What to do with a fetched tweet.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Sensitive tweet while nudity is not allowed. Nothing gets expanded.
    Rejected,
    Expanded(Expanded),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expanded {
    /// Tweet text with links stripped. May be empty
    pub text: String,
    pub author: String,
    pub media: Vec<ResolvedMedia>,
    /// Whether the tweet had any attachments, even ones we could not play.
    pub had_media: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedMedia {
    /// Photo URL, bytes are downloaded when rendering.
    Photo(String),
    /// Playable mp4 URL, handed to the chat as is.
    Video(String),
}

/// Decides how a tweet gets shown. Pure, so the same record always resolves
/// the same way.
///
/// The sensitivity policy is applied first: a rejected tweet never needs its
/// media, so a response without `extended_entities.media` only counts as
/// malformed when the tweet is actually expanded.
pub fn resolve(record: &TweetRecord, allow_nudity: bool) -> Result<Resolution, FetchError> {
    if record.sensitive && !allow_nudity {
        return Ok(Resolution::Rejected);
    }

    let media = record
        .media
        .as_deref()
        .ok_or(FetchError::Missing("extended_entities.media"))?;

    Ok(Resolution::Expanded(Expanded {
        text: strip_links(&record.text),
        author: record.author.clone(),
        media: media.iter().filter_map(resolve_entity).collect(),
        had_media: !media.is_empty(),
    }))
}

fn resolve_entity(entity: &MediaEntity) -> Option<ResolvedMedia> {
    match entity {
        MediaEntity::Photo(url) => Some(ResolvedMedia::Photo(url.clone())),
        MediaEntity::Video(variants) => {
            best_mp4(variants).map(|v| ResolvedMedia::Video(v.url.clone()))
        }
        // gifs come with a single meaningful rendition
        MediaEntity::Gif(variants) => variants
            .first()
            .map(|v| ResolvedMedia::Video(v.url.clone())),
    }
}

/// Highest bitrate mp4. On a tie the earlier variant wins.
fn best_mp4(variants: &[VideoVariant]) -> Option<&VideoVariant> {
    variants
        .iter()
        .filter(|v| v.content_type == MP4_CONTENT_TYPE)
        .reduce(|best, v| if v.bitrate > best.bitrate { v } else { best })
}

fn strip_links(text: &str) -> String {
    URL.replace_all(text, "").into_owned()
}
