pub mod client;
pub mod extract;
pub mod resolve;

pub use client::{FetchError, TwitterClient};
pub use extract::{extract, MalformedReference, TweetReference};
pub use resolve::{resolve, Expanded, Resolution, ResolvedMedia};

/// Content type of the only video rendition chat clients can play inline.
pub const MP4_CONTENT_TYPE: &str = "video/mp4";

/// Tweet as returned by the lookup endpoint, reduced to what we render.
#[derive(Debug, Clone, PartialEq)]
pub struct TweetRecord {
    /// Tweet text. May contain t.co links.
    pub text: String,
    pub author: String,
    pub sensitive: bool,
    /// Attachments in tweet order. May be empty. `None` when the response
    /// carried no `extended_entities.media` at all.
    pub media: Option<Vec<MediaEntity>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEntity {
    /// A photo URL. JPEG, PNG, etc.
    Photo(String),
    Video(Vec<VideoVariant>),
    /// Animated GIF, which twitter serves as a silent mp4 loop.
    Gif(Vec<VideoVariant>),
}

/// One encoded rendition of a video or gif.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoVariant {
    pub content_type: String,
    pub bitrate: Option<u64>,
    pub url: String,
}
