use futures::{stream, Stream, StreamExt};
use thiserror::Error;

use crate::{
    chat::RenderedItem,
    http::{HttpClient, HttpError},
    twitter::{Expanded, ResolvedMedia},
};

/// Downloading one photo failed. Only that photo is lost.
#[derive(Debug, Error)]
#[error("failed to fetch {url}: {source}")]
pub struct MediaFetchError {
    pub url: String,
    #[source]
    pub source: HttpError,
}

impl Expanded {
    /// `@author: text ` line that goes in front of the media.
    pub fn attribution(&self) -> String {
        format!("@{}: {} ", self.author, self.text)
    }
}

/// Turns a resolved tweet into chat items: the attribution line first, then
/// one item per media in tweet order. Photos are downloaded lazily, one at a
/// time, as the stream is polled.
///
/// A tweet with neither text nor attachments yields nothing.
pub fn render(
    tweet: Expanded,
    http: &dyn HttpClient,
) -> impl Stream<Item = Result<RenderedItem, MediaFetchError>> + Send + '_ {
    let attribution = (tweet.had_media || !tweet.text.is_empty())
        .then(|| Ok(RenderedItem::Text(tweet.attribution())));

    stream::iter(attribution).chain(
        stream::iter(tweet.media).then(move |media| render_media(http, media)),
    )
}

async fn render_media(
    http: &dyn HttpClient,
    media: ResolvedMedia,
) -> Result<RenderedItem, MediaFetchError> {
    match media {
        ResolvedMedia::Photo(url) => match http.get(&url, &[]).await {
            Ok(bytes) => Ok(RenderedItem::Image(bytes)),
            Err(source) => Err(MediaFetchError { url, source }),
        },
        ResolvedMedia::Video(url) => Ok(RenderedItem::Video(url)),
    }
}
