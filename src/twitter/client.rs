use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::http::{HttpClient, HttpError};

use super::{MediaEntity, TweetRecord, TweetReference, VideoVariant};

pub struct TwitterClient {
    token: String,
    endpoint: String,
    http: Arc<dyn HttpClient>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Scheme(#[from] serde_json::Error),
    #[error("API response has no `{0}`")]
    Missing(&'static str),
}

#[derive(Deserialize)]
struct RawTweet {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    possibly_sensitive: bool,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    extended_entities: Option<RawEntities>,
}
#[derive(Deserialize)]
struct RawUser {
    screen_name: String,
}
#[derive(Deserialize)]
struct RawEntities {
    #[serde(default)]
    media: Option<Vec<RawMedia>>,
}
#[derive(Deserialize)]
struct RawMedia {
    r#type: String,
    #[serde(default)]
    media_url_https: Option<String>,
    #[serde(default)]
    video_info: Option<RawVideoInfo>,
}
#[derive(Deserialize)]
struct RawVideoInfo {
    #[serde(default)]
    variants: Vec<RawVariant>,
}
#[derive(Deserialize)]
struct RawVariant {
    content_type: String,
    #[serde(default)]
    bitrate: Option<u64>,
    url: String,
}

impl TwitterClient {
    pub fn new(token: String, endpoint: String, http: Arc<dyn HttpClient>) -> Self {
        Self {
            token,
            endpoint,
            http,
        }
    }

    /// Looks the tweet up. Exactly one request, never retried.
    pub async fn fetch(&self, id: &TweetReference) -> Result<TweetRecord, FetchError> {
        let body = self
            .http
            .get(
                &format!("{}?id={id}", self.endpoint),
                &[("Authorization", self.token.as_str())],
            )
            .await?;

        let raw: RawTweet = serde_json::from_slice(&body)?;

        raw.try_into()
    }
}

impl TryFrom<RawTweet> for TweetRecord {
    type Error = FetchError;

    fn try_from(raw: RawTweet) -> Result<Self, Self::Error> {
        // checked once the sensitivity policy had its say
        let media = raw.extended_entities.and_then(|e| e.media);

        Ok(TweetRecord {
            text: raw.text.ok_or(FetchError::Missing("text"))?,
            author: raw.user.ok_or(FetchError::Missing("user"))?.screen_name,
            sensitive: raw.possibly_sensitive,
            media: media
                .map(|media| {
                    media
                        .into_iter()
                        .filter_map(|m| m.into_entity().transpose())
                        .collect::<Result<_, _>>()
                })
                .transpose()?,
        })
    }
}

impl RawMedia {
    /// Unknown media types are dropped.
    fn into_entity(self) -> Result<Option<MediaEntity>, FetchError> {
        let variants = || {
            self.video_info
                .map(|v| v.variants)
                .unwrap_or_default()
                .into_iter()
                .map(|v| VideoVariant {
                    content_type: v.content_type,
                    bitrate: v.bitrate,
                    url: v.url,
                })
                .collect()
        };

        let entity = match self.r#type.as_str() {
            "photo" => MediaEntity::Photo(
                self.media_url_https
                    .ok_or(FetchError::Missing("media_url_https"))?,
            ),
            "video" => MediaEntity::Video(variants()),
            "animated_gif" => MediaEntity::Gif(variants()),
            _ => return Ok(None),
        };

        Ok(Some(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeHttp;

    const ENDPOINT: &str = "https://api.example/show.json";

    fn client_with(http: FakeHttp) -> (TwitterClient, Arc<FakeHttp>) {
        let http = Arc::new(http);
        let client = TwitterClient::new("Bearer t0ken".into(), ENDPOINT.into(), http.clone());
        (client, http)
    }

    fn id() -> TweetReference {
        crate::twitter::extract("twitter.com/a/status/123456789012345")
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn fetches_and_maps_media() {
        let body = r#"{
            "text": "look https://t.co/abc",
            "possibly_sensitive": true,
            "user": { "screen_name": "bob" },
            "extended_entities": { "media": [
                { "type": "photo", "media_url_https": "https://pbs/1.jpg" },
                { "type": "video", "video_info": { "variants": [
                    { "content_type": "application/x-mpegURL", "url": "https://v/pl.m3u8" },
                    { "content_type": "video/mp4", "bitrate": 832000, "url": "https://v/1.mp4" }
                ] } },
                { "type": "animated_gif", "video_info": { "variants": [
                    { "content_type": "video/mp4", "bitrate": 0, "url": "https://v/g.mp4" }
                ] } },
                { "type": "hologram" }
            ] }
        }"#;
        let (client, http) = client_with(FakeHttp::new().with(&format!("{ENDPOINT}?id=123456789012345"), body));

        let record = client.fetch(&id()).await.unwrap();

        assert_eq!(record.text, "look https://t.co/abc");
        assert_eq!(record.author, "bob");
        assert!(record.sensitive);
        let media = record.media.unwrap();
        assert_eq!(media.len(), 3);
        assert_eq!(media[0], MediaEntity::Photo("https://pbs/1.jpg".into()));
        match &media[1] {
            MediaEntity::Video(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[0].bitrate, None);
                assert_eq!(v[1].bitrate, Some(832000));
            }
            other => panic!("expected video, got {other:?}"),
        }
        assert!(matches!(media[2], MediaEntity::Gif(_)));

        let calls = http.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].1,
            vec![("Authorization".to_string(), "Bearer t0ken".to_string())]
        );
    }

    #[tokio::test]
    async fn missing_fields_are_errors() {
        let cases = [
            (r#"{"user":{"screen_name":"b"},"extended_entities":{"media":[]}}"#, "text"),
            (r#"{"text":"a","extended_entities":{"media":[]}}"#, "user"),
        ];

        for (body, field) in cases {
            let (client, _) = client_with(FakeHttp::new().with(&format!("{ENDPOINT}?id=123456789012345"), body));
            match client.fetch(&id()).await {
                Err(FetchError::Missing(f)) => assert_eq!(f, field),
                other => panic!("expected missing {field}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn http_and_json_failures() {
        let url = format!("{ENDPOINT}?id=123456789012345");

        let (client, _) = client_with(FakeHttp::new().failing(&url, 401));
        assert!(matches!(
            client.fetch(&id()).await,
            Err(FetchError::Http(HttpError::Status(401)))
        ));

        let (client, _) = client_with(FakeHttp::new().with(&url, "<html>"));
        assert!(matches!(client.fetch(&id()).await, Err(FetchError::Scheme(_))));
    }

    #[tokio::test]
    async fn empty_media_list_is_fine() {
        let (client, _) = client_with(FakeHttp::new().with(
            &format!("{ENDPOINT}?id=123456789012345"),
            r#"{"text":"just words","user":{"screen_name":"c"},"extended_entities":{"media":[]}}"#,
        ));

        let record = client.fetch(&id()).await.unwrap();
        assert_eq!(record.media, Some(vec![]));
        assert!(!record.sensitive);
    }

    #[tokio::test]
    async fn absent_media_is_left_for_later() {
        for body in [
            r#"{"text":"a","possibly_sensitive":true,"user":{"screen_name":"b"}}"#,
            r#"{"text":"a","user":{"screen_name":"b"},"extended_entities":{}}"#,
        ] {
            let (client, _) = client_with(FakeHttp::new().with(&format!("{ENDPOINT}?id=123456789012345"), body));

            let record = client.fetch(&id()).await.unwrap();
            assert_eq!(record.media, None);
        }
    }
}
