use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Body, Client, RequestBuilder,
};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tokio::time;

use crate::chat::{ChatSink, RenderedItem, TransportError};

pub const DEFAULT_API: &str = "https://api.telegram.org";

pub struct TelegramClient {
    token: String,
    api: String,
    client: Client,
}

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Scheme(#[from] serde_json::Error),
    #[error("API returned error {error_code}: {description}")]
    Server { error_code: u32, description: String },
    #[error("ratelimited for {} seconds", .timeout.as_secs())]
    RateLimited { timeout: Duration },
}

/// One chat the bot talks to.
pub struct TelegramChat<'a> {
    client: &'a TelegramClient,
    chat_id: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TelegramResponse<T> {
    Ok {
        result: T,
    },
    Err {
        error_code: u32,
        description: String,
        #[serde(default)]
        parameters: Option<TelegramRateLimitError>,
    },
}
#[derive(Deserialize)]
struct TelegramRateLimitError {
    retry_after: u64,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}
#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}
#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize)]
#[non_exhaustive]
struct TelegramMessage {
    #[allow(dead_code)]
    message_id: u64,
}

impl TelegramClient {
    /// `api` is the Bot API server, normally [`DEFAULT_API`].
    pub fn new(token: String, api: String) -> Self {
        Self {
            token,
            api,
            client: Client::new(),
        }
    }

    pub fn chat(&self, chat_id: i64) -> TelegramChat<'_> {
        TelegramChat {
            client: self,
            chat_id,
        }
    }

    fn method(&self, name: &str) -> String {
        format!("{}/bot{}/{name}", self.api, self.token)
    }

    /// Long-polls for new updates starting at `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let req = self
            .client
            .get(self.method("getUpdates"))
            .timeout(timeout + Duration::from_secs(10))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout.as_secs().to_string()),
                ("allowed_updates", r#"["message"]"#.to_owned()),
            ]);

        call(req).await
    }

    pub async fn send(&self, chat_id: i64, item: RenderedItem) -> Result<(), TelegramError> {
        let req = match item {
            RenderedItem::Text(text) => self
                .client
                .post(self.method("sendMessage"))
                .query(&[("chat_id", chat_id.to_string()), ("text", text)]),
            RenderedItem::Image(bytes) => {
                let len = bytes.len() as u64;
                self.client.post(self.method("sendPhoto")).multipart(
                    Form::new().text("chat_id", chat_id.to_string()).part(
                        "photo",
                        Part::stream_with_length(Body::from(bytes), len).file_name("photo.jpg"),
                    ),
                )
            }
            RenderedItem::Video(url) => self
                .client
                .post(self.method("sendVideo"))
                .query(&[("chat_id", chat_id.to_string()), ("video", url)]),
        };

        let _: TelegramMessage = call(req).await?;

        Ok(())
    }
}

async fn call<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, TelegramError> {
    let res = req.send().await?.text().await?;
    let res: TelegramResponse<T> = serde_json::from_str(&res)?;

    match res {
        TelegramResponse::Ok { result } => Ok(result),

        TelegramResponse::Err {
            error_code: 429,
            parameters: Some(TelegramRateLimitError { retry_after }),
            ..
        } => Err(TelegramError::RateLimited {
            timeout: Duration::from_secs(retry_after),
        }),

        TelegramResponse::Err {
            error_code,
            description,
            ..
        } => Err(TelegramError::Server {
            error_code,
            description,
        }),
    }
}

#[async_trait]
impl ChatSink for TelegramChat<'_> {
    async fn enqueue(&self, item: RenderedItem) -> Result<(), TransportError> {
        // cheap, image bytes are shared
        let res = self.client.send(self.chat_id, item.clone()).await;

        // telegram tells us how long to back off, honour it once
        if let Err(TelegramError::RateLimited { timeout }) = res {
            time::sleep(timeout).await;
            self.client.send(self.chat_id, item).await?;
        } else {
            res?;
        }

        Ok(())
    }
}
