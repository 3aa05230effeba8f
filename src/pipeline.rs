use std::sync::Arc;

use futures::{pin_mut, StreamExt};
use log::debug;
use thiserror::Error;

use crate::{
    chat::{ChatSink, RenderedItem, TransportError},
    config::Config,
    http::HttpClient,
    render::{render, MediaFetchError},
    twitter::{extract, resolve, FetchError, MalformedReference, Resolution, TwitterClient},
};

pub const SENSITIVE_NOTICE: &str = "Tweet contains sensitive content, not expanded.";
pub const MALFORMED_NOTICE: &str = "Sorry, I could not find a tweet id in that link.";
pub const FAILURE_NOTICE: &str = "Sorry, something went wrong while expanding that tweet.";

/// Where a message currently is on its way through the expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Extracting,
    Fetching,
    Resolving,
    Rendering,
    Done,
    Failed,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Malformed(#[from] MalformedReference),
    #[error("failed to fetch tweet: {0}")]
    Fetch(#[from] FetchError),
    #[error("failed to deliver to chat: {0}")]
    Transport(#[from] TransportError),
}

/// Result of handling one message.
#[derive(Debug)]
pub enum Outcome {
    /// No twitter link, the message belongs to someone else.
    Passed,
    /// Sensitive tweet, only the notice was sent.
    Rejected,
    Expanded {
        sent: usize,
        /// Photos that could not be downloaded. Each got an error line in chat.
        failed_media: Vec<MediaFetchError>,
    },
    Failed {
        stage: Stage,
        error: PipelineError,
        /// Set when the failure notice could not be delivered either.
        notice_error: Option<TransportError>,
    },
}

impl Outcome {
    /// Whether the next handler in the chain should see the message too.
    pub fn falls_through(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

impl PipelineError {
    /// Text shown in chat for this failure.
    pub fn notice(&self) -> String {
        match self {
            Self::Malformed(_) => MALFORMED_NOTICE.to_owned(),
            Self::Fetch(e) => format!("Error! {e}"),
            Self::Transport(_) => FAILURE_NOTICE.to_owned(),
        }
    }
}

/// Expands twitter links in chat messages.
pub struct Expander {
    twitter: TwitterClient,
    http: Arc<dyn HttpClient>,
    allow_nudity: bool,
}

impl Expander {
    pub fn new(config: &Config, http: Arc<dyn HttpClient>) -> Self {
        Self {
            twitter: TwitterClient::new(
                config.auth_token.clone(),
                config.endpoint.clone(),
                http.clone(),
            ),
            http,
            allow_nudity: config.allow_nudity,
        }
    }

    /// Handles one incoming message, sending whatever it expands to into `chat`.
    ///
    /// Failures are reported to the chat and returned in the [`Outcome`]; they
    /// never stop the message from falling through.
    pub async fn handle(&self, text: &str, chat: &dyn ChatSink) -> Outcome {
        let mut stage = Stage::Idle;

        match self.run(text, chat, &mut stage).await {
            Ok(outcome) => outcome,
            Err(error) => {
                let failed_at = stage;
                advance(&mut stage, Stage::Failed);
                let notice_error = chat
                    .enqueue(RenderedItem::Text(error.notice()))
                    .await
                    .err();

                Outcome::Failed {
                    stage: failed_at,
                    error,
                    notice_error,
                }
            }
        }
    }

    async fn run(
        &self,
        text: &str,
        chat: &dyn ChatSink,
        stage: &mut Stage,
    ) -> Result<Outcome, PipelineError> {
        advance(stage, Stage::Extracting);
        let Some(id) = extract(text)? else {
            return Ok(Outcome::Passed);
        };

        advance(stage, Stage::Fetching);
        let record = self.twitter.fetch(&id).await?;

        advance(stage, Stage::Resolving);
        let tweet = match resolve(&record, self.allow_nudity)? {
            Resolution::Rejected => {
                chat.enqueue(RenderedItem::Text(SENSITIVE_NOTICE.to_owned()))
                    .await?;
                advance(stage, Stage::Done);
                return Ok(Outcome::Rejected);
            }
            Resolution::Expanded(tweet) => tweet,
        };

        advance(stage, Stage::Rendering);
        let items = render(tweet, self.http.as_ref());
        pin_mut!(items);

        let mut sent = 0;
        let mut failed_media = Vec::new();
        while let Some(item) = items.next().await {
            match item {
                Ok(item) => chat.enqueue(item).await?,
                Err(e) => {
                    chat.enqueue(RenderedItem::Text(format!("Error! {e}"))).await?;
                    failed_media.push(e);
                }
            }
            sent += 1;
        }

        advance(stage, Stage::Done);
        Ok(Outcome::Expanded { sent, failed_media })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("pipeline: {stage:?} -> {next:?}");
    *stage = next;
}
