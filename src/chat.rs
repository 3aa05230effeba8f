use std::io::{self, Write};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::telegram::TelegramError;

/// A single piece of outgoing chat content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedItem {
    Text(String),
    /// Raw image bytes.
    Image(Bytes),
    /// Video URL, the chat fetches it on its own.
    Video(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Telegram(#[from] TelegramError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Append-only outgoing side of one conversation.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn enqueue(&self, item: RenderedItem) -> Result<(), TransportError>;
}

/// Prints items to stdout instead of sending them anywhere.
pub struct ConsoleChat;

#[async_trait]
impl ChatSink for ConsoleChat {
    async fn enqueue(&self, item: RenderedItem) -> Result<(), TransportError> {
        let mut out = io::stdout().lock();
        match item {
            RenderedItem::Text(text) => writeln!(out, "{text}")?,
            RenderedItem::Image(bytes) => writeln!(out, "[image: {} bytes]", bytes.len())?,
            RenderedItem::Video(url) => writeln!(out, "[video: {url}]")?,
        }

        Ok(())
    }
}
