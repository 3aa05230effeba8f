use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(u16),
}

/// Minimal GET-only client. Everything the bot downloads goes through here.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetches `url` and returns the raw body. Non-2xx responses are errors.
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Bytes, HttpError>;
}

pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Every request gives up after `timeout`, so a stalled server surfaces as
    /// an error instead of holding the message forever.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Bytes, HttpError> {
        let res = headers
            .iter()
            .fold(self.client.get(url), |req, (k, v)| req.header(*k, *v))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(HttpError::Status(status.as_u16()));
        }

        Ok(res.bytes().await?)
    }
}


#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn stalled_server_times_out() {
        // accepts connections but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/slow", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((sock, _)) = listener.accept().await {
                held.push(sock);
            }
        });

        let client = ReqwestClient::new(Duration::from_millis(200)).unwrap();
        match client.get(&url, &[]).await {
            Err(HttpError::Request(e)) => assert!(e.is_timeout(), "{e}"),
            other => panic!("expected timeout, got {other:?}"),
        }

        server.abort();
    }
}
