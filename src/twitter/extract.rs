use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const TWITTER_DOMAIN: &str = "twitter.com";

static TWEET_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{15,}").expect("valid regex"));

/// Numeric tweet id found in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetReference(String);

/// The message mentions twitter.com but carries no status id.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("message links to twitter.com but contains no tweet id")]
pub struct MalformedReference;

impl Display for TweetReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Finds the tweet a message points to.
///
/// `Ok(None)` means the message is not about twitter at all and should be left
/// to whoever handles it next.
pub fn extract(text: &str) -> Result<Option<TweetReference>, MalformedReference> {
    if !text.contains(TWITTER_DOMAIN) {
        return Ok(None);
    }

    TWEET_ID
        .find(text)
        .map(|m| Some(TweetReference(m.as_str().to_owned())))
        .ok_or(MalformedReference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_messages_without_twitter_domain() {
        assert_eq!(extract("hello there"), Ok(None));
        // an id alone is not enough
        assert_eq!(extract("see 123456789012345678"), Ok(None));
    }

    #[test]
    fn extracts_status_id() {
        let id = extract("check this https://twitter.com/x/status/123456789012345")
            .unwrap()
            .unwrap();
        assert_eq!(id.to_string(), "123456789012345");
    }

    #[test]
    fn takes_first_long_digit_run() {
        let id = extract("twitter.com/u1234/status/1111111111111111111?s=20&t=2222222222222222")
            .unwrap()
            .unwrap();
        assert_eq!(id.to_string(), "1111111111111111111");
    }

    #[test]
    fn short_digit_runs_are_malformed() {
        assert_eq!(
            extract("https://twitter.com/someone/status/12345678901234"),
            Err(MalformedReference)
        );
        assert_eq!(extract("twitter.com"), Err(MalformedReference));
    }
}
