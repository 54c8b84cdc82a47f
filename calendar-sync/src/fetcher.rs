//! Feed retrieval.
//!
//! One GET per feed with a hard time budget and no retries; the next
//! scheduled run is the retry.

use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;

use crate::config::SyncConfig;
use crate::error::FetchError;

const ACCEPT_CALENDAR: &str = "text/calendar, text/plain;q=0.9, */*;q=0.1";

/// Source of raw calendar text for a feed URL
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches feeds over HTTP(S) with reqwest
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &SyncConfig) -> anyhow::Result<Self> {
        Self::new(config.fetch_timeout(), &config.user_agent)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let url = normalize_feed_url(url);
        tracing::debug!("Fetching calendar feed {}", url);

        let response = self
            .client
            .get(url.as_ref())
            .header(header::ACCEPT, ACCEPT_CALENDAR)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(classify)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

/// `webcal://` is a registration convention for HTTPS feeds.
fn normalize_feed_url(url: &str) -> std::borrow::Cow<'_, str> {
    let trimmed = url.trim();
    match trimmed.get(..9) {
        Some(scheme) if scheme.eq_ignore_ascii_case("webcal://") => {
            format!("https://{}", &trimmed[9..]).into()
        }
        _ => trimmed.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webcal_is_fetched_over_https() {
        assert_eq!(
            normalize_feed_url("webcal://calendar.example.com/feed.ics"),
            "https://calendar.example.com/feed.ics"
        );
        assert_eq!(
            normalize_feed_url("WEBCAL://calendar.example.com/feed.ics"),
            "https://calendar.example.com/feed.ics"
        );
    }

    #[test]
    fn test_http_urls_pass_through() {
        assert_eq!(
            normalize_feed_url(" https://www.airbnb.com/calendar/ical/42.ics "),
            "https://www.airbnb.com/calendar/ical/42.ics"
        );
        assert_eq!(normalize_feed_url("http://x"), "http://x");
    }
}
