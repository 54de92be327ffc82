pub mod format;
pub mod models;
pub mod parse;
mod time;

pub use format::{format_event, plain_text_summary, FormattedEvent};
pub use models::{CalendarEvent, EventWindow};
pub use parse::parse_calendar;

use super::EventSource;
use crate::error::{calendar_error, DigestResult};
use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use std::time::Duration;
use tracing::info;
use url::Url;

/// HTTP timeout for the feed download
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Public iCal feed URL of a Google calendar
pub fn google_feed_url(calendar_id: &str) -> DigestResult<Url> {
    let mut url = Url::parse("https://calendar.google.com/calendar/ical/")
        .map_err(|e| calendar_error(&format!("Failed to parse URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| calendar_error("Feed URL cannot have path segments"))?
        .pop_if_empty()
        .extend([calendar_id, "public", "basic.ics"]);
    Ok(url)
}

/// Read-only client for a public calendar feed
#[derive(Debug, Clone)]
pub struct CalendarFetcher {
    feed_url: Url,
    timezone: Tz,
    client: Client,
}

impl CalendarFetcher {
    /// Create a fetcher for an arbitrary ICS feed
    pub fn new(feed_url: &str, timezone: Tz) -> DigestResult<Self> {
        let feed_url = Url::parse(feed_url)
            .map_err(|e| calendar_error(&format!("Invalid feed URL '{}': {}", feed_url, e)))?;
        Self::with_url(feed_url, timezone)
    }

    /// Create a fetcher for a public Google calendar
    pub fn for_calendar_id(calendar_id: &str, timezone: Tz) -> DigestResult<Self> {
        Self::with_url(google_feed_url(calendar_id)?, timezone)
    }

    fn with_url(feed_url: Url, timezone: Tz) -> DigestResult<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| calendar_error(&format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            feed_url,
            timezone,
            client,
        })
    }

    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    /// Download the feed and return the events inside the window, sorted by start
    pub async fn fetch_events(&self, window: &EventWindow) -> DigestResult<Vec<CalendarEvent>> {
        info!("Fetching calendar feed from {}", self.feed_url);

        let response = self
            .client
            .get(self.feed_url.clone())
            .send()
            .await
            .map_err(|e| calendar_error(&format!("Failed to fetch calendar: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(calendar_error(&format!(
                "Failed to fetch calendar: HTTP {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| calendar_error(&format!("Failed to read calendar feed: {}", e)))?;

        parse_calendar(&body, &self.timezone, window)
    }
}

#[async_trait]
impl EventSource for CalendarFetcher {
    async fn upcoming_events(&self, window: &EventWindow) -> DigestResult<Vec<CalendarEvent>> {
        self.fetch_events(window).await
    }
}
