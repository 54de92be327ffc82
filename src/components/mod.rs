use crate::digest::RenderedDigest;
use crate::error::DigestResult;
use async_trait::async_trait;

// Export components
pub mod calendar;
pub mod mailer;
pub mod template;

pub use calendar::{CalendarEvent, CalendarFetcher, EventWindow};
pub use mailer::SmtpMailer;
pub use template::EmailTemplate;

/// Source of calendar events for a digest run
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events inside the window, sorted by start time
    async fn upcoming_events(&self, window: &EventWindow) -> DigestResult<Vec<CalendarEvent>>;
}

/// Delivery of a rendered digest
#[async_trait]
pub trait DigestSender: Send + Sync {
    /// Send one message to all recipients
    async fn send_digest(
        &self,
        recipients: &[String],
        subject: &str,
        digest: &RenderedDigest,
    ) -> DigestResult<()>;
}
