//! The fetch → render → send sequence of one run.

use crate::components::calendar::format::escape_html;
use crate::components::calendar::{format_event, plain_text_summary, CalendarEvent, FormattedEvent};
use crate::components::{DigestSender, EmailTemplate, EventSource, EventWindow};
use crate::config::Config;
use crate::error::{mail_error, DigestResult};
use crate::utils::time::format_short_date;
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, info};

/// The two bodies of the email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDigest {
    pub html: String,
    pub text: String,
}

/// What a run ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The digest was sent with this many events
    Sent { events: usize },
    /// No events in the window and empty digests are not sent
    NothingToSend,
    /// Dry run: the digest was rendered but not sent
    DryRun { digest: RenderedDigest },
}

/// Render the HTML and plain-text bodies for a list of events
pub fn render_digest(
    template: &EmailTemplate,
    config: &Config,
    window: &EventWindow,
    events: &[CalendarEvent],
) -> DigestResult<RenderedDigest> {
    let formatted: Vec<FormattedEvent> = events.iter().map(format_event).collect();
    let globals = email_placeholders(config, window, events.len());

    let html = template.render(&formatted, &globals)?;
    let text = if events.is_empty() {
        "Aucun événement prévu pour la période.\n".to_string()
    } else {
        plain_text_summary(events)
    };

    Ok(RenderedDigest { html, text })
}

/// Placeholders available outside the event block
pub fn email_placeholders(
    config: &Config,
    window: &EventWindow,
    event_count: usize,
) -> Vec<(&'static str, String)> {
    vec![
        ("email_subject", escape_html(&config.email_subject)),
        ("from_name", escape_html(&config.from_name)),
        ("event_count", event_count.to_string()),
        ("period_start", format_short_date(window.start.date_naive())),
        ("period_end", format_short_date(window.end.date_naive())),
    ]
}

/// Run one digest: fetch, render, then send unless there is nothing to send
/// or this is a dry run
pub async fn run<S, M>(
    config: &Config,
    template: &EmailTemplate,
    source: &S,
    sender: Option<&M>,
    now: DateTime<Tz>,
) -> DigestResult<RunOutcome>
where
    S: EventSource + ?Sized,
    M: DigestSender + ?Sized,
{
    let window = EventWindow::starting_at(now, config.days_ahead);
    info!(
        "Fetching events from {} to {}",
        window.start.format("%d/%m/%Y %H:%M"),
        window.end.format("%d/%m/%Y %H:%M")
    );

    let events = source.upcoming_events(&window).await?;
    if events.is_empty() {
        info!("No events found for the period");
        if !config.send_if_empty {
            info!("Nothing to send");
            return Ok(RunOutcome::NothingToSend);
        }
    } else {
        info!("{} event(s) found", events.len());
        for event in &events {
            debug!("  - {} ({})", event.title, event.start.format("%d/%m/%Y"));
        }
    }

    let digest = render_digest(template, config, &window, &events)?;
    info!(
        "Email rendered with template {} ({} characters)",
        template.name(),
        digest.html.chars().count()
    );

    if config.dry_run {
        info!("Dry run, email not sent");
        return Ok(RunOutcome::DryRun { digest });
    }

    let sender = sender.ok_or_else(|| mail_error("No mail sender configured"))?;
    sender
        .send_digest(&config.to_addresses, &config.email_subject, &digest)
        .await?;

    Ok(RunOutcome::Sent {
        events: events.len(),
    })
}
