use agenda_mailer::components::{CalendarFetcher, EmailTemplate, SmtpMailer};
use agenda_mailer::config::Config;
use agenda_mailer::digest::{self, RunOutcome};
use agenda_mailer::error::{config_error, Error};
use chrono::Utc;
use std::io::Write;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,lettre=warn")),
        )
        // stdout is reserved for the rendered email in dry-run mode
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and validate the configuration
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Fetch, render and send one digest
pub async fn run(config: Config) -> miette::Result<()> {
    info!(
        "Calendar: {}",
        config
            .calendar_url
            .as_deref()
            .or(config.calendar_id.as_deref())
            .unwrap_or("-")
    );
    info!("Template: {}", config.template_name);
    info!("Period: {} day(s)", config.days_ahead);
    info!("Recipients: {} address(es)", config.to_addresses.len());
    info!("Authentication: {}", config.credential_source());

    // Everything that can fail locally is checked before the network is used
    let mailer = if config.dry_run {
        None
    } else {
        let from_address = config
            .sender_address()
            .ok_or_else(|| config_error("No sender address (FROM_ADDRESS or SMTP_USER)"))?;
        Some(SmtpMailer::new(&config.smtp, &config.from_name, from_address)?)
    };

    if config.smtp_check_only {
        let mailer = mailer
            .ok_or_else(|| config_error("SMTP_CHECK_ONLY cannot be combined with DRY_RUN"))?;
        mailer.test_connection().await?;
        return Ok(());
    }

    let template = EmailTemplate::load(&config.templates_dir, &config.template_name)?;

    let fetcher = match &config.calendar_url {
        Some(url) => CalendarFetcher::new(url, config.timezone)?,
        None => {
            let calendar_id = config
                .calendar_id
                .as_deref()
                .ok_or_else(|| config_error("CALENDAR_ID or CALENDAR_URL is required"))?;
            CalendarFetcher::for_calendar_id(calendar_id, config.timezone)?
        }
    };

    let now = Utc::now().with_timezone(&config.timezone);
    let outcome = digest::run(&config, &template, &fetcher, mailer.as_ref(), now).await?;

    match outcome {
        RunOutcome::Sent { events } => {
            info!("Email sent successfully with {} event(s)", events);
        }
        RunOutcome::NothingToSend => {
            info!("No email sent");
        }
        RunOutcome::DryRun { digest } => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(digest.html.as_bytes()).map_err(Error::from)?;
            stdout.flush().map_err(Error::from)?;
        }
    }

    Ok(())
}
