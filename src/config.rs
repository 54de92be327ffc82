use crate::error::{config_error, env_error, DigestResult};
use crate::utils::netrc::Netrc;
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default SMTP host, also used to look up .netrc credentials
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
/// Default SMTP submission port (STARTTLS)
pub const DEFAULT_SMTP_PORT: u16 = 587;
/// Default timezone for event display
pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";
/// Default lookahead window in days
pub const DEFAULT_DAYS_AHEAD: u32 = 14;
/// Upper bound for the lookahead window, about ten years
pub const MAX_DAYS_AHEAD: u32 = 3650;
/// Default template name (file stem under the templates directory)
pub const DEFAULT_TEMPLATE: &str = "design_classique";
/// Default email subject
pub const DEFAULT_SUBJECT: &str = "Prochains événements";
/// Default sender display name
pub const DEFAULT_FROM_NAME: &str = "Agenda de l'association";

/// How the SMTP session is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (usually port 587)
    StartTls,
    /// TLS from the first byte (usually port 465)
    Tls,
}

/// Where the SMTP credentials were found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Netrc,
    Environment,
}

/// SMTP login
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
    pub source: CredentialSource,
}

impl fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// SMTP server settings
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    /// None only in dry-run mode, where nothing is sent
    pub credentials: Option<SmtpCredentials>,
}

/// Main configuration structure for one digest run
#[derive(Debug, Clone)]
pub struct Config {
    /// Public Google Calendar ID
    pub calendar_id: Option<String>,
    /// Explicit ICS feed URL, takes precedence over the calendar ID
    pub calendar_url: Option<String>,
    /// Timezone used to display and filter events
    pub timezone: Tz,
    /// Lookahead window in days
    pub days_ahead: u32,
    /// Template name, without the .html extension
    pub template_name: String,
    /// Directory holding the HTML templates
    pub templates_dir: PathBuf,
    pub email_subject: String,
    pub from_name: String,
    /// Sender address; defaults to the SMTP username
    pub from_address: Option<String>,
    pub smtp: SmtpSettings,
    /// Recipients, in the order given
    pub to_addresses: Vec<String>,
    /// Send a digest even when no event falls in the window
    pub send_if_empty: bool,
    /// Render and print the email instead of sending it
    pub dry_run: bool,
    /// Only verify the SMTP login, then exit
    pub smtp_check_only: bool,
}

impl Config {
    /// Load configuration from the process environment and the user's .netrc
    pub fn load() -> DigestResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let netrc = Netrc::load_default();
        Self::from_lookup(|key| env::var(key).ok(), netrc.as_ref())
    }

    /// Build and validate a configuration from a variable lookup.
    ///
    /// Every check happens here, so an invalid configuration is rejected
    /// before any network access.
    pub fn from_lookup<F>(lookup: F, netrc: Option<&Netrc>) -> DigestResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Treat empty values the same as unset ones
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut missing = Vec::new();

        let calendar_id = var("CALENDAR_ID");
        let calendar_url = var("CALENDAR_URL");
        if calendar_id.is_none() && calendar_url.is_none() {
            missing.push("CALENDAR_ID");
        }

        let timezone_str = var("TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = Tz::from_str(&timezone_str)
            .map_err(|_| config_error(&format!("Unknown timezone: {}", timezone_str)))?;

        let days_ahead = parse_or(var("DAYS_AHEAD"), "DAYS_AHEAD", DEFAULT_DAYS_AHEAD)?;
        if days_ahead > MAX_DAYS_AHEAD {
            return Err(config_error(&format!(
                "DAYS_AHEAD must be at most {} (got {})",
                MAX_DAYS_AHEAD, days_ahead
            )));
        }
        let dry_run = parse_flag(var("DRY_RUN"), "DRY_RUN", false)?;
        let send_if_empty = parse_flag(var("SEND_IF_EMPTY"), "SEND_IF_EMPTY", false)?;
        let smtp_check_only = parse_flag(var("SMTP_CHECK_ONLY"), "SMTP_CHECK_ONLY", false)?;

        let host = var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        let port = parse_or(var("SMTP_PORT"), "SMTP_PORT", DEFAULT_SMTP_PORT)?;
        // Only "true" selects STARTTLS; any other value means implicit TLS
        let security = match var("SMTP_USE_TLS") {
            Some(v) if !v.eq_ignore_ascii_case("true") => SmtpSecurity::Tls,
            _ => SmtpSecurity::StartTls,
        };

        // .netrc first, then environment variables
        let credentials = match netrc.and_then(|n| n.credentials_for(&host)) {
            Some((login, password)) => Some(SmtpCredentials {
                username: login.to_string(),
                password: password.to_string(),
                source: CredentialSource::Netrc,
            }),
            None => match (var("SMTP_USER"), var("SMTP_PASSWORD")) {
                (Some(username), Some(password)) => Some(SmtpCredentials {
                    username,
                    password,
                    source: CredentialSource::Environment,
                }),
                (username, password) => {
                    if !dry_run {
                        if username.is_none() {
                            missing.push("SMTP_USER");
                        }
                        if password.is_none() {
                            missing.push("SMTP_PASSWORD");
                        }
                    }
                    None
                }
            },
        };

        let to_addresses = parse_recipients(var("TO_ADDRESSES").as_deref().unwrap_or(""));
        if to_addresses.is_empty() && !dry_run && !smtp_check_only {
            missing.push("TO_ADDRESSES");
        }

        if !missing.is_empty() {
            return Err(config_error(&format!(
                "Incomplete configuration, missing: {}",
                missing.join(", ")
            )));
        }

        for address in &to_addresses {
            address
                .parse::<lettre::Address>()
                .map_err(|e| config_error(&format!("Invalid recipient '{}': {}", address, e)))?;
        }

        let from_address = var("FROM_ADDRESS");
        if let Some(address) = &from_address {
            address
                .parse::<lettre::Address>()
                .map_err(|e| config_error(&format!("Invalid FROM_ADDRESS '{}': {}", address, e)))?;
        }

        Ok(Config {
            calendar_id,
            calendar_url,
            timezone,
            days_ahead,
            template_name: var("EMAIL_TEMPLATE").unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            templates_dir: var("TEMPLATES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("templates")),
            email_subject: var("EMAIL_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            from_name: var("FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
            from_address,
            smtp: SmtpSettings {
                host,
                port,
                security,
                credentials,
            },
            to_addresses,
            send_if_empty,
            dry_run,
            smtp_check_only,
        })
    }

    /// Sender address: FROM_ADDRESS, else the SMTP username
    pub fn sender_address(&self) -> Option<&str> {
        self.from_address.as_deref().or_else(|| {
            self.smtp
                .credentials
                .as_ref()
                .map(|c| c.username.as_str())
        })
    }

    /// Human-readable description of the credential source, for logs
    pub fn credential_source(&self) -> String {
        match self.smtp.credentials.as_ref().map(|c| c.source) {
            Some(CredentialSource::Netrc) => format!(".netrc ({})", self.smtp.host),
            Some(CredentialSource::Environment) => "environment variables".to_string(),
            None => "none".to_string(),
        }
    }
}

/// Split a comma-separated recipient list, dropping blanks
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> DigestResult<T> {
    match value {
        Some(v) => v.parse::<T>().map_err(|_| env_error(key)),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>, key: &str, default: bool) -> DigestResult<bool> {
    match value.map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(env_error(key)),
        },
    }
}
