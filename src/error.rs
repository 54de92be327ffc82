use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(digest::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(digest::config),
        help("SMTP credentials can come from ~/.netrc (machine <SMTP_HOST>) or SMTP_USER/SMTP_PASSWORD")
    )]
    Config(String),

    #[error("Calendar error: {0}")]
    #[diagnostic(code(digest::calendar))]
    Calendar(String),

    #[error("Template error: {0}")]
    #[diagnostic(code(digest::template))]
    Template(String),

    #[error("Mail error: {0}")]
    #[diagnostic(code(digest::mail))]
    Mail(String),

    #[error(transparent)]
    #[diagnostic(code(digest::io))]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    #[diagnostic(code(digest::other))]
    Other(String),
}

impl From<lettre::address::AddressError> for Error {
    fn from(err: lettre::address::AddressError) -> Self {
        Error::Mail(format!("Invalid email address: {}", err))
    }
}

impl From<lettre::error::Error> for Error {
    fn from(err: lettre::error::Error) -> Self {
        Error::Mail(format!("Failed to build message: {}", err))
    }
}

/// Type alias for Result with our Error type
pub type DigestResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Invalid value for environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create calendar errors
pub fn calendar_error(message: &str) -> Error {
    Error::Calendar(message.to_string())
}

/// Helper to create template errors
pub fn template_error(message: &str) -> Error {
    Error::Template(message.to_string())
}

/// Helper to create mail errors
pub fn mail_error(message: &str) -> Error {
    Error::Mail(message.to_string())
}
