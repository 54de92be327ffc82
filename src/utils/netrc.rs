//! Minimal reader for `.netrc` machine-credentials files.
//!
//! Only the parts of the format needed to look up SMTP credentials are
//! supported: `machine`, `default`, `login`, `password`, `account` and
//! `macdef` (whose body is skipped).

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Login and password for one remote host
#[derive(Clone, PartialEq, Eq)]
pub struct NetrcEntry {
    pub login: Option<String>,
    pub password: Option<String>,
    pub account: Option<String>,
}

impl fmt::Debug for NetrcEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetrcEntry")
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("account", &self.account)
            .finish()
    }
}

/// Parsed contents of a `.netrc` file
#[derive(Debug, Clone, Default)]
pub struct Netrc {
    machines: Vec<(String, NetrcEntry)>,
    default: Option<NetrcEntry>,
}

impl Netrc {
    /// Parse netrc text
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut netrc = Netrc::default();
        let mut tokens = Tokenizer::new(content);

        // Target of login/password/account tokens: None until a machine or default is seen
        let mut current: Option<(Option<String>, NetrcEntry)> = None;

        while let Some(token) = tokens.next_token() {
            match token.as_str() {
                "machine" => {
                    netrc.finish_entry(current.take());
                    let host = tokens
                        .next_token()
                        .ok_or_else(|| "missing host name after 'machine'".to_string())?;
                    current = Some((Some(host), NetrcEntry::empty()));
                }
                "default" => {
                    netrc.finish_entry(current.take());
                    current = Some((None, NetrcEntry::empty()));
                }
                "login" | "password" | "account" => {
                    let value = tokens
                        .next_token()
                        .ok_or_else(|| format!("missing value after '{}'", token))?;
                    let (_, entry) = current
                        .as_mut()
                        .ok_or_else(|| format!("'{}' appears before any machine", token))?;
                    match token.as_str() {
                        "login" => entry.login = Some(value),
                        "password" => entry.password = Some(value),
                        _ => entry.account = Some(value),
                    }
                }
                "macdef" => {
                    tokens.next_token();
                    tokens.skip_macro_body();
                }
                other => return Err(format!("unexpected token '{}'", other)),
            }
        }
        netrc.finish_entry(current);

        Ok(netrc)
    }

    /// Load the user's netrc file: `$NETRC` if set, otherwise `~/.netrc`.
    ///
    /// A missing file yields `None`. A file that cannot be read or parsed is
    /// reported and also yields `None`, so credentials fall back to the
    /// environment.
    pub fn load_default() -> Option<Self> {
        let path = default_path()?;
        Self::load(&path)
    }

    /// Load a netrc file from an explicit path
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            debug!("No netrc file at {}", path.display());
            return None;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return None;
            }
        };

        match Self::parse(&content) {
            Ok(netrc) => Some(netrc),
            Err(e) => {
                warn!("Ignoring malformed netrc file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Credentials for a host, falling back to the `default` entry.
    ///
    /// Only returns entries that carry both a login and a password.
    pub fn credentials_for(&self, host: &str) -> Option<(&str, &str)> {
        let entry = self
            .machines
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(host))
            .map(|(_, entry)| entry)
            .or(self.default.as_ref())?;

        match (&entry.login, &entry.password) {
            (Some(login), Some(password)) => Some((login.as_str(), password.as_str())),
            _ => None,
        }
    }

    fn finish_entry(&mut self, entry: Option<(Option<String>, NetrcEntry)>) {
        match entry {
            Some((Some(host), entry)) => {
                // First matching machine wins, like most netrc readers
                if !self.machines.iter().any(|(name, _)| name == &host) {
                    self.machines.push((host, entry));
                }
            }
            Some((None, entry)) => self.default = Some(entry),
            None => {}
        }
    }
}

impl NetrcEntry {
    fn empty() -> Self {
        Self {
            login: None,
            password: None,
            account: None,
        }
    }
}

fn default_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("NETRC") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::home_dir().map(|home| home.join(".netrc"))
}

/// Splits netrc content into whitespace-separated tokens, honouring double quotes
struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    fn new(content: &'a str) -> Self {
        Self { rest: content }
    }

    fn next_token(&mut self) -> Option<String> {
        loop {
            self.rest = self.rest.trim_start();
            // Comments run to the end of the line
            if self.rest.starts_with('#') {
                let rest = self.rest;
                self.rest = rest.find('\n').map_or("", |i| &rest[i..]);
                continue;
            }
            break;
        }

        if self.rest.is_empty() {
            return None;
        }

        if let Some(quoted) = self.rest.strip_prefix('"') {
            let mut token = String::new();
            let mut chars = quoted.char_indices();
            let mut consumed = quoted.len();
            while let Some((i, c)) = chars.next() {
                match c {
                    '"' => {
                        consumed = i + 1;
                        break;
                    }
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            token.push(escaped);
                        }
                    }
                    _ => token.push(c),
                }
            }
            self.rest = &quoted[consumed..];
            return Some(token);
        }

        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let token = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        Some(token)
    }

    /// Skip a macro definition: everything up to the next empty line.
    /// The body starts on the line after `macdef <name>`; CRLF files end it
    /// with a line holding only `\r`.
    fn skip_macro_body(&mut self) {
        let mut rest = match self.rest.split_once('\n') {
            Some((_, body)) => body,
            None => "",
        };
        while let Some((line, next)) = rest.split_once('\n') {
            rest = next;
            if line.trim_end_matches('\r').is_empty() {
                self.rest = rest;
                return;
            }
        }
        self.rest = "";
    }
}
