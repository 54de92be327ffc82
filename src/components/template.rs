//! HTML email templates.
//!
//! A template is a complete HTML document containing `{name}` placeholders
//! and one or more event blocks delimited by [`EVENT_LOOP_START`] and
//! [`EVENT_LOOP_END`]. Each block is repeated once per event; placeholders
//! outside the blocks receive per-email values.

use super::calendar::FormattedEvent;
use crate::error::{template_error, DigestResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Marker opening the repeated event block
pub const EVENT_LOOP_START: &str = "<!-- EVENT_LOOP_START -->";
/// Marker closing the repeated event block
pub const EVENT_LOOP_END: &str = "<!-- EVENT_LOOP_END -->";

const TEMPLATE_EXTENSION: &str = "html";

/// A loaded email template
#[derive(Debug, Clone)]
pub struct EmailTemplate {
    name: String,
    html: String,
}

/// One piece of a template: literal HTML or an event block
#[derive(Debug)]
enum Segment<'a> {
    Html(&'a str),
    EventBlock(&'a str),
}

impl EmailTemplate {
    /// Load `<dir>/<name>.html`
    pub fn load(dir: &Path, name: &str) -> DigestResult<Self> {
        let path = template_path(dir, name);
        if !path.is_file() {
            let available = Self::available(dir);
            let hint = if available.is_empty() {
                format!("no templates found in {}", dir.display())
            } else {
                format!("available: {}", available.join(", "))
            };
            return Err(template_error(&format!(
                "Template not found: {} ({})",
                path.display(),
                hint
            )));
        }

        let html = fs::read_to_string(&path).map_err(|e| {
            template_error(&format!("Failed to read template {}: {}", path.display(), e))
        })?;
        Self::from_html(name, html)
    }

    /// Build a template from HTML text, checking its event markers
    pub fn from_html(name: &str, html: impl Into<String>) -> DigestResult<Self> {
        let template = Self {
            name: name.to_string(),
            html: html.into(),
        };
        template.segments()?;
        Ok(template)
    }

    /// Names of the templates in a directory, sorted
    pub fn available(dir: &Path) -> Vec<String> {
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        names
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the email.
    ///
    /// Every event block is replaced by one filled copy per event, joined by
    /// newlines; with no events the blocks disappear. `globals` fill the
    /// placeholders outside the blocks.
    pub fn render(
        &self,
        events: &[FormattedEvent],
        globals: &[(&str, String)],
    ) -> DigestResult<String> {
        let mut output = String::with_capacity(self.html.len());

        for segment in self.segments()? {
            match segment {
                Segment::Html(html) => output.push_str(&substitute(html, globals)),
                Segment::EventBlock(block) => {
                    let block = block.trim();
                    let rendered: Vec<String> = events
                        .iter()
                        .map(|event| substitute(block, event.placeholders()))
                        .collect();
                    output.push_str(&rendered.join("\n"));
                }
            }
        }

        Ok(output)
    }

    /// Split the template into literal HTML and event blocks
    fn segments(&self) -> DigestResult<Vec<Segment<'_>>> {
        let mut segments = Vec::new();
        let mut rest = self.html.as_str();

        while let Some(start) = rest.find(EVENT_LOOP_START) {
            let after_start = &rest[start + EVENT_LOOP_START.len()..];
            let end = after_start.find(EVENT_LOOP_END).ok_or_else(|| {
                template_error(&format!(
                    "Template {} has {} without a matching {}",
                    self.name, EVENT_LOOP_START, EVENT_LOOP_END
                ))
            })?;

            segments.push(Segment::Html(&rest[..start]));
            segments.push(Segment::EventBlock(&after_start[..end]));
            rest = &after_start[end + EVENT_LOOP_END.len()..];
        }

        if rest.contains(EVENT_LOOP_END) {
            return Err(template_error(&format!(
                "Template {} has {} without a matching {}",
                self.name, EVENT_LOOP_END, EVENT_LOOP_START
            )));
        }
        if segments.is_empty() {
            return Err(template_error(&format!(
                "Template {} has no event block ({} ... {})",
                self.name, EVENT_LOOP_START, EVENT_LOOP_END
            )));
        }

        segments.push(Segment::Html(rest));
        Ok(segments)
    }
}

fn template_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, TEMPLATE_EXTENSION))
}

/// Replace known `{key}` placeholders in a single pass.
///
/// Substituted values are not scanned again and unknown braces (CSS rules,
/// stray text) are copied unchanged.
pub fn substitute<K: AsRef<str>>(text: &str, values: &[(K, String)]) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let candidate = &rest[open + 1..];

        let replacement = candidate.find('}').and_then(|close| {
            let key = &candidate[..close];
            values
                .iter()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, value)| (value, close))
        });

        match replacement {
            Some((value, close)) => {
                output.push_str(value);
                rest = &candidate[close + 1..];
            }
            None => {
                output.push('{');
                rest = candidate;
            }
        }
    }

    output.push_str(rest);
    output
}
