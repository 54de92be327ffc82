use super::models::CalendarEvent;
use crate::utils::time::{french_month, french_month_short, french_weekday};
use chrono::{Datelike, Utc};
use url::form_urlencoded;

/// Time text shown for all-day events
pub const ALL_DAY_LABEL: &str = "Toute la journée";
/// Location shown when the event has none
pub const UNKNOWN_LOCATION: &str = "Lieu à confirmer";

const EVENT_COLORS: [&str; 5] = ["#ff6b6b", "#feca57", "#48dbfb", "#ff9ff3", "#54a0ff"];
const DEFAULT_ICON: &str = "🎉";

/// Title keywords and the icon they select, first match wins
const ICON_KEYWORDS: [(&[&str], &str); 5] = [
    (&["repas", "déjeuner", "dîner"], "🍽️"),
    (&["randonn", "marche", "balade"], "🥾"),
    (&["jardin", "potager"], "🌱"),
    (&["sortie", "visite"], "🚌"),
    (&["réunion", "assemblée"], "📋"),
];

/// Placeholder values for one event, in a fixed order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedEvent {
    values: Vec<(&'static str, String)>,
}

impl FormattedEvent {
    /// Value of a placeholder
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All placeholder names and values
    pub fn placeholders(&self) -> &[(&'static str, String)] {
        &self.values
    }
}

/// Turn an event into the placeholder values used by the templates
pub fn format_event(event: &CalendarEvent) -> FormattedEvent {
    let start = event.start;
    let links = CalendarLinks::for_event(event);

    let description = match event.description.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!(
            "<p style=\"color: #777; font-size: 14px; margin: 8px 0 0 0; line-height: 1.5;\">{}</p>",
            escape_html(text).replace('\n', "<br>")
        ),
        _ => String::new(),
    };

    let location = event
        .location
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

    FormattedEvent {
        values: vec![
            ("day", start.format("%d").to_string()),
            ("weekday", french_weekday(start.weekday()).to_string()),
            ("month", french_month(start.month()).to_string()),
            ("month_short", french_month_short(start.month()).to_string()),
            ("year", start.format("%Y").to_string()),
            ("time", time_label(event)),
            ("title", escape_html(&event.title)),
            ("location", location),
            ("description", description),
            ("event_color", event_color(&event.title).to_string()),
            ("icon", event_icon(&event.title).to_string()),
            ("add_to_google", escape_html(&links.google)),
            ("add_to_outlook", escape_html(&links.outlook)),
            ("add_to_yahoo", escape_html(&links.yahoo)),
            // No universal ICS link for a single event; the Google link imports everywhere
            ("add_to_ical", escape_html(&links.google)),
        ],
    }
}

/// Time text for an event
pub fn time_label(event: &CalendarEvent) -> String {
    if event.is_all_day {
        return ALL_DAY_LABEL.to_string();
    }

    let start = event.start.format("%H:%M");
    match event.end {
        Some(end) if end.date_naive() == event.start.date_naive() => {
            format!("{} - {}", start, end.format("%H:%M"))
        }
        Some(end) => format!("{} - {}", start, end.format("%d/%m %H:%M")),
        None => start.to_string(),
    }
}

/// Colour picked from a stable hash of the title
pub fn event_color(title: &str) -> &'static str {
    // FNV-1a, stable across runs and platforms
    let hash = title.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    EVENT_COLORS[(hash % EVENT_COLORS.len() as u64) as usize]
}

/// Icon picked from keywords in the title
pub fn event_icon(title: &str) -> &'static str {
    let title = title.to_lowercase();
    ICON_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| title.contains(k)))
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

/// Text/plain alternative body, one line per event
pub fn plain_text_summary(events: &[CalendarEvent]) -> String {
    let mut text = String::new();
    for event in events {
        let start = event.start;
        text.push_str(&format!(
            "{} {} {} - {} - {}",
            french_weekday(start.weekday()),
            start.format("%d"),
            french_month(start.month()),
            time_label(event),
            event.title
        ));
        text.push_str(&format!(
            " ({})\n",
            event.location.as_deref().unwrap_or(UNKNOWN_LOCATION)
        ));
    }
    text
}

/// Escape text for inclusion in HTML content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// "Add to calendar" links for the common web calendars
#[derive(Debug, Clone)]
pub struct CalendarLinks {
    pub google: String,
    pub outlook: String,
    pub yahoo: String,
}

impl CalendarLinks {
    pub fn for_event(event: &CalendarEvent) -> Self {
        let end = event.effective_end();

        // All-day events use bare dates, timed events UTC timestamps
        let (start_str, end_str) = if event.is_all_day {
            (
                event.start.format("%Y%m%d").to_string(),
                end.format("%Y%m%d").to_string(),
            )
        } else {
            (
                event.start.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string(),
                end.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string(),
            )
        };

        let title = event.title.as_str();
        let details = event.description.as_deref().unwrap_or("");
        let location = event.location.as_deref().unwrap_or("");
        let dates = format!("{}/{}", start_str, end_str);

        Self {
            google: link(
                "https://calendar.google.com/calendar/render",
                &[
                    ("action", "TEMPLATE"),
                    ("text", title),
                    ("dates", dates.as_str()),
                    ("details", details),
                    ("location", location),
                ],
            ),
            outlook: link(
                "https://outlook.live.com/calendar/0/deeplink/compose",
                &[
                    ("subject", title),
                    ("startdt", start_str.as_str()),
                    ("enddt", end_str.as_str()),
                    ("body", details),
                    ("location", location),
                    ("path", "/calendar/action/compose"),
                    ("rru", "addevent"),
                ],
            ),
            yahoo: link(
                "https://calendar.yahoo.com/",
                &[
                    ("v", "60"),
                    ("title", title),
                    ("st", start_str.as_str()),
                    ("et", end_str.as_str()),
                    ("desc", details),
                    ("in_loc", location),
                ],
            ),
        }
    }
}

fn link(base: &str, params: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish();
    format!("{}?{}", base, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Europe::Paris;
    use url::Url;

    fn query(link: &str) -> Vec<(String, String)> {
        Url::parse(link).unwrap().query_pairs().into_owned().collect()
    }

    fn sample_event() -> CalendarEvent {
        let start = Paris.with_ymd_and_hms(2024, 6, 12, 18, 0, 0).unwrap();
        CalendarEvent {
            id: "walk@example.com".to_string(),
            title: "Randonnée au col".to_string(),
            location: Some("Parking <mairie>".to_string()),
            description: Some("Prévoir de l'eau\nEt un chapeau".to_string()),
            start,
            end: Some(start + Duration::hours(2)),
            is_all_day: false,
        }
    }

    #[test]
    fn test_format_timed_event() {
        let formatted = format_event(&sample_event());

        assert_eq!(formatted.get("day"), Some("12"));
        assert_eq!(formatted.get("weekday"), Some("Mercredi"));
        assert_eq!(formatted.get("month"), Some("Juin"));
        assert_eq!(formatted.get("month_short"), Some("Juin"));
        assert_eq!(formatted.get("year"), Some("2024"));
        assert_eq!(formatted.get("time"), Some("18:00 - 20:00"));
        assert_eq!(formatted.get("title"), Some("Randonnée au col"));
        assert_eq!(formatted.get("location"), Some("Parking &lt;mairie&gt;"));
        assert_eq!(formatted.get("icon"), Some("🥾"));
        assert!(formatted
            .get("description")
            .unwrap()
            .contains("Prévoir de l&#39;eau<br>Et un chapeau"));
        assert_eq!(formatted.placeholders().len(), 15);
    }

    #[test]
    fn test_all_day_marker() {
        let mut event = sample_event();
        event.is_all_day = true;
        event.start = Paris.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        event.end = Some(Paris.with_ymd_and_hms(2024, 6, 17, 0, 0, 0).unwrap());

        assert_eq!(time_label(&event), ALL_DAY_LABEL);
        assert_eq!(format_event(&event).get("time"), Some("Toute la journée"));
    }

    #[test]
    fn test_time_labels() {
        let mut event = sample_event();
        event.end = None;
        assert_eq!(time_label(&event), "18:00");

        event.end = Some(Paris.with_ymd_and_hms(2024, 6, 14, 11, 30, 0).unwrap());
        assert_eq!(time_label(&event), "18:00 - 14/06 11:30");
    }

    #[test]
    fn test_missing_location_and_description() {
        let mut event = sample_event();
        event.location = None;
        event.description = None;

        let formatted = format_event(&event);
        assert_eq!(formatted.get("location"), Some(UNKNOWN_LOCATION));
        assert_eq!(formatted.get("description"), Some(""));
    }

    #[test]
    fn test_icons() {
        assert_eq!(event_icon("Grand REPAS de printemps"), "🍽️");
        assert_eq!(event_icon("Atelier potager"), "🌱");
        assert_eq!(event_icon("Visite du musée"), "🚌");
        assert_eq!(event_icon("Assemblée générale"), "📋");
        assert_eq!(event_icon("Loto"), DEFAULT_ICON);
    }

    #[test]
    fn test_color_is_stable() {
        let color = event_color("Loto");
        assert!(EVENT_COLORS.contains(&color));
        assert_eq!(event_color("Loto"), color);
        assert_eq!(event_color(""), EVENT_COLORS[(0xcbf2_9ce4_8422_2325_u64 % 5) as usize]);
    }

    #[test]
    fn test_calendar_links_timed() {
        let links = CalendarLinks::for_event(&sample_event());

        let google = query(&links.google);
        assert!(google.contains(&("action".to_string(), "TEMPLATE".to_string())));
        assert!(google.contains(&(
            "dates".to_string(),
            "20240612T160000Z/20240612T180000Z".to_string()
        )));
        assert!(google.contains(&("text".to_string(), "Randonnée au col".to_string())));

        let yahoo = query(&links.yahoo);
        assert!(yahoo.contains(&("st".to_string(), "20240612T160000Z".to_string())));
        assert!(links.outlook.starts_with("https://outlook.live.com/calendar/0/deeplink/compose?"));
    }

    #[test]
    fn test_calendar_links_all_day_default_end() {
        let mut event = sample_event();
        event.is_all_day = true;
        event.start = Paris.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        event.end = None;

        let links = CalendarLinks::for_event(&event);
        let google = query(&links.google);
        assert!(google.contains(&("dates".to_string(), "20240615/20240616".to_string())));
    }

    #[test]
    fn test_plain_text_summary() {
        let text = plain_text_summary(&[sample_event()]);
        assert_eq!(
            text,
            "Mercredi 12 Juin - 18:00 - 20:00 - Randonnée au col (Parking <mairie>)\n"
        );
    }
}
