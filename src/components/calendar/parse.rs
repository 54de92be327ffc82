//! ICS feed parsing using the icalendar crate's parser.

use super::models::{CalendarEvent, EventWindow};
use super::time::to_display_time;
use crate::error::{calendar_error, DigestResult};
use chrono_tz::Tz;
use icalendar::{
    parser::{read_calendar, unfold, Component},
    DatePerhapsTime,
};
use tracing::{debug, warn};

/// Title used when an event has no SUMMARY
pub const UNTITLED_EVENT: &str = "Sans titre";

/// Parse an ICS document and keep the events inside the window, sorted by start
pub fn parse_calendar(
    content: &str,
    tz: &Tz,
    window: &EventWindow,
) -> DigestResult<Vec<CalendarEvent>> {
    // Some exporters prepend a UTF-8 byte order mark
    let content = content.trim_start_matches('\u{feff}');
    if !content.trim_start().starts_with("BEGIN:VCALENDAR") {
        return Err(calendar_error("Feed is not an iCalendar document"));
    }

    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| calendar_error(&format!("Failed to parse calendar feed: {}", e)))?;

    let mut events = Vec::new();
    for component in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        let event = match parse_event(component, tz) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(reason) => {
                let uid = component
                    .find_prop("UID")
                    .map(|p| p.val.to_string())
                    .unwrap_or_default();
                warn!("Skipping event {}: {}", uid, reason);
                continue;
            }
        };

        if window.contains(&event) {
            events.push(event);
        } else {
            debug!("Event '{}' at {} is outside the window", event.title, event.start);
        }
    }

    sort_events(&mut events);
    Ok(events)
}

/// Order by start time, then title, so output does not depend on feed order
pub fn sort_events(events: &mut [CalendarEvent]) {
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));
}

/// Parse one VEVENT; `Ok(None)` means the event is deliberately ignored
fn parse_event(vevent: &Component<'_>, tz: &Tz) -> Result<Option<CalendarEvent>, String> {
    let cancelled = vevent
        .find_prop("STATUS")
        .map(|p| p.val.as_ref().eq_ignore_ascii_case("CANCELLED"))
        .unwrap_or(false);
    if cancelled {
        return Ok(None);
    }

    let dtstart = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| "missing DTSTART".to_string())?;
    let start = DatePerhapsTime::try_from(dtstart)
        .ok()
        .and_then(|value| to_display_time(value, tz))
        .ok_or_else(|| format!("unreadable DTSTART '{}'", dtstart.val))?;

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .and_then(|value| to_display_time(value, tz))
        .map(|time| time.at);

    let text = |name: &str| {
        vevent
            .find_prop(name)
            .map(|p| unescape_text(p.val.as_ref()))
            .filter(|value| !value.trim().is_empty())
    };

    Ok(Some(CalendarEvent {
        id: vevent
            .find_prop("UID")
            .map(|p| p.val.to_string())
            .unwrap_or_default(),
        title: text("SUMMARY").unwrap_or_else(|| UNTITLED_EVENT.to_string()),
        location: text("LOCATION"),
        description: text("DESCRIPTION"),
        start: start.at,
        end,
        is_all_day: start.date_only,
    }))
}

/// Reverse RFC 5545 text escaping: `\,` `\;` `\\` `\n`
pub fn unescape_text(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            Some(',') | Some(';') | Some('\\') => {
                if let Some(escaped) = chars.next() {
                    result.push(escaped);
                }
            }
            Some('n') | Some('N') => {
                result.push('\n');
                chars.next();
            }
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Paris;

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Google Inc//Google Calendar 70.9054//EN\r\n\
X-WR-TIMEZONE:Europe/Paris\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240612T160000Z\r\n\
DTEND:20240612T180000Z\r\n\
UID:walk@example.com\r\n\
SUMMARY:Randonnée au col\r\n\
LOCATION:Parking de la mairie\\, Le Village\r\n\
DESCRIPTION:Prévoir de l'eau\\nEt un chapeau\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART;VALUE=DATE:20240615\r\n\
DTEND;VALUE=DATE:20240616\r\n\
UID:fete@example.com\r\n\
SUMMARY:Fête du village\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART;TZID=Europe/Paris:20240611T120000\r\n\
DTEND;TZID=Europe/Paris:20240611T140000\r\n\
UID:repas@example.com\r\n\
SUMMARY:Repas partagé\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240801T100000Z\r\n\
UID:later@example.com\r\n\
SUMMARY:Trop tard\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240501T100000Z\r\n\
UID:past@example.com\r\n\
SUMMARY:Déjà passé\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240613T100000Z\r\n\
UID:cancelled@example.com\r\n\
STATUS:CANCELLED\r\n\
SUMMARY:Annulé\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240614T080000Z\r\n\
UID:untitled@example.com\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn window() -> EventWindow {
        EventWindow::starting_at(Paris.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap(), 14)
    }

    #[test]
    fn test_parse_feed_filters_and_sorts() {
        let events = parse_calendar(FEED, &Paris, &window()).unwrap();
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();

        assert_eq!(
            titles,
            vec!["Repas partagé", "Randonnée au col", "Sans titre", "Fête du village"]
        );
    }

    #[test]
    fn test_parse_event_fields() {
        let events = parse_calendar(FEED, &Paris, &window()).unwrap();
        let walk = events.iter().find(|e| e.id == "walk@example.com").unwrap();

        assert_eq!(walk.start.to_rfc3339(), "2024-06-12T18:00:00+02:00");
        assert_eq!(walk.end.unwrap().to_rfc3339(), "2024-06-12T20:00:00+02:00");
        assert_eq!(walk.location.as_deref(), Some("Parking de la mairie, Le Village"));
        assert_eq!(walk.description.as_deref(), Some("Prévoir de l'eau\nEt un chapeau"));
        assert!(!walk.is_all_day);

        let fete = events.iter().find(|e| e.id == "fete@example.com").unwrap();
        assert!(fete.is_all_day);
        assert_eq!(fete.start, Paris.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
        assert!(fete.location.is_none());
    }

    #[test]
    fn test_folded_lines_are_joined() {
        let feed = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240612T160000Z\r\n\
UID:folded@example.com\r\n\
SUMMARY:Assemblée générale de l'associ\r\n ation\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
        let events = parse_calendar(feed, &Paris, &window()).unwrap();
        assert_eq!(events[0].title, "Assemblée générale de l'association");
    }

    #[test]
    fn test_event_without_start_is_skipped() {
        let feed = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:nostart@example.com\r\n\
SUMMARY:Sans date\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
        let events = parse_calendar(feed, &Paris, &window()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let feed = format!("\u{feff}{}", FEED);
        let events = parse_calendar(&feed, &Paris, &window()).unwrap();
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_not_a_calendar() {
        let result = parse_calendar("<html>Not found</html>", &Paris, &window());
        assert!(result.is_err());
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text("a\\, b\\; c\\\\d\\ne"), "a, b; c\\d\ne");
        assert_eq!(unescape_text("trailing\\"), "trailing\\");
        assert_eq!(unescape_text("\\x"), "\\x");
    }
}
