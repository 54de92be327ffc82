use chrono::{DateTime, Duration};
use chrono_tz::Tz;

/// A calendar event, with times already converted to the display timezone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// UID from the feed; informational only
    pub id: String,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Tz>,
    pub end: Option<DateTime<Tz>>,
    pub is_all_day: bool,
}

impl CalendarEvent {
    /// End time used for "add to calendar" links when the feed has none:
    /// one day for all-day events, two hours otherwise
    pub fn effective_end(&self) -> DateTime<Tz> {
        match self.end {
            Some(end) => end,
            None if self.is_all_day => self.start + Duration::days(1),
            None => self.start + Duration::hours(2),
        }
    }
}

/// The forward-looking period events are selected from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl EventWindow {
    /// Window from `now` to `now + days`
    pub fn starting_at(now: DateTime<Tz>, days: u32) -> Self {
        Self {
            start: now,
            end: now + Duration::days(i64::from(days)),
        }
    }

    /// Whether an event belongs in the digest.
    ///
    /// Timed events must start inside the window (bounds included). All-day
    /// events count from the window's first date, so today's all-day events
    /// are kept even though their midnight has already passed.
    pub fn contains(&self, event: &CalendarEvent) -> bool {
        if event.start > self.end {
            return false;
        }
        if event.is_all_day {
            event.start.date_naive() >= self.start.date_naive()
        } else {
            event.start >= self.start
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Paris;

    fn event(start: DateTime<Tz>, is_all_day: bool) -> CalendarEvent {
        CalendarEvent {
            id: "uid".to_string(),
            title: "Test".to_string(),
            location: None,
            description: None,
            start,
            end: None,
            is_all_day,
        }
    }

    #[test]
    fn test_window_bounds() {
        let now = Paris.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        let window = EventWindow::starting_at(now, 14);
        assert_eq!(window.end, Paris.with_ymd_and_hms(2024, 5, 24, 9, 0, 0).unwrap());

        assert!(window.contains(&event(now, false)));
        assert!(window.contains(&event(window.end, false)));
        assert!(!window.contains(&event(now - Duration::minutes(1), false)));
        assert!(!window.contains(&event(window.end + Duration::minutes(1), false)));
    }

    #[test]
    fn test_all_day_today_is_kept() {
        let now = Paris.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        let window = EventWindow::starting_at(now, 7);

        let today = Paris.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        let yesterday = Paris.with_ymd_and_hms(2024, 5, 9, 0, 0, 0).unwrap();
        let last_day = Paris.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap();
        let too_late = Paris.with_ymd_and_hms(2024, 5, 18, 0, 0, 0).unwrap();

        assert!(window.contains(&event(today, true)));
        assert!(!window.contains(&event(yesterday, true)));
        assert!(window.contains(&event(last_day, true)));
        assert!(!window.contains(&event(too_late, true)));
    }

    #[test]
    fn test_effective_end_defaults() {
        let start = Paris.with_ymd_and_hms(2024, 5, 10, 18, 0, 0).unwrap();
        assert_eq!(event(start, false).effective_end(), start + Duration::hours(2));
        assert_eq!(event(start, true).effective_end(), start + Duration::days(1));

        let mut with_end = event(start, false);
        with_end.end = Some(start + Duration::minutes(45));
        assert_eq!(with_end.effective_end(), start + Duration::minutes(45));
    }
}
