use crate::utils::time::{localize, start_of_day};
use chrono::DateTime;
use chrono_tz::Tz;
use icalendar::{CalendarDateTime, DatePerhapsTime};
use tracing::debug;

/// An event boundary converted to the display timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTime {
    pub at: DateTime<Tz>,
    /// The feed gave a bare date (all-day event)
    pub date_only: bool,
}

/// Convert a DTSTART/DTEND value to the display timezone
pub fn to_display_time(value: DatePerhapsTime, tz: &Tz) -> Option<EventTime> {
    match value {
        DatePerhapsTime::Date(date) => Some(EventTime {
            at: start_of_day(tz, date)?,
            date_only: true,
        }),
        DatePerhapsTime::DateTime(cal_dt) => {
            let at = match cal_dt {
                CalendarDateTime::Utc(dt) => dt.with_timezone(tz),
                CalendarDateTime::Floating(naive) => localize(tz, &naive)?,
                CalendarDateTime::WithTimezone { date_time, tzid } => {
                    match tzid.parse::<Tz>() {
                        Ok(source_tz) => localize(&source_tz, &date_time)?.with_timezone(tz),
                        Err(_) => {
                            debug!("Unknown TZID {}, using {}", tzid, tz.name());
                            localize(tz, &date_time)?
                        }
                    }
                }
            };
            Some(EventTime {
                at,
                date_only: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::Europe::Paris;

    fn naive(y: i32, m: u32, d: u32, h: u32, mi: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_date_is_local_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 14).unwrap();
        let time = to_display_time(DatePerhapsTime::Date(date), &Paris).unwrap();
        assert!(time.date_only);
        assert_eq!(time.at, Paris.with_ymd_and_hms(2024, 7, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_utc_is_converted() {
        let utc = Utc.with_ymd_and_hms(2024, 7, 14, 16, 0, 0).unwrap();
        let time =
            to_display_time(DatePerhapsTime::DateTime(CalendarDateTime::Utc(utc)), &Paris)
                .unwrap();
        assert!(!time.date_only);
        assert_eq!(time.at.to_rfc3339(), "2024-07-14T18:00:00+02:00");
    }

    #[test]
    fn test_floating_uses_display_zone() {
        let time = to_display_time(
            DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive(2024, 1, 20, 10, 0))),
            &Paris,
        )
        .unwrap();
        assert_eq!(time.at.to_rfc3339(), "2024-01-20T10:00:00+01:00");
    }

    #[test]
    fn test_tzid_is_converted() {
        let time = to_display_time(
            DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone {
                date_time: naive(2024, 1, 20, 10, 0),
                tzid: "America/New_York".to_string(),
            }),
            &Paris,
        )
        .unwrap();
        assert_eq!(time.at.to_rfc3339(), "2024-01-20T16:00:00+01:00");
    }

    #[test]
    fn test_unknown_tzid_falls_back() {
        let time = to_display_time(
            DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone {
                date_time: naive(2024, 1, 20, 10, 0),
                tzid: "Custom/Club".to_string(),
            }),
            &Paris,
        )
        .unwrap();
        assert_eq!(time.at.to_rfc3339(), "2024-01-20T10:00:00+01:00");
    }
}
