use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use chrono_tz::Tz;

const FRENCH_MONTHS: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

const FRENCH_MONTHS_SHORT: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Juin", "Juil", "Août", "Sep", "Oct", "Nov", "Déc",
];

/// French month name for a 1-based month number
pub fn french_month(month: u32) -> &'static str {
    FRENCH_MONTHS[(month.clamp(1, 12) - 1) as usize]
}

/// Abbreviated French month name for a 1-based month number
pub fn french_month_short(month: u32) -> &'static str {
    FRENCH_MONTHS_SHORT[(month.clamp(1, 12) - 1) as usize]
}

/// French weekday name, capitalised
pub fn french_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Lundi",
        Weekday::Tue => "Mardi",
        Weekday::Wed => "Mercredi",
        Weekday::Thu => "Jeudi",
        Weekday::Fri => "Vendredi",
        Weekday::Sat => "Samedi",
        Weekday::Sun => "Dimanche",
    }
}

/// Attach a timezone to a wall-clock time.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times that
/// fall in a DST gap are moved forward by one hour.
pub fn localize(tz: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(naive) {
        chrono::LocalResult::Single(dt) => Some(dt),
        chrono::LocalResult::Ambiguous(earliest, _) => Some(earliest),
        chrono::LocalResult::None => tz
            .from_local_datetime(&(*naive + Duration::hours(1)))
            .earliest(),
    }
}

/// Local midnight at the start of a date
pub fn start_of_day(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    localize(tz, &date.and_hms_opt(0, 0, 0)?)
}

/// Format a date as dd/mm/YYYY
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
