//! Разбор времени из формы и нормализация событий "на весь день".

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::CalendarError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Пара начало/конец, готовая к отправке в хранилище.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn invalid(raw: &str) -> CalendarError {
    CalendarError::InvalidTime(raw.to_string())
}

fn naive_date_time(raw: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// RFC 3339, "наивное" время (считаем UTC) или голая дата (полночь UTC).
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, CalendarError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Some(naive) = naive_date_time(raw) {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(start_of_day)
        .map_err(|_| invalid(raw))
}

/// Календарная дата значения в его собственном смещении.
pub fn calendar_date(raw: &str) -> Result<NaiveDate, CalendarError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.date_naive());
    }
    if let Some(naive) = naive_date_time(raw) {
        return Ok(naive.date());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid(raw))
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::seconds(86_399)
}

/// Пустой конец заменяется началом.
pub fn normalize_span(start: &str, end: &str, all_day: bool) -> Result<TimeSpan, CalendarError> {
    let end = if end.trim().is_empty() { start } else { end };

    if all_day {
        Ok(TimeSpan {
            start: start_of_day(calendar_date(start)?),
            end: end_of_day(calendar_date(end)?),
        })
    } else {
        Ok(TimeSpan {
            start: parse_instant(start)?,
            end: parse_instant(end)?,
        })
    }
}

/// Как форма показывает время события.
pub fn format_for_form(instant: DateTime<Utc>, all_day: bool) -> String {
    if all_day {
        instant.date_naive().format(DATE_FORMAT).to_string()
    } else {
        instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn utc(raw: &str) -> DateTime<Utc> {
        raw.parse().unwrap()
    }

    #[test]
    fn all_day_spans_whole_date() {
        let span = normalize_span("2024-01-05", "2024-01-05", true).unwrap();
        assert_eq!(span.start, utc("2024-01-05T00:00:00Z"));
        assert_eq!(span.end, utc("2024-01-05T23:59:59Z"));
    }

    #[test]
    fn all_day_ignores_time_of_day_and_uses_local_date() {
        let span = normalize_span("2024-03-10T23:30:00+05:30", "2024-03-12T08:15", true).unwrap();
        assert_eq!(span.start, utc("2024-03-10T00:00:00Z"));
        assert_eq!(span.end, utc("2024-03-12T23:59:59Z"));
    }

    #[test]
    fn empty_end_falls_back_to_start() {
        let span = normalize_span("2024-01-05T10:00:00Z", "", false).unwrap();
        assert_eq!(span.start, span.end);

        let span = normalize_span("2024-01-05", "  ", true).unwrap();
        assert_eq!(span.end, utc("2024-01-05T23:59:59Z"));
    }

    #[test]
    fn timed_values_are_read_verbatim() {
        let span = normalize_span("2024-01-05T10:00:00+05:30", "2024-01-05T11:00", false).unwrap();
        assert_eq!(span.start, utc("2024-01-05T04:30:00Z"));
        assert_eq!(span.end, utc("2024-01-05T11:00:00Z"));
        assert_eq!(parse_instant("2024-01-05").unwrap(), utc("2024-01-05T00:00:00Z"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            normalize_span("next tuesday", "", false),
            Err(CalendarError::InvalidTime(_))
        ));
        assert!(normalize_span("", "", true).is_err());
    }

    #[test]
    fn form_format_round_trips_through_normalization() {
        let start = utc("2024-01-05T00:00:00Z");
        let end = utc("2024-01-05T23:59:59Z");
        let span = normalize_span(&format_for_form(start, true), &format_for_form(end, true), true).unwrap();
        assert_eq!(span, TimeSpan { start, end });
    }

    proptest! {
        #[test]
        fn all_day_normalization_drops_time(
            days in 0i64..20_000,
            hour in 0u32..24,
            minute in 0u32..60,
            second in 0u32..60,
        ) {
            let date = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + Duration::days(days);
            let raw = format!("{}T{:02}:{:02}:{:02}Z", date.format(DATE_FORMAT), hour, minute, second);

            let span = normalize_span(&raw, &raw, true).unwrap();

            prop_assert_eq!(span.start, date.and_hms_opt(0, 0, 0).unwrap().and_utc());
            prop_assert_eq!(span.end, date.and_hms_opt(23, 59, 59).unwrap().and_utc());
        }
    }
}
