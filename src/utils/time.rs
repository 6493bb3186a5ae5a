use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Calendar day an instant belongs to at the workplace.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Renders minutes as hours with one decimal, e.g. `510` -> `"8.5"`.
pub fn format_hours(minutes: i64) -> String {
    if minutes <= 0 {
        return "0.0".to_string();
    }
    format!("{:.1}", minutes as f64 / 60.0)
}

/// Renders minutes as `"8ч 30м"` for user-facing messages.
pub fn format_hm(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}ч {}м", minutes / 60, minutes % 60)
}

pub fn from_rfc3339(s: &str) -> crate::error::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::error::Error::BadRequest(format!("Invalid timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn local_date_follows_offset() {
        let moscow = FixedOffset::east_opt(3 * 3600).unwrap();
        let late_utc = Utc.with_ymd_and_hms(2025, 3, 10, 22, 30, 0).unwrap();
        assert_eq!(
            local_date(late_utc, moscow),
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()
        );
        assert_eq!(
            local_date(late_utc, FixedOffset::east_opt(0).unwrap()),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
    }

    #[test]
    fn hours_have_one_decimal() {
        assert_eq!(format_hours(510), "8.5");
        assert_eq!(format_hours(1080), "18.0");
        assert_eq!(format_hours(100), "1.7");
        assert_eq!(format_hours(0), "0.0");
        assert_eq!(format_hours(-5), "0.0");
    }

    #[test]
    fn hours_and_minutes() {
        assert_eq!(format_hm(510), "8ч 30м");
        assert_eq!(format_hm(59), "0ч 59м");
        assert_eq!(format_hm(-3), "0ч 0м");
    }

    #[test]
    fn rfc3339_is_normalised_to_utc() {
        let at = from_rfc3339("2025-03-10T09:00:00+03:00").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap());
        assert!(from_rfc3339("yesterday").is_err());
    }
}
