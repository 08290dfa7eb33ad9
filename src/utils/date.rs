use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, de::Error};

/// Parse a calendar day from either `YYYY-MM-DD` or an RFC 3339 timestamp.
/// Time of day is dropped; the date is taken as written, not shifted to UTC.
pub fn parse_calendar_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.date_naive())
}

/// serde adapter for required calendar-day fields
pub fn calendar_day<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_day(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

/// serde adapter for optional calendar-day fields; an empty string counts as absent
pub fn optional_calendar_day<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_calendar_day(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date '{raw}', expected YYYY-MM-DD"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dates_parse() {
        assert_eq!(
            parse_calendar_day("2024-01-07"),
            NaiveDate::from_ymd_opt(2024, 1, 7)
        );
    }

    #[test]
    fn timestamps_keep_their_written_day() {
        assert_eq!(
            parse_calendar_day("2024-01-07T23:30:00+09:00"),
            NaiveDate::from_ymd_opt(2024, 1, 7)
        );
        assert_eq!(
            parse_calendar_day("2024-01-07T00:00:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 1, 7)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_calendar_day("next sunday"), None);
        assert_eq!(parse_calendar_day("2024-13-01"), None);
    }

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "optional_calendar_day")]
        day: Option<NaiveDate>,
    }

    #[test]
    fn optional_days_treat_blank_as_missing() {
        let probe: Probe = serde_json::from_str(r#"{"day": ""}"#).unwrap();
        assert!(probe.day.is_none());

        let probe: Probe = serde_json::from_str(r#"{}"#).unwrap();
        assert!(probe.day.is_none());

        assert!(serde_json::from_str::<Probe>(r#"{"day": "yesterday"}"#).is_err());
    }
}
