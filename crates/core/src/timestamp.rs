//! Date and date-time parsing for message values.
//!
//! Formats use `chrono` strftime syntax and are applied strictly. A date-time
//! may end in an HL7 UTC offset (`+hhmm` / `-hhmm`); otherwise the configured
//! default offset is assumed.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

/// Parse the first `width` characters of `value` as a date.
pub fn parse_date(value: &str, format: &str, width: usize) -> Result<NaiveDate, String> {
    let head = value
        .get(..width)
        .ok_or_else(|| format!("expected at least {width} characters"))?;
    NaiveDate::parse_from_str(head, format).map_err(|err| err.to_string())
}

/// Parse a date-time, honouring a trailing `+hhmm`/`-hhmm` offset.
pub fn parse_datetime(
    value: &str,
    format: &str,
    default_offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, String> {
    let (local, offset) = match split_hl7_offset(value) {
        Some((local, offset)) => (local, offset),
        None => (value, default_offset),
    };

    let naive = NaiveDateTime::parse_from_str(local, format).map_err(|err| err.to_string())?;
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| "ambiguous local time".to_owned())
}

/// Parse a configured UTC offset: `Z`, `+hh:mm`, `-hh:mm`, `+hhmm` or `-hhmm`.
pub fn parse_utc_offset(text: &str) -> Option<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let sign = match text.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits: String = text[1..].chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3_600 + minutes * 60))
}

fn split_hl7_offset(value: &str) -> Option<(&str, FixedOffset)> {
    let split_at = value.len().checked_sub(5)?;
    if split_at == 0 || !value.is_char_boundary(split_at) {
        return None;
    }
    let (local, suffix) = value.split_at(split_at);
    if !suffix.starts_with(['+', '-']) {
        return None;
    }
    parse_utc_offset(suffix).map(|offset| (local, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3_600).expect("valid offset")
    }

    #[test]
    fn birth_date_uses_first_eight_characters() {
        let date = parse_date("19800101083000", "%Y%m%d", 8).expect("parse date");
        assert_eq!(date, NaiveDate::from_ymd_opt(1980, 1, 1).expect("valid date"));
    }

    #[test]
    fn short_or_malformed_dates_fail() {
        parse_date("198001", "%Y%m%d", 8).expect_err("too short");
        parse_date("1980XX01", "%Y%m%d", 8).expect_err("not digits");
        parse_date("19801301", "%Y%m%d", 8).expect_err("month 13");
    }

    #[test]
    fn datetime_uses_default_offset() {
        let parsed = parse_datetime("201908281438", "%Y%m%d%H%M", offset(-5)).expect("parse");
        assert_eq!(parsed.to_rfc3339(), "2019-08-28T14:38:00-05:00");
    }

    #[test]
    fn datetime_honours_trailing_offset() {
        let parsed =
            parse_datetime("20190828143805+0200", "%Y%m%d%H%M%S", offset(-5)).expect("parse");
        assert_eq!(parsed.to_rfc3339(), "2019-08-28T14:38:05+02:00");
    }

    #[test]
    fn datetime_format_is_strict() {
        // seconds present but the format stops at minutes
        parse_datetime("20190828143805", "%Y%m%d%H%M", offset(1)).expect_err("extra digits");
        // 12-hour style value against a 24-hour format
        parse_datetime("2019082825", "%Y%m%d%H", offset(1)).expect_err("hour 25");
        parse_datetime("not-a-date", "%Y%m%d%H%M", offset(1)).expect_err("garbage");
    }

    #[test]
    fn utc_offsets() {
        assert_eq!(parse_utc_offset("Z"), Some(offset(0)));
        assert_eq!(parse_utc_offset("-05:00"), Some(offset(-5)));
        assert_eq!(parse_utc_offset("+0100"), Some(offset(1)));
        assert_eq!(parse_utc_offset("0100"), None);
        assert_eq!(parse_utc_offset("+25:00"), None);
        assert_eq!(parse_utc_offset("+1:00"), None);
    }
}
