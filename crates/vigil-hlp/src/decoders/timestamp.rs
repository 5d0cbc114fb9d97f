// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timestamp decoding for the named reference formats.
//!
//! Each format is a fixed token sequence scanned left to right; calendar
//! validity is checked with `chrono`. Years before 1970 are rejected, as is
//! anything the format grammar does not cover. An invalid token is consumed
//! without emitting fields.

use super::{Decoded, DecodeFail, Emitted, scan_token};
use crate::value::Value;
use chrono::{Datelike, NaiveDate, Timelike};

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// A named timestamp format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// `Mon Jan _2 15:04:05 2006`
    Ansic,
    /// `Mon Jan _2 15:04:05 MST 2006`
    UnixDate,
    /// `Mon Jan 02 15:04:05 -0700 2006`
    RubyDate,
    /// `02 Jan 06 15:04 MST`
    Rfc822,
    /// `02 Jan 06 15:04 -0700`
    Rfc822z,
    /// `Monday, 02-Jan-06 15:04:05 MST`
    Rfc850,
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123z,
    /// `2006-01-02T15:04:05+07:00`
    Rfc3339,
    /// `3:04PM`
    Kitchen,
    /// `Jan _2 15:04:05`
    Stamp,
    /// `2021-02-14 10:45:14 UTC`
    Postgres,
    /// `2021-02-14 10:45:14.123 UTC`
    PostgresMs,
    /// `Tue Feb 11 15:04:05 2020`
    Apache,
}

impl TimeFormat {
    /// Auto-detection order; the first matching format wins.
    pub const AUTO: [TimeFormat; 14] = [
        TimeFormat::Ansic,
        TimeFormat::UnixDate,
        TimeFormat::RubyDate,
        TimeFormat::Rfc822,
        TimeFormat::Rfc822z,
        TimeFormat::Rfc850,
        TimeFormat::Rfc1123,
        TimeFormat::Rfc1123z,
        TimeFormat::Rfc3339,
        TimeFormat::Kitchen,
        TimeFormat::Stamp,
        TimeFormat::Postgres,
        TimeFormat::PostgresMs,
        TimeFormat::Apache,
    ];

    /// Map a template argument to a format.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "ANSIC" => Some(Self::Ansic),
            "UnixDate" => Some(Self::UnixDate),
            "RubyDate" => Some(Self::RubyDate),
            "RFC822" => Some(Self::Rfc822),
            "RFC822Z" => Some(Self::Rfc822z),
            "RFC850" => Some(Self::Rfc850),
            "RFC1123" => Some(Self::Rfc1123),
            "RFC1123Z" => Some(Self::Rfc1123z),
            "RFC3339" => Some(Self::Rfc3339),
            "Kitchen" => Some(Self::Kitchen),
            "Stamp" => Some(Self::Stamp),
            "POSTGRES" => Some(Self::Postgres),
            "POSTGRES_MS" => Some(Self::PostgresMs),
            "APACHE" => Some(Self::Apache),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoded calendar parts
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
struct Parts {
    year: Option<i64>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<i64>,
    minutes: Option<i64>,
    seconds: Option<f64>,
    timezone: Option<String>,
}

impl Parts {
    fn calendar_valid(&self) -> bool {
        if let Some(year) = self.year {
            if !(1970..=9999).contains(&year) {
                return false;
            }
        }
        if let (Some(month), Some(day)) = (self.month, self.day) {
            // A leap year stands in when the format carries no year.
            let year = self.year.unwrap_or(2000) as i32;
            if NaiveDate::from_ymd_opt(year, month, day).is_none() {
                return false;
            }
        }
        if let Some(h) = self.hour {
            if !(0..=23).contains(&h) {
                return false;
            }
        }
        if let Some(m) = self.minutes {
            if !(0..=59).contains(&m) {
                return false;
            }
        }
        if let Some(s) = self.seconds {
            if !(0.0..61.0).contains(&s) {
                return false;
            }
        }
        true
    }

    fn emit(self) -> Vec<Emitted> {
        let mut fields = Vec::new();
        if let Some(y) = self.year {
            fields.push((Some("year"), Value::Int(y)));
        }
        if let Some(m) = self.month {
            fields.push((Some("month"), Value::UInt(u64::from(m))));
        }
        if let Some(d) = self.day {
            fields.push((Some("day"), Value::UInt(u64::from(d))));
        }
        if let Some(h) = self.hour {
            fields.push((Some("hour"), Value::Int(h)));
        }
        if let Some(min) = self.minutes {
            fields.push((Some("minutes"), Value::Int(min)));
        }
        if let Some(s) = self.seconds {
            fields.push((Some("seconds"), Value::Float(s)));
        }
        if let Some(tz) = self.timezone {
            fields.push((Some("timezone"), Value::Str(tz)));
        }
        fields
    }
}

pub(crate) fn decode(
    input: &str,
    cursor: usize,
    stop: Option<&str>,
    format: Option<TimeFormat>,
) -> Result<Decoded, DecodeFail> {
    let (token, end) = scan_token(input, cursor, stop);

    let parts = match format {
        Some(f) => parse_format(f, token),
        None => TimeFormat::AUTO.iter().find_map(|f| parse_format(*f, token)),
    };

    match parts {
        Some(parts) if parts.calendar_valid() => Ok(Decoded::Fields {
            fields: parts.emit(),
            end,
        }),
        _ => Ok(Decoded::Silent { end }),
    }
}

fn parse_format(format: TimeFormat, token: &str) -> Option<Parts> {
    if format == TimeFormat::Rfc3339 {
        return parse_rfc3339(token);
    }

    let mut s = Scanner::new(token);
    let mut p = Parts::default();
    match format {
        TimeFormat::Ansic | TimeFormat::Apache => {
            s.weekday_abbr()?;
            s.lit(" ")?;
            p.month = Some(s.month_abbr()?);
            s.lit(" ")?;
            p.day = Some(s.day()?);
            s.lit(" ")?;
            (p.hour, p.minutes, p.seconds) = s.clock_hms()?;
            s.lit(" ")?;
            p.year = Some(s.year4()?);
        }
        TimeFormat::UnixDate => {
            s.weekday_abbr()?;
            s.lit(" ")?;
            p.month = Some(s.month_abbr()?);
            s.lit(" ")?;
            p.day = Some(s.day()?);
            s.lit(" ")?;
            (p.hour, p.minutes, p.seconds) = s.clock_hms()?;
            s.lit(" ")?;
            p.timezone = Some(s.tz_abbr()?);
            s.lit(" ")?;
            p.year = Some(s.year4()?);
        }
        TimeFormat::RubyDate => {
            s.weekday_abbr()?;
            s.lit(" ")?;
            p.month = Some(s.month_abbr()?);
            s.lit(" ")?;
            p.day = Some(s.day()?);
            s.lit(" ")?;
            (p.hour, p.minutes, p.seconds) = s.clock_hms()?;
            s.lit(" ")?;
            p.timezone = Some(s.tz_numeric()?);
            s.lit(" ")?;
            p.year = Some(s.year4()?);
        }
        TimeFormat::Rfc822 | TimeFormat::Rfc822z => {
            p.day = Some(s.day()?);
            s.lit(" ")?;
            p.month = Some(s.month_abbr()?);
            s.lit(" ")?;
            p.year = Some(s.year2()?);
            s.lit(" ")?;
            (p.hour, p.minutes) = s.clock_hm()?;
            p.seconds = Some(0.0);
            s.lit(" ")?;
            p.timezone = Some(if format == TimeFormat::Rfc822 {
                s.tz_abbr()?
            } else {
                s.tz_numeric()?
            });
        }
        TimeFormat::Rfc850 => {
            s.weekday_full()?;
            s.lit(", ")?;
            p.day = Some(s.day()?);
            s.lit("-")?;
            p.month = Some(s.month_abbr()?);
            s.lit("-")?;
            p.year = Some(s.year2()?);
            s.lit(" ")?;
            (p.hour, p.minutes, p.seconds) = s.clock_hms()?;
            s.lit(" ")?;
            p.timezone = Some(s.tz_abbr()?);
        }
        TimeFormat::Rfc1123 | TimeFormat::Rfc1123z => {
            s.weekday_abbr()?;
            s.lit(", ")?;
            p.day = Some(s.day()?);
            s.lit(" ")?;
            p.month = Some(s.month_abbr()?);
            s.lit(" ")?;
            p.year = Some(s.year4()?);
            s.lit(" ")?;
            (p.hour, p.minutes, p.seconds) = s.clock_hms()?;
            s.lit(" ")?;
            p.timezone = Some(if format == TimeFormat::Rfc1123 {
                s.tz_abbr()?
            } else {
                s.tz_numeric()?
            });
        }
        TimeFormat::Kitchen => {
            let hour12 = s.digits_1_2()?;
            s.lit(":")?;
            p.minutes = Some(i64::from(s.digits_exact(2)?));
            let pm = s.ampm()?;
            let hour = match (hour12, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) if h < 12 => h + 12,
                (h, false) => h,
                _ => return None,
            };
            p.hour = Some(i64::from(hour));
            p.seconds = Some(0.0);
        }
        TimeFormat::Stamp => {
            p.month = Some(s.month_abbr()?);
            s.lit(" ")?;
            p.day = Some(s.day()?);
            s.lit(" ")?;
            (p.hour, p.minutes, p.seconds) = s.clock_hms()?;
        }
        TimeFormat::Postgres | TimeFormat::PostgresMs => {
            p.year = Some(i64::from(s.digits_exact(4)?));
            s.lit("-")?;
            p.month = Some(s.digits_exact(2)?);
            s.lit("-")?;
            p.day = Some(s.digits_exact(2)?);
            s.lit(" ")?;
            (p.hour, p.minutes, p.seconds) = s.clock_hms()?;
            s.lit(" ")?;
            p.timezone = Some(s.tz_abbr()?);
        }
        TimeFormat::Rfc3339 => unreachable!("handled above"),
    }

    s.at_end().then_some(p)
}

fn parse_rfc3339(token: &str) -> Option<Parts> {
    let dt = chrono::DateTime::parse_from_rfc3339(token).ok()?;
    Some(Parts {
        year: Some(i64::from(dt.year())),
        month: Some(dt.month()),
        day: Some(dt.day()),
        hour: Some(i64::from(dt.hour())),
        minutes: Some(i64::from(dt.minute())),
        seconds: Some(f64::from(dt.second()) + f64::from(dt.nanosecond()) / 1e9),
        timezone: Some(dt.offset().to_string()),
    })
}

// ---------------------------------------------------------------------------
// Token scanner
// ---------------------------------------------------------------------------

const WEEKDAYS_ABBR: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const WEEKDAYS_FULL: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const MONTHS_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(token: &'a str) -> Self {
        Self { rest: token }
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn lit(&mut self, expected: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(expected)?;
        Some(())
    }

    fn one_of(&mut self, names: &[&str]) -> Option<usize> {
        for (idx, name) in names.iter().enumerate() {
            if let Some(rest) = self.rest.strip_prefix(name) {
                self.rest = rest;
                return Some(idx);
            }
        }
        None
    }

    fn weekday_abbr(&mut self) -> Option<()> {
        self.one_of(&WEEKDAYS_ABBR).map(|_| ())
    }

    fn weekday_full(&mut self) -> Option<()> {
        self.one_of(&WEEKDAYS_FULL).map(|_| ())
    }

    fn month_abbr(&mut self) -> Option<u32> {
        self.one_of(&MONTHS_ABBR).map(|idx| idx as u32 + 1)
    }

    fn digits_exact(&mut self, count: usize) -> Option<u32> {
        let taken: &str = self.rest.get(..count)?;
        if !taken.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.rest = &self.rest[count..];
        taken.parse().ok()
    }

    fn digits_1_2(&mut self) -> Option<u32> {
        let len = self
            .rest
            .bytes()
            .take(2)
            .take_while(u8::is_ascii_digit)
            .count();
        if len == 0 {
            return None;
        }
        let (taken, rest) = self.rest.split_at(len);
        self.rest = rest;
        taken.parse().ok()
    }

    /// Day of month: 1–2 digits, tolerating the space padding of `_2`
    /// layouts.
    fn day(&mut self) -> Option<u32> {
        let _ = self.lit(" ");
        self.digits_1_2()
    }

    fn year4(&mut self) -> Option<i64> {
        self.digits_exact(4).map(i64::from)
    }

    /// Two-digit year, 69–99 → 19xx, otherwise 20xx.
    fn year2(&mut self) -> Option<i64> {
        let y = self.digits_exact(2)?;
        Some(if y >= 69 { 1900 + i64::from(y) } else { 2000 + i64::from(y) })
    }

    /// `H:MM:SS[.fraction]`.
    #[allow(clippy::type_complexity)]
    fn clock_hms(&mut self) -> Option<(Option<i64>, Option<i64>, Option<f64>)> {
        let hour = self.digits_1_2()?;
        self.lit(":")?;
        let minutes = self.digits_exact(2)?;
        self.lit(":")?;
        let whole = self.digits_exact(2)?;
        let mut seconds = f64::from(whole);
        if self.rest.starts_with('.') {
            let digits = self.rest[1..]
                .bytes()
                .take_while(u8::is_ascii_digit)
                .count();
            if digits == 0 {
                return None;
            }
            let frac: &str = &self.rest[..1 + digits];
            seconds += frac.parse::<f64>().ok()?;
            self.rest = &self.rest[1 + digits..];
        }
        Some((
            Some(i64::from(hour)),
            Some(i64::from(minutes)),
            Some(seconds),
        ))
    }

    /// `H:MM`, no seconds.
    fn clock_hm(&mut self) -> Option<(Option<i64>, Option<i64>)> {
        let hour = self.digits_1_2()?;
        self.lit(":")?;
        let minutes = self.digits_exact(2)?;
        Some((Some(i64::from(hour)), Some(i64::from(minutes))))
    }

    /// Timezone abbreviation: 1–5 uppercase letters.
    fn tz_abbr(&mut self) -> Option<String> {
        let len = self
            .rest
            .bytes()
            .take(5)
            .take_while(u8::is_ascii_uppercase)
            .count();
        if len == 0 {
            return None;
        }
        let (taken, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(taken.to_owned())
    }

    /// Numeric offset: `±HHMM`.
    fn tz_numeric(&mut self) -> Option<String> {
        let sign = self.rest.as_bytes().first().copied()?;
        if sign != b'+' && sign != b'-' {
            return None;
        }
        let digits = &self.rest.get(1..5)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let (taken, rest) = self.rest.split_at(5);
        self.rest = rest;
        Some(taken.to_owned())
    }

    fn ampm(&mut self) -> Option<bool> {
        if self.lit("AM").is_some() {
            Some(false)
        } else if self.lit("PM").is_some() {
            Some(true)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(token: &str, format: Option<TimeFormat>) -> Option<Parts> {
        match decode(token, 0, None, format).unwrap() {
            Decoded::Fields { fields, .. } => {
                let mut p = Parts::default();
                for (sub, v) in fields {
                    match sub {
                        Some("year") => p.year = v.as_int(),
                        Some("month") => p.month = v.as_uint().map(|n| n as u32),
                        Some("day") => p.day = v.as_uint().map(|n| n as u32),
                        Some("hour") => p.hour = v.as_int(),
                        Some("minutes") => p.minutes = v.as_int(),
                        Some("seconds") => p.seconds = v.as_float(),
                        Some("timezone") => p.timezone = v.as_str().map(str::to_owned),
                        other => panic!("unexpected sub-key {other:?}"),
                    }
                }
                Some(p)
            }
            Decoded::Silent { .. } => None,
        }
    }

    fn ymd_hms(p: &Parts) -> (i64, u32, u32, i64, i64, f64) {
        (
            p.year.unwrap(),
            p.month.unwrap(),
            p.day.unwrap(),
            p.hour.unwrap(),
            p.minutes.unwrap(),
            p.seconds.unwrap(),
        )
    }

    #[test]
    fn ansic_with_and_without_fraction() {
        let p = run("Mon Jan 2 15:04:05 2006", Some(TimeFormat::Ansic)).unwrap();
        assert_eq!(ymd_hms(&p), (2006, 1, 2, 15, 4, 5.0));

        let p = run("Mon Jan 2 15:04:05.123456 2006", Some(TimeFormat::Ansic)).unwrap();
        assert_eq!(p.seconds, Some(5.123456));
    }

    #[test]
    fn unix_date_carries_timezone() {
        let p = run("Mon Jan 2 15:04:05 MST 2006", Some(TimeFormat::UnixDate)).unwrap();
        assert_eq!(ymd_hms(&p), (2006, 1, 2, 15, 4, 5.0));
        assert_eq!(p.timezone.as_deref(), Some("MST"));
    }

    #[test]
    fn unix_date_rejects_pre_epoch_years() {
        assert!(run("Mon Jan 2 15:04:05 MST 1960", Some(TimeFormat::UnixDate)).is_none());
    }

    #[test]
    fn ruby_date_numeric_offset() {
        let p = run("Mon Jan 02 15:04:05 -0700 2006", Some(TimeFormat::RubyDate)).unwrap();
        assert_eq!(ymd_hms(&p), (2006, 1, 2, 15, 4, 5.0));
        assert_eq!(p.timezone.as_deref(), Some("-0700"));
    }

    #[test]
    fn rfc822_variants() {
        let p = run("02 Jan 06 15:04 MST", Some(TimeFormat::Rfc822)).unwrap();
        assert_eq!(ymd_hms(&p), (2006, 1, 2, 15, 4, 0.0));
        assert_eq!(p.timezone.as_deref(), Some("MST"));

        let p = run("02 Jan 06 15:04 -0700", Some(TimeFormat::Rfc822z)).unwrap();
        assert_eq!(p.timezone.as_deref(), Some("-0700"));
    }

    #[test]
    fn rfc850_full_weekday() {
        let p = run("Monday, 02-Jan-06 15:04:05 MST", Some(TimeFormat::Rfc850)).unwrap();
        assert_eq!(ymd_hms(&p), (2006, 1, 2, 15, 4, 5.0));
        assert_eq!(p.timezone.as_deref(), Some("MST"));
    }

    #[test]
    fn rfc1123_variants() {
        let p = run("Mon, 02 Jan 2006 15:04:05 MST", Some(TimeFormat::Rfc1123)).unwrap();
        assert_eq!(ymd_hms(&p), (2006, 1, 2, 15, 4, 5.0));

        let p = run("Mon, 02 Jan 2006 15:04:05 -0700", Some(TimeFormat::Rfc1123z)).unwrap();
        assert_eq!(p.timezone.as_deref(), Some("-0700"));
    }

    #[test]
    fn rfc3339_with_nanoseconds() {
        let p = run("2006-01-02T15:04:05+07:00", Some(TimeFormat::Rfc3339)).unwrap();
        assert_eq!(ymd_hms(&p), (2006, 1, 2, 15, 4, 5.0));
        assert_eq!(p.timezone.as_deref(), Some("+07:00"));

        let p = run("2006-01-02T15:04:05.999999999Z", Some(TimeFormat::Rfc3339)).unwrap();
        assert!((p.seconds.unwrap() - 5.999999999).abs() < 1e-12);
    }

    #[test]
    fn kitchen_clock() {
        let p = run("3:04AM", Some(TimeFormat::Kitchen)).unwrap();
        assert_eq!((p.hour, p.minutes), (Some(3), Some(4)));

        let p = run("3:04PM", Some(TimeFormat::Kitchen)).unwrap();
        assert_eq!((p.hour, p.minutes), (Some(15), Some(4)));

        let p = run("12:01AM", Some(TimeFormat::Kitchen)).unwrap();
        assert_eq!(p.hour, Some(0));
    }

    #[test]
    fn stamp_with_fractions() {
        for token in [
            "Jan 2 15:04:05",
            "Jan 2 15:04:05.000",
            "Jan 2 15:04:05.000000",
            "Jan 2 15:04:05.000000000",
        ] {
            let p = run(token, Some(TimeFormat::Stamp)).unwrap();
            assert_eq!(p.month, Some(1));
            assert_eq!(p.day, Some(2));
            assert_eq!(p.hour, Some(15));
            assert_eq!(p.minutes, Some(4));
            assert_eq!(p.seconds, Some(5.0));
            assert_eq!(p.year, None);
        }
    }

    #[test]
    fn postgres_with_and_without_millis() {
        let p = run("2021-02-14 10:45:14 UTC", Some(TimeFormat::Postgres)).unwrap();
        assert_eq!(ymd_hms(&p), (2021, 2, 14, 10, 45, 14.0));
        assert_eq!(p.timezone.as_deref(), Some("UTC"));

        let p = run("2021-02-14 10:45:14.123 UTC", Some(TimeFormat::PostgresMs)).unwrap();
        assert_eq!(p.seconds, Some(14.123));

        let p = run("2021-02-14 10:45:14.123456 UTC", Some(TimeFormat::PostgresMs)).unwrap();
        assert_eq!(p.seconds, Some(14.123456));
    }

    #[test]
    fn apache_format() {
        let p = run("Tue Feb 11 15:04:05 2020", Some(TimeFormat::Apache)).unwrap();
        assert_eq!(ymd_hms(&p), (2020, 2, 11, 15, 4, 5.0));
    }

    #[test]
    fn auto_detection_is_first_match_wins() {
        let p = run("Mon Jan 02 15:04:05 -0700 2006", None).unwrap();
        assert_eq!(p.timezone.as_deref(), Some("-0700"));

        let p = run("Mon Jan 2 15:04:05 2006", None).unwrap();
        assert_eq!(p.year, Some(2006));

        let p = run("Mon Jan 2 15:04:05 MST 2006", None).unwrap();
        assert_eq!(p.timezone.as_deref(), Some("MST"));

        let p = run("Jan 2 15:04:05", None).unwrap();
        assert_eq!(p.year, None);
        assert_eq!(p.month, Some(1));
    }

    #[test]
    fn garbage_is_consumed_silently() {
        assert!(run("not a time", None).is_none());
        assert!(run("Mon Jan 2", Some(TimeFormat::Ansic)).is_none());
        // Trailing bytes the format does not cover.
        assert!(run("3:04PMx", Some(TimeFormat::Kitchen)).is_none());
    }

    #[test]
    fn calendar_validity_is_enforced() {
        assert!(run("2021-02-30 10:45:14 UTC", Some(TimeFormat::Postgres)).is_none());
        assert!(run("2021-13-01 10:45:14 UTC", Some(TimeFormat::Postgres)).is_none());
        assert!(run("2021-02-14 25:45:14 UTC", Some(TimeFormat::Postgres)).is_none());
    }
}
