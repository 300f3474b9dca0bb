//! CIM datetime text grammar (DSP0004).
//!
//! Absolute timestamps have the form `yyyymmddhhmmss.mmmmmmsutc` and
//! intervals `ddddddddhhmmss.mmmmmm:000`. Any field may be replaced by
//! asterisks; the microsecond field may be truncated from the right.

use std::fmt;
use std::str::FromStr;

use crate::ValueError;

const DATETIME_LEN: usize = 25;

/// Point in time with an offset from UTC in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTimeAbsolute {
    pub year: Option<u16>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
    pub micros: Microseconds,
    pub utc_offset: i16,
}

/// Duration expressed in days and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTimeInterval {
    pub days: Option<u32>,
    pub hours: Option<u8>,
    pub minutes: Option<u8>,
    pub seconds: Option<u8>,
    pub micros: Microseconds,
}

/// Microsecond field with the number of significant (non-wildcard) digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Microseconds {
    /// Value of the significant digits scaled to microseconds.
    pub value: u32,
    /// Count of leading digits that are not wildcards (0..=6).
    pub precision: u8,
}

/// Either form of a CIM datetime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CimDateTime {
    Absolute(DateTimeAbsolute),
    Interval(DateTimeInterval),
}

impl CimDateTime {
    /// Parse text as an absolute timestamp first, then as an interval.
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        let text = text.trim();
        match DateTimeAbsolute::from_str(text) {
            Ok(abs) => Ok(CimDateTime::Absolute(abs)),
            Err(absolute) => match DateTimeInterval::from_str(text) {
                Ok(interval) => Ok(CimDateTime::Interval(interval)),
                Err(interval) => Err(ValueError::DateTime {
                    value: text.to_string(),
                    absolute,
                    interval,
                }),
            },
        }
    }

    pub const fn is_interval(&self) -> bool {
        matches!(self, CimDateTime::Interval(_))
    }
}

impl FromStr for CimDateTime {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CimDateTime::parse(s)
    }
}

impl FromStr for DateTimeAbsolute {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bytes = check_shape(text)?;
        let sign = match bytes[21] {
            b'+' => 1i16,
            b'-' => -1i16,
            other => {
                return Err(format!(
                    "expected UTC offset sign at position 21, found {:?}",
                    other as char
                ))
            }
        };
        let offset = digits(&bytes[22..25])
            .ok_or_else(|| "UTC offset must be three digits".to_string())?;
        Ok(DateTimeAbsolute {
            year: field(bytes, 0, 4, "year", 0, 9999)?.map(|v| v as u16),
            month: field(bytes, 4, 2, "month", 1, 12)?.map(|v| v as u8),
            day: field(bytes, 6, 2, "day", 1, 31)?.map(|v| v as u8),
            hour: field(bytes, 8, 2, "hour", 0, 23)?.map(|v| v as u8),
            minute: field(bytes, 10, 2, "minute", 0, 59)?.map(|v| v as u8),
            second: field(bytes, 12, 2, "second", 0, 60)?.map(|v| v as u8),
            micros: micros(&bytes[15..21])?,
            utc_offset: sign * offset as i16,
        })
    }
}

impl FromStr for DateTimeInterval {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bytes = check_shape(text)?;
        if &bytes[21..25] != b":000" {
            return Err("interval must end with \":000\"".into());
        }
        Ok(DateTimeInterval {
            days: field(bytes, 0, 8, "days", 0, 99_999_999)?,
            hours: field(bytes, 8, 2, "hours", 0, 23)?.map(|v| v as u8),
            minutes: field(bytes, 10, 2, "minutes", 0, 59)?.map(|v| v as u8),
            seconds: field(bytes, 12, 2, "seconds", 0, 59)?.map(|v| v as u8),
            micros: micros(&bytes[15..21])?,
        })
    }
}

fn check_shape(text: &str) -> Result<&[u8], String> {
    let bytes = text.as_bytes();
    if bytes.len() != DATETIME_LEN {
        return Err(format!(
            "expected {DATETIME_LEN} characters, found {}",
            bytes.len()
        ));
    }
    if bytes[14] != b'.' {
        return Err("expected '.' at position 14".into());
    }
    Ok(bytes)
}

fn digits(bytes: &[u8]) -> Option<u32> {
    bytes.iter().try_fold(0u32, |acc, &b| {
        b.is_ascii_digit().then(|| acc * 10 + u32::from(b - b'0'))
    })
}

/// Parse a fixed-width field; all asterisks means "unspecified".
fn field(
    bytes: &[u8],
    start: usize,
    len: usize,
    name: &str,
    min: u32,
    max: u32,
) -> Result<Option<u32>, String> {
    let slice = &bytes[start..start + len];
    if slice.iter().all(|&b| b == b'*') {
        return Ok(None);
    }
    let value = digits(slice).ok_or_else(|| format!("{name} field is not numeric"))?;
    if value < min || value > max {
        return Err(format!("{name} {value} outside {min}..={max}"));
    }
    Ok(Some(value))
}

fn micros(bytes: &[u8]) -> Result<Microseconds, String> {
    let precision = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if bytes[precision..].iter().any(|&b| b != b'*') {
        return Err("microseconds may only be wildcarded from the right".into());
    }
    let significant = digits(&bytes[..precision]).unwrap_or(0);
    let scale = 10u32.pow((6 - precision) as u32);
    Ok(Microseconds {
        value: significant * scale,
        precision: precision as u8,
    })
}

fn write_field(f: &mut fmt::Formatter<'_>, value: Option<u32>, width: usize) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{v:0width$}"),
        None => f.write_str(&"*".repeat(width)),
    }
}

impl fmt::Display for Microseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = format!("{:06}", self.value);
        let keep = usize::from(self.precision.min(6));
        write!(f, "{}{}", &digits[..keep], "*".repeat(6 - keep))
    }
}

impl fmt::Display for DateTimeAbsolute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_field(f, self.year.map(u32::from), 4)?;
        write_field(f, self.month.map(u32::from), 2)?;
        write_field(f, self.day.map(u32::from), 2)?;
        write_field(f, self.hour.map(u32::from), 2)?;
        write_field(f, self.minute.map(u32::from), 2)?;
        write_field(f, self.second.map(u32::from), 2)?;
        let sign = if self.utc_offset < 0 { '-' } else { '+' };
        write!(f, ".{}{sign}{:03}", self.micros, self.utc_offset.unsigned_abs())
    }
}

impl fmt::Display for DateTimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_field(f, self.days, 8)?;
        write_field(f, self.hours.map(u32::from), 2)?;
        write_field(f, self.minutes.map(u32::from), 2)?;
        write_field(f, self.seconds.map(u32::from), 2)?;
        write!(f, ".{}:000", self.micros)
    }
}

impl fmt::Display for CimDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CimDateTime::Absolute(abs) => fmt::Display::fmt(abs, f),
            CimDateTime::Interval(interval) => fmt::Display::fmt(interval, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_timestamp() {
        let dt = CimDateTime::parse("20240131235959.123456-300").expect("absolute");
        let CimDateTime::Absolute(abs) = dt else {
            panic!("expected absolute, got {dt:?}");
        };
        assert_eq!(abs.year, Some(2024));
        assert_eq!(abs.month, Some(1));
        assert_eq!(abs.second, Some(59));
        assert_eq!(abs.micros.value, 123_456);
        assert_eq!(abs.utc_offset, -300);
        assert_eq!(dt.to_string(), "20240131235959.123456-300");
    }

    #[test]
    fn interval_with_truncated_micros() {
        let dt = CimDateTime::parse("00000001020304.12****:000").expect("interval");
        let CimDateTime::Interval(interval) = dt else {
            panic!("expected interval, got {dt:?}");
        };
        assert_eq!(interval.days, Some(1));
        assert_eq!(interval.hours, Some(2));
        assert_eq!(interval.micros.value, 120_000);
        assert_eq!(interval.micros.precision, 2);
        assert_eq!(dt.to_string(), "00000001020304.12****:000");
    }

    #[test]
    fn wildcard_fields() {
        let dt = CimDateTime::parse("2024****000000.000000+000").expect("wildcards");
        let CimDateTime::Absolute(abs) = dt else {
            panic!("expected absolute");
        };
        assert_eq!(abs.month, None);
        assert_eq!(abs.day, None);
        assert_eq!(dt.to_string(), "2024****000000.000000+000");
    }

    #[test]
    fn failure_reports_both_grammars() {
        let err = CimDateTime::parse("20241301000000.000000+000").unwrap_err();
        let ValueError::DateTime {
            absolute, interval, ..
        } = err
        else {
            panic!("expected datetime error");
        };
        assert!(absolute.contains("month"), "{absolute}");
        assert!(interval.contains(":000"), "{interval}");
    }
}
