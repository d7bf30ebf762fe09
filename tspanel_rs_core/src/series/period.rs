//! # series/period
//!
//! sampling periods of calendar axes, expressed with pandas-style period codes
//! (e.g. `"D"`, `"15min"`, `"2H"`, `"MS"`)

use crate::error::{bail, ensure, PanelError, Result};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use std::{fmt, str::FromStr};

pub const NANOS_PER_MICRO: i64 = 1_000;
pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
pub const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
pub const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
pub const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;
pub const NANOS_PER_WEEK: i64 = 7 * NANOS_PER_DAY;

const FIXED_UNITS: [(&str, i64); 8] = [
    ("W", NANOS_PER_WEEK),
    ("D", NANOS_PER_DAY),
    ("H", NANOS_PER_HOUR),
    ("T", NANOS_PER_MINUTE),
    ("S", NANOS_PER_SECOND),
    ("L", NANOS_PER_MILLI),
    ("U", NANOS_PER_MICRO),
    ("N", 1),
];

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// The fixed spacing of a calendar axis.
///
/// `Fixed` periods are compared by their duration, so `"24H"` and `"D"` are the same period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// a fixed duration in nanoseconds, always positive
    Fixed(i64),
    /// every `n` months, anchored on the first day of the month
    MonthStart(u32),
    /// every `n` months, anchored on the last day of the month
    MonthEnd(u32),
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

fn month_ordinal(t: &NaiveDateTime) -> i64 {
    t.year() as i64 * 12 + t.month0() as i64
}

impl Period {
    pub fn fixed(nanos: i64) -> Result<Self> {
        ensure!(nanos > 0, Value, "period must be positive, got {nanos}ns");
        Ok(Period::Fixed(nanos))
    }

    /// fails with `SchemaError` unless the spacing is positive
    pub fn validate(&self) -> Result<()> {
        let positive = match *self {
            Period::Fixed(nanos) => nanos > 0,
            Period::MonthStart(n) | Period::MonthEnd(n) => n > 0,
        };
        ensure!(positive, Schema, "period `{self}` should be positive");
        Ok(())
    }

    /// the `k`-th grid point after `start`, `None` on overflow
    pub fn advance(&self, start: NaiveDateTime, k: usize) -> Option<NaiveDateTime> {
        match *self {
            Period::Fixed(nanos) => {
                let offset = nanos.checked_mul(i64::try_from(k).ok()?)?;
                start.checked_add_signed(Duration::nanoseconds(offset))
            }
            Period::MonthStart(n) => {
                let months = u32::try_from(n as u64 * k as u64).ok()?;
                start.checked_add_months(Months::new(months))
            }
            Period::MonthEnd(n) => {
                let months = u32::try_from(n as u64 * k as u64).ok()?;
                let first = start.date().with_day(1)?;
                let target = month_end(first.checked_add_months(Months::new(months))?)?;
                Some(target.and_time(start.time()))
            }
        }
    }

    /// whether `t` is exactly `start` advanced by a whole number of periods,
    /// returning that number
    pub fn steps_between(&self, start: NaiveDateTime, t: NaiveDateTime) -> Option<usize> {
        if t < start {
            return None;
        }
        let k = match *self {
            Period::Fixed(nanos) => {
                let diff = (t - start).num_nanoseconds()?;
                if nanos <= 0 || diff % nanos != 0 {
                    return None;
                }
                diff / nanos
            }
            Period::MonthStart(n) | Period::MonthEnd(n) => {
                let diff = month_ordinal(&t) - month_ordinal(&start);
                if n == 0 || diff % n as i64 != 0 {
                    return None;
                }
                diff / n as i64
            }
        };
        let k = usize::try_from(k).ok()?;
        (self.advance(start, k)? == t).then_some(k)
    }

    /// Infer the period of ascending, de-duplicated timestamps.
    ///
    /// Month-anchored periods are tried first, then a single fixed spacing. Returns `None`
    /// when fewer than two points are given or the spacing is irregular.
    pub fn infer(sorted: &[NaiveDateTime]) -> Option<Self> {
        if sorted.len() < 2 {
            return None;
        }
        let same_time = sorted.iter().all(|t| t.time() == sorted[0].time());
        let month_diffs: Vec<i64> = sorted
            .windows(2)
            .map(|w| month_ordinal(&w[1]) - month_ordinal(&w[0]))
            .collect();
        let month_step = month_diffs[0];
        if same_time && month_step > 0 && month_diffs.iter().all(|&d| d == month_step) {
            let step = u32::try_from(month_step).ok()?;
            if sorted.iter().all(|t| t.day() == 1) {
                return Some(Period::MonthStart(step));
            }
            if sorted
                .iter()
                .all(|t| month_end(t.date()) == Some(t.date()))
            {
                return Some(Period::MonthEnd(step));
            }
        }
        let first = (sorted[1] - sorted[0]).num_nanoseconds()?;
        if first <= 0 {
            return None;
        }
        for w in sorted.windows(2) {
            if (w[1] - w[0]).num_nanoseconds() != Some(first) {
                return None;
            }
        }
        Some(Period::Fixed(first))
    }

}

impl FromStr for Period {
    type Err = PanelError;

    fn from_str(code: &str) -> Result<Self> {
        let code = code.trim();
        let split = code
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(code.len());
        let (multiplier, unit) = code.split_at(split);
        let multiplier: i64 = if multiplier.is_empty() {
            1
        } else {
            match multiplier.parse() {
                Ok(n) => n,
                Err(_) => bail!(Value, "invalid freq: {code}"),
            }
        };
        ensure!(multiplier >= 1, Value, "invalid freq: {code}");
        let unit_nanos = match unit {
            "N" | "ns" => 1,
            "U" | "us" => NANOS_PER_MICRO,
            "L" | "ms" => NANOS_PER_MILLI,
            "S" | "s" => NANOS_PER_SECOND,
            "T" | "min" => NANOS_PER_MINUTE,
            "H" | "h" => NANOS_PER_HOUR,
            "D" => NANOS_PER_DAY,
            "W" => NANOS_PER_WEEK,
            "MS" | "M" | "ME" => {
                let months = match u32::try_from(multiplier) {
                    Ok(n) => n,
                    Err(_) => bail!(Value, "invalid freq: {code}"),
                };
                return Ok(if unit == "MS" {
                    Period::MonthStart(months)
                } else {
                    Period::MonthEnd(months)
                });
            }
            _ => bail!(Value, "invalid freq: {code}"),
        };
        match multiplier.checked_mul(unit_nanos) {
            Some(nanos) => Period::fixed(nanos),
            None => bail!(Value, "invalid freq: {code}"),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n, unit) = match *self {
            Period::Fixed(nanos) => {
                let (unit, size) = FIXED_UNITS
                    .iter()
                    .find(|(_, size)| nanos % size == 0)
                    .copied()
                    .unwrap_or(("N", 1));
                (nanos / size, unit)
            }
            Period::MonthStart(n) => (n as i64, "MS"),
            Period::MonthEnd(n) => (n as i64, "M"),
        };
        if n == 1 {
            write!(f, "{unit}")
        } else {
            write!(f, "{n}{unit}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn ts(text: &str) -> NaiveDateTime {
        parse_timestamp(text).unwrap()
    }

    #[test]
    fn test_parse_codes() {
        assert_eq!("D".parse::<Period>().unwrap(), Period::Fixed(NANOS_PER_DAY));
        assert_eq!(
            "24H".parse::<Period>().unwrap(),
            "D".parse::<Period>().unwrap()
        );
        assert_eq!(
            "15min".parse::<Period>().unwrap(),
            Period::Fixed(15 * NANOS_PER_MINUTE)
        );
        assert_eq!("MS".parse::<Period>().unwrap(), Period::MonthStart(1));
        assert_eq!("3M".parse::<Period>().unwrap(), Period::MonthEnd(3));
        assert!("0D".parse::<Period>().unwrap_err().is_value());
        assert!("fortnight".parse::<Period>().is_err());
        assert!("0MS".parse::<Period>().is_err());
        assert!(Period::fixed(-1).unwrap_err().is_value());
    }

    #[test]
    fn test_validate() {
        assert!(Period::Fixed(NANOS_PER_DAY).validate().is_ok());
        for period in [Period::Fixed(0), Period::MonthStart(0), Period::MonthEnd(0)] {
            assert!(period.validate().unwrap_err().is_schema());
        }
        let start = ts("2023-01-01");
        assert_eq!(Period::Fixed(0).steps_between(start, ts("2023-01-02")), None);
        assert_eq!(Period::MonthStart(0).steps_between(start, ts("2023-02-01")), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Period::Fixed(NANOS_PER_DAY).to_string(), "D");
        assert_eq!(Period::Fixed(2 * NANOS_PER_HOUR).to_string(), "2H");
        assert_eq!(Period::Fixed(90 * NANOS_PER_MINUTE).to_string(), "90T");
        assert_eq!(Period::Fixed(NANOS_PER_WEEK).to_string(), "W");
        assert_eq!(Period::MonthStart(1).to_string(), "MS");
        assert_eq!(Period::MonthEnd(2).to_string(), "2M");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            ts("2023-01-02"),
            NaiveDate::from_ymd_opt(2023, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(ts("2023-01-02 03:04:05").hour(), 3);
        assert_eq!(ts("2023-01-02T03:04").minute(), 4);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_advance_and_steps() {
        let day = Period::Fixed(NANOS_PER_DAY);
        let start = ts("2023-01-30");
        assert_eq!(day.advance(start, 3), Some(ts("2023-02-02")));
        assert_eq!(day.steps_between(start, ts("2023-02-02")), Some(3));
        assert_eq!(day.steps_between(start, ts("2023-02-02 12:00:00")), None);
        assert_eq!(day.steps_between(start, ts("2023-01-01")), None);

        let month_end = Period::MonthEnd(1);
        let start = ts("2023-01-31");
        assert_eq!(month_end.advance(start, 1), Some(ts("2023-02-28")));
        assert_eq!(month_end.advance(start, 2), Some(ts("2023-03-31")));
        assert_eq!(month_end.steps_between(start, ts("2023-04-30")), Some(3));
        assert_eq!(month_end.steps_between(start, ts("2023-04-29")), None);

        let month_start = Period::MonthStart(2);
        let start = ts("2023-01-01");
        assert_eq!(month_start.advance(start, 2), Some(ts("2023-05-01")));
        assert_eq!(month_start.steps_between(start, ts("2023-02-01")), None);
    }

    #[test]
    fn test_infer() {
        let hourly: Vec<_> = ["2023-01-01 00:00", "2023-01-01 01:00", "2023-01-01 02:00"]
            .iter()
            .map(|t| ts(t))
            .collect();
        assert_eq!(Period::infer(&hourly), Some(Period::Fixed(NANOS_PER_HOUR)));

        let monthly: Vec<_> = ["2023-01-01", "2023-02-01", "2023-03-01"]
            .iter()
            .map(|t| ts(t))
            .collect();
        assert_eq!(Period::infer(&monthly), Some(Period::MonthStart(1)));

        let month_ends: Vec<_> = ["2023-01-31", "2023-03-31", "2023-05-31"]
            .iter()
            .map(|t| ts(t))
            .collect();
        assert_eq!(Period::infer(&month_ends), Some(Period::MonthEnd(2)));

        let irregular: Vec<_> = ["2023-01-01", "2023-01-02", "2023-01-04"]
            .iter()
            .map(|t| ts(t))
            .collect();
        assert_eq!(Period::infer(&irregular), None);
        assert_eq!(Period::infer(&irregular[..1]), None);
    }
}
