use super::RegularSeries;
use crate::{
    error::{bail, ensure, Result},
    series::{
        index::{AxisKind, TimeIndex, TimeKey},
        period::parse_timestamp,
        SliceKey, TimePoint,
    },
};
use std::ops::Range;

impl RegularSeries {
    fn resolve_key(&self, key: TimeKey, prefer_after: bool) -> Result<usize> {
        let kind = self.index.kind();
        ensure!(
            key.kind() == kind,
            Value,
            "{} point {key} cannot index a {kind} axis",
            key.kind()
        );
        let (Some(start), Some(end)) = (self.index.start(), self.index.end()) else {
            bail!(Value, "cannot resolve {key} on an empty series");
        };
        ensure!(
            start <= key && key <= end,
            Value,
            "{key} is out of the range [{start}, {end}]"
        );
        if let Some(position) = self.index.position(&key) {
            return Ok(position);
        }
        let later = self.index.lower_bound(&key);
        Ok(if prefer_after { later } else { later - 1 })
    }

    /// Resolve `point` to a row position.
    ///
    /// Timestamps and labels between two axis points resolve to the nearest later point when
    /// `prefer_after` is set, to the nearest earlier one otherwise.
    pub fn index_at(&self, point: &TimePoint, prefer_after: bool) -> Result<usize> {
        let len = self.len();
        ensure!(len > 0, Value, "cannot resolve a time point on an empty series");
        match point {
            TimePoint::Fraction(p) => {
                ensure!(
                    (0.0..=1.0).contains(p),
                    Value,
                    "fraction should be in [0, 1], got {p}"
                );
                Ok((((len - 1) as f64) * p).floor() as usize)
            }
            TimePoint::Position(i) => match usize::try_from(*i) {
                Ok(i) if i < len => Ok(i),
                _ => bail!(Value, "position {i} is out of the range [0, {len})"),
            },
            TimePoint::Timestamp(t) => self.resolve_key(TimeKey::Calendar(*t), prefer_after),
            TimePoint::Text(text) => match parse_timestamp(text) {
                Some(t) => self.resolve_key(TimeKey::Calendar(t), prefer_after),
                None => bail!(Value, "`{text}` is not a valid timestamp"),
            },
            TimePoint::Label(v) => self.resolve_key(TimeKey::Ordinal(*v), prefer_after),
        }
    }

    pub(crate) fn slice_rows(&self, range: Range<usize>) -> RegularSeries {
        let index = self.index.slice(range.clone());
        let start = range.start.min(self.len());
        let rows = start..start + index.len();
        RegularSeries {
            values: self.values.iter().map(|c| c.slice(rows.clone())).collect(),
            columns: self.columns.clone(),
            index,
        }
    }

    /// Split into the rows before and after `point`.
    ///
    /// A `Position` point starts the right half, any other point ends the left half.
    pub fn split(
        &self,
        point: &TimePoint,
        prefer_after: bool,
    ) -> Result<(RegularSeries, RegularSeries)> {
        let i = self.index_at(point, prefer_after)?;
        let shift = match point {
            TimePoint::Position(_) => 0,
            _ => 1,
        };
        let cut = (i + shift).min(self.len());
        log::debug!("splitting {} rows at row {cut}", self.len());
        Ok((self.slice_rows(0..cut), self.slice_rows(cut..self.len())))
    }

    /// Select rows by position range or by a regular sub-axis whose points must all exist.
    pub fn slice(&self, key: &SliceKey) -> Result<RegularSeries> {
        let target = match key {
            SliceKey::Positions(range) => return Ok(self.slice_rows(range.clone())),
            SliceKey::Calendar { start, period, len } => {
                ensure!(
                    self.index.kind() == AxisKind::Calendar,
                    Value,
                    "a calendar slice cannot index an ordinal axis"
                );
                TimeIndex::calendar(*start, *period, *len)?
            }
            SliceKey::Ordinal { start, step, len } => {
                ensure!(
                    self.index.kind() == AxisKind::Ordinal,
                    Value,
                    "an ordinal slice cannot index a calendar axis"
                );
                TimeIndex::ordinal(*start, *step, *len)?
            }
        };
        let rows = target
            .keys()
            .iter()
            .map(|key| match self.index.position(key) {
                Some(position) => Ok(position),
                None => bail!(Value, "time point {key} does not exist"),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RegularSeries {
            values: self.values.iter().map(|c| c.take(&rows)).collect(),
            columns: self.columns.clone(),
            index: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{
        column::Column,
        period::Period,
        tests::{daily_series, ordinal_series},
    };

    fn ts(text: &str) -> TimePoint {
        TimePoint::Timestamp(parse_timestamp(text).unwrap())
    }

    #[test]
    fn test_index_at_fraction_and_position() {
        let series = ordinal_series(0, 1, &[("a", vec![0.0, 1.0, 2.0, 3.0, 4.0])]);
        assert_eq!(series.index_at(&TimePoint::Fraction(0.0), true).unwrap(), 0);
        assert_eq!(series.index_at(&TimePoint::Fraction(1.0), true).unwrap(), 4);
        assert_eq!(series.index_at(&TimePoint::Fraction(0.6), true).unwrap(), 2);
        assert!(series
            .index_at(&TimePoint::Fraction(1.5), true)
            .unwrap_err()
            .is_value());
        assert_eq!(series.index_at(&TimePoint::Position(3), true).unwrap(), 3);
        assert!(series
            .index_at(&TimePoint::Position(5), true)
            .unwrap_err()
            .is_value());
        assert!(series
            .index_at(&TimePoint::Position(-1), true)
            .unwrap_err()
            .is_value());
        let empty = ordinal_series(0, 1, &[]);
        assert!(empty
            .index_at(&TimePoint::Fraction(0.0), true)
            .unwrap_err()
            .is_value());
    }

    #[test]
    fn test_index_at_timestamps() {
        let hourly = RegularSeries::new(
            TimeIndex::calendar(
                parse_timestamp("2023-01-01").unwrap(),
                "2H".parse().unwrap(),
                4,
            )
            .unwrap(),
            vec!["a".to_string()],
            vec![Column::from_i64(vec![0, 1, 2, 3])],
        )
        .unwrap();
        for prefer_after in [true, false] {
            assert_eq!(
                hourly.index_at(&ts("2023-01-01 04:00:00"), prefer_after).unwrap(),
                2
            );
        }
        let between = ts("2023-01-01 03:00:00");
        assert_eq!(hourly.index_at(&between, true).unwrap(), 2);
        assert_eq!(hourly.index_at(&between, false).unwrap(), 1);
        let text = TimePoint::Text("2023-01-01 01:00:00".to_string());
        assert_eq!(hourly.index_at(&text, true).unwrap(), 1);
        assert!(hourly.index_at(&ts("2023-01-02"), true).unwrap_err().is_value());
        assert!(hourly
            .index_at(&TimePoint::Text("soon".to_string()), true)
            .unwrap_err()
            .is_value());
        assert!(hourly
            .index_at(&TimePoint::Label(1), true)
            .unwrap_err()
            .is_value());

        let ordinal = ordinal_series(0, 10, &[("a", vec![0.0, 1.0, 2.0])]);
        assert_eq!(ordinal.index_at(&TimePoint::Label(15), false).unwrap(), 1);
        assert!(ordinal.index_at(&ts("2023-01-01"), true).unwrap_err().is_value());
    }

    #[test]
    fn test_split() {
        let series = daily_series("2023-01-01", &[("a", vec![0.0, 1.0, 2.0, 3.0])]);
        let (left, right) = series.split(&TimePoint::Position(1), true).unwrap();
        assert_eq!((left.len(), right.len()), (1, 3));
        let (left, right) = series.split(&ts("2023-01-02"), true).unwrap();
        assert_eq!((left.len(), right.len()), (2, 2));
        assert_eq!(right.column("a"), Some(&Column::from_f64(vec![2.0, 3.0])));
        assert_eq!(left.freq(), right.freq());
        let (left, right) = series.split(&TimePoint::Fraction(1.0), true).unwrap();
        assert_eq!((left.len(), right.len()), (4, 0));
    }

    #[test]
    fn test_slice() {
        let series = daily_series("2023-01-01", &[("a", vec![0.0, 1.0, 2.0, 3.0, 4.0])]);
        let every_other = series
            .slice(&SliceKey::Calendar {
                start: parse_timestamp("2023-01-02").unwrap(),
                period: "2D".parse::<Period>().unwrap(),
                len: 2,
            })
            .unwrap();
        assert_eq!(every_other.column("a"), Some(&Column::from_f64(vec![1.0, 3.0])));
        assert_eq!(every_other.freq().to_string(), "2D");
        assert!(series
            .slice(&SliceKey::Calendar {
                start: parse_timestamp("2023-01-04").unwrap(),
                period: "D".parse::<Period>().unwrap(),
                len: 3,
            })
            .unwrap_err()
            .is_value());
        assert!(series
            .slice(&SliceKey::Ordinal {
                start: 0,
                step: 1,
                len: 1
            })
            .unwrap_err()
            .is_value());
        let tail = series.slice(&SliceKey::Positions(3..10)).unwrap();
        assert_eq!(tail.column("a"), Some(&Column::from_f64(vec![3.0, 4.0])));
        assert_eq!(tail.freq(), series.freq());
    }
}
