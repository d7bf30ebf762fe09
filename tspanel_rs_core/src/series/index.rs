//! # series/index
//!
//! regular time axes: an ordinal step sequence or a calendar grid, both stored as
//! `(start, step, len)` so that the frequency is always consistent with the spacing

use super::period::Period;
use crate::error::{bail, ensure, PanelError, Result};
use chrono::NaiveDateTime;
use std::{fmt, ops::Range, str::FromStr};

/// A single point on a time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeKey {
    Ordinal(i64),
    Calendar(NaiveDateTime),
}

/// The fixed spacing of a time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    /// step size of an ordinal axis, always `>= 1`
    Ordinal(i64),
    Calendar(Period),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Ordinal,
    Calendar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeIndex {
    Ordinal {
        start: i64,
        step: i64,
        len: usize,
    },
    Calendar {
        start: NaiveDateTime,
        period: Period,
        len: usize,
    },
}

impl TimeKey {
    pub fn kind(&self) -> AxisKind {
        match self {
            TimeKey::Ordinal(_) => AxisKind::Ordinal,
            TimeKey::Calendar(_) => AxisKind::Calendar,
        }
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKey::Ordinal(v) => write!(f, "{v}"),
            TimeKey::Calendar(t) => write!(f, "{t}"),
        }
    }
}

impl Frequency {
    pub fn kind(&self) -> AxisKind {
        match self {
            Frequency::Ordinal(_) => AxisKind::Ordinal,
            Frequency::Calendar(_) => AxisKind::Calendar,
        }
    }
}

impl FromStr for Frequency {
    type Err = PanelError;

    /// integer strings are ordinal steps, anything else is a calendar period code
    fn from_str(text: &str) -> Result<Self> {
        match text.trim().parse::<i64>() {
            Ok(step) => {
                ensure!(step >= 1, Value, "ordinal step should be >= 1, got {step}");
                Ok(Frequency::Ordinal(step))
            }
            Err(_) => Ok(Frequency::Calendar(text.parse()?)),
        }
    }
}

impl From<Period> for Frequency {
    fn from(period: Period) -> Self {
        Frequency::Calendar(period)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Ordinal(step) => write!(f, "{step}"),
            Frequency::Calendar(period) => write!(f, "{period}"),
        }
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisKind::Ordinal => write!(f, "ordinal"),
            AxisKind::Calendar => write!(f, "calendar"),
        }
    }
}

impl TimeIndex {
    pub fn ordinal(start: i64, step: i64, len: usize) -> Result<Self> {
        ensure!(step >= 1, Schema, "ordinal step should be >= 1, got {step}");
        let index = TimeIndex::Ordinal { start, step, len };
        ensure!(
            len == 0 || index.key_at(len - 1).is_some(),
            Schema,
            "ordinal axis overflows i64"
        );
        Ok(index)
    }

    pub fn calendar(start: NaiveDateTime, period: Period, len: usize) -> Result<Self> {
        period.validate()?;
        let index = TimeIndex::Calendar { start, period, len };
        ensure!(
            len == 0 || index.key_at(len - 1).is_some(),
            Schema,
            "calendar axis overflows the supported time range"
        );
        Ok(index)
    }

    /// an axis of `len` points starting at `start` and spaced by `freq`
    pub fn from_start(start: TimeKey, freq: Frequency, len: usize) -> Result<Self> {
        match (start, freq) {
            (TimeKey::Ordinal(start), Frequency::Ordinal(step)) => Self::ordinal(start, step, len),
            (TimeKey::Calendar(start), Frequency::Calendar(period)) => {
                Self::calendar(start, period, len)
            }
            (start, freq) => bail!(
                Schema,
                "{} start point cannot carry a {} frequency",
                start.kind(),
                freq.kind()
            ),
        }
    }

    /// The smallest regular axis with frequency `freq` that covers every key.
    ///
    /// Keys must be of the axis kind and must all lie on one grid.
    pub fn spanning(keys: &[TimeKey], freq: Frequency) -> Result<Self> {
        let (Some(&first), Some(&last)) = (keys.iter().min(), keys.iter().max()) else {
            bail!(Value, "cannot build a time axis from zero points");
        };
        for key in keys {
            ensure!(
                key.kind() == freq.kind(),
                Value,
                "time point {key} does not match the {} axis",
                freq.kind()
            );
        }
        let len = match Self::from_start(first, freq, 1)?.steps_to(&last) {
            Some(steps) => steps + 1,
            None => bail!(
                Value,
                "time points {first} and {last} are not aligned to freq `{freq}`"
            ),
        };
        let index = Self::from_start(first, freq, len)?;
        for key in keys {
            ensure!(
                index.position(key).is_some(),
                Value,
                "time point {key} is not aligned to freq `{freq}`"
            );
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        match self {
            TimeIndex::Ordinal { len, .. } | TimeIndex::Calendar { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> AxisKind {
        match self {
            TimeIndex::Ordinal { .. } => AxisKind::Ordinal,
            TimeIndex::Calendar { .. } => AxisKind::Calendar,
        }
    }

    pub fn freq(&self) -> Frequency {
        match self {
            TimeIndex::Ordinal { step, .. } => Frequency::Ordinal(*step),
            TimeIndex::Calendar { period, .. } => Frequency::Calendar(*period),
        }
    }

    fn grid_point(&self, k: usize) -> Option<TimeKey> {
        match self {
            TimeIndex::Ordinal { start, step, .. } => {
                let offset = step.checked_mul(i64::try_from(k).ok()?)?;
                start.checked_add(offset).map(TimeKey::Ordinal)
            }
            TimeIndex::Calendar { start, period, .. } => {
                period.advance(*start, k).map(TimeKey::Calendar)
            }
        }
    }

    /// number of whole steps from the origin to `key`, ignoring the axis length
    fn steps_to(&self, key: &TimeKey) -> Option<usize> {
        match (self, key) {
            (TimeIndex::Ordinal { start, step, .. }, TimeKey::Ordinal(v)) => {
                let diff = v.checked_sub(*start)?;
                if diff < 0 || diff % step != 0 {
                    return None;
                }
                usize::try_from(diff / step).ok()
            }
            (TimeIndex::Calendar { start, period, .. }, TimeKey::Calendar(t)) => {
                period.steps_between(*start, *t)
            }
            _ => None,
        }
    }

    pub fn key_at(&self, i: usize) -> Option<TimeKey> {
        if i >= self.len() {
            return None;
        }
        self.grid_point(i)
    }

    pub fn start(&self) -> Option<TimeKey> {
        self.key_at(0)
    }

    pub fn end(&self) -> Option<TimeKey> {
        self.len().checked_sub(1).and_then(|i| self.key_at(i))
    }

    pub fn keys(&self) -> Vec<TimeKey> {
        (0..self.len()).filter_map(|i| self.grid_point(i)).collect()
    }

    /// exact position of `key` on the axis
    pub fn position(&self, key: &TimeKey) -> Option<usize> {
        self.steps_to(key).filter(|&k| k < self.len())
    }

    /// number of axis points strictly before `key`
    pub fn lower_bound(&self, key: &TimeKey) -> usize {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.grid_point(mid) {
                Some(point) if point < *key => lo = mid + 1,
                _ => hi = mid,
            }
        }
        lo
    }

    /// the sub-axis of the (clamped) positional `range`
    pub fn slice(&self, range: Range<usize>) -> TimeIndex {
        let start = range.start.min(self.len());
        let end = range.end.clamp(start, self.len());
        let len = end - start;
        match (self, self.grid_point(start)) {
            (TimeIndex::Ordinal { step, .. }, Some(TimeKey::Ordinal(origin))) => {
                TimeIndex::Ordinal {
                    start: origin,
                    step: *step,
                    len,
                }
            }
            (TimeIndex::Calendar { period, .. }, Some(TimeKey::Calendar(origin))) => {
                TimeIndex::Calendar {
                    start: origin,
                    period: *period,
                    len,
                }
            }
            _ => self.with_len(0),
        }
    }

    pub fn with_len(&self, len: usize) -> TimeIndex {
        match self {
            TimeIndex::Ordinal { start, step, .. } => TimeIndex::Ordinal {
                start: *start,
                step: *step,
                len,
            },
            TimeIndex::Calendar { start, period, .. } => TimeIndex::Calendar {
                start: *start,
                period: *period,
                len,
            },
        }
    }
}
