//! # series
//!
//! a single regularly sampled multivariate time series

use crate::error::{bail, PanelError, Result};
use chrono::NaiveDateTime;
use std::ops::Range;

pub mod column;
pub mod frame;
pub mod index;
pub mod period;

pub use column::{CastSpec, Column, Dtype, Scalar};
pub use frame::RegularSeries;
pub use index::{AxisKind, Frequency, TimeIndex, TimeKey};
pub use period::Period;

/// A point on (or near) a time axis, resolved by [`RegularSeries::index_at`].
#[derive(Debug, Clone, PartialEq)]
pub enum TimePoint {
    /// relative location in `[0.0, 1.0]`
    Fraction(f64),
    /// absolute row position
    Position(i64),
    Timestamp(NaiveDateTime),
    /// a timestamp to be parsed
    Text(String),
    /// a value of an ordinal axis
    Label(i64),
}

/// Row selections of [`RegularSeries::slice`].
#[derive(Debug, Clone, PartialEq)]
pub enum SliceKey {
    /// `len` calendar points from `start`, spaced by `period`
    Calendar {
        start: NaiveDateTime,
        period: Period,
        len: usize,
    },
    /// `len` ordinal values from `start`, spaced by `step`
    Ordinal { start: i64, step: i64, len: usize },
    /// positional rows, clamped to the series
    Positions(Range<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatAxis {
    Time,
    Columns,
}

/// Values keyed by time points, to be aligned onto another axis.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedColumn {
    keys: Vec<TimeKey>,
    values: Column,
}

impl From<TimeKey> for TimePoint {
    fn from(key: TimeKey) -> Self {
        match key {
            TimeKey::Ordinal(v) => TimePoint::Label(v),
            TimeKey::Calendar(t) => TimePoint::Timestamp(t),
        }
    }
}

impl TryFrom<Scalar> for TimePoint {
    type Error = PanelError;

    fn try_from(value: Scalar) -> Result<Self> {
        Ok(match value {
            Scalar::Int(i) => TimePoint::Position(i),
            Scalar::Float(p) if p.is_finite() => TimePoint::Fraction(p),
            Scalar::Str(text) => TimePoint::Text(text),
            other => bail!(Type, "`{other}` cannot be interpreted as a time point"),
        })
    }
}

impl TryFrom<usize> for ConcatAxis {
    type Error = PanelError;

    fn try_from(axis: usize) -> Result<Self> {
        Ok(match axis {
            0 => ConcatAxis::Time,
            1 => ConcatAxis::Columns,
            _ => bail!(Value, "concat axis should be 0 or 1, got {axis}"),
        })
    }
}

impl IndexedColumn {
    pub fn new(keys: Vec<TimeKey>, values: Column) -> Result<Self> {
        if keys.len() != values.len() {
            bail!(
                Value,
                "{} time points given for {} values",
                keys.len(),
                values.len()
            );
        }
        Ok(Self { keys, values })
    }

    pub fn keys(&self) -> &[TimeKey] {
        &self.keys
    }

    pub fn values(&self) -> &Column {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
