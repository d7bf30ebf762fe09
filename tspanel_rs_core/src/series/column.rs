//! # series/column
//!
//! typed column storage backed by [`ndarray`], with missing-value aware take / concat / cast

use crate::error::{bail, ensure, PanelError, Result};
use ndarray::{concatenate, s, Array1, ArrayView1, Axis};
use std::{collections::BTreeMap, fmt, ops::Range, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    Float64,
    Float32,
    Int64,
    Bool,
    Utf8,
}

/// A single cell / static covariate value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

/// Column storage. Float columns mark missing cells with `NaN`, `Utf8` columns with `None`;
/// `Int64` and `Bool` columns cannot hold missing cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float64(Array1<f64>),
    Float32(Array1<f32>),
    Int64(Array1<i64>),
    Bool(Array1<bool>),
    Utf8(Array1<Option<String>>),
}

/// Target dtypes of a bulk cast.
#[derive(Debug, Clone, PartialEq)]
pub enum CastSpec {
    All(Dtype),
    PerColumn(BTreeMap<String, Dtype>),
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dtype::Float64 => "float64",
            Dtype::Float32 => "float32",
            Dtype::Int64 => "int64",
            Dtype::Bool => "bool",
            Dtype::Utf8 => "utf8",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Dtype {
    type Err = PanelError;

    fn from_str(name: &str) -> Result<Self> {
        Ok(match name {
            "float64" | "float" | "f64" => Dtype::Float64,
            "float32" | "f32" => Dtype::Float32,
            "int64" | "int" | "i64" => Dtype::Int64,
            "bool" => Dtype::Bool,
            "utf8" | "str" | "string" | "object" => Dtype::Utf8,
            _ => bail!(Type, "unknown dtype `{name}`"),
        })
    }
}

impl Dtype {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Dtype::Utf8)
    }

    /// the dtype able to hold values of both `self` and `other`
    pub fn common(self, other: Dtype) -> Result<Dtype> {
        use Dtype::*;
        Ok(match (self, other) {
            (a, b) if a == b => a,
            (Utf8, b) | (b, Utf8) => bail!(Type, "cannot combine utf8 with {b} values"),
            (Float32, Bool) | (Bool, Float32) => Float32,
            _ => Float64,
        })
    }

    /// the dtype after missing cells are introduced
    pub fn nullable(self) -> Dtype {
        match self {
            Dtype::Int64 | Dtype::Bool => Dtype::Float64,
            other => other,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}
impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}
impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}
impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl Scalar {
    pub fn dtype(&self) -> Dtype {
        match self {
            Scalar::Int(_) => Dtype::Int64,
            Scalar::Float(_) => Dtype::Float64,
            Scalar::Str(_) => Dtype::Utf8,
        }
    }
}

macro_rules! dispatch {
    ($column:expr, $array:ident => $body:expr) => {
        match $column {
            Column::Float64($array) => Column::Float64($body),
            Column::Float32($array) => Column::Float32($body),
            Column::Int64($array) => Column::Int64($body),
            Column::Bool($array) => Column::Bool($body),
            Column::Utf8($array) => Column::Utf8($body),
        }
    };
}

fn take_nullable<T: Clone>(
    array: ArrayView1<T>,
    indices: &[Option<usize>],
    missing: T,
) -> Array1<T> {
    indices
        .iter()
        .map(|i| match i {
            Some(i) => array[*i].clone(),
            None => missing.clone(),
        })
        .collect()
}

fn parse_cell<T: FromStr>(cell: &Option<String>, dtype: Dtype) -> Result<T> {
    match cell {
        Some(text) => match text.trim().parse() {
            Ok(v) => Ok(v),
            Err(_) => bail!(Type, "cannot cast `{text}` to {dtype}"),
        },
        None => bail!(Type, "cannot cast missing values to {dtype}"),
    }
}

fn float_to_int(v: f64) -> Result<i64> {
    ensure!(
        v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64,
        Type,
        "cannot cast non-finite or out-of-range value {v} to int64"
    );
    Ok(v.trunc() as i64)
}

impl Column {
    pub fn from_f64(values: Vec<f64>) -> Self {
        Column::Float64(Array1::from_vec(values))
    }
    pub fn from_f32(values: Vec<f32>) -> Self {
        Column::Float32(Array1::from_vec(values))
    }
    pub fn from_i64(values: Vec<i64>) -> Self {
        Column::Int64(Array1::from_vec(values))
    }
    pub fn from_bool(values: Vec<bool>) -> Self {
        Column::Bool(Array1::from_vec(values))
    }
    pub fn from_strs<S: AsRef<str>>(values: &[S]) -> Self {
        Column::Utf8(values.iter().map(|v| Some(v.as_ref().to_string())).collect())
    }

    /// a column of `len` missing cells
    pub fn missing(dtype: Dtype, len: usize) -> Self {
        match dtype.nullable() {
            Dtype::Float32 => Column::Float32(Array1::from_elem(len, f32::NAN)),
            Dtype::Utf8 => Column::Utf8(Array1::from_elem(len, None)),
            _ => Column::Float64(Array1::from_elem(len, f64::NAN)),
        }
    }

    /// `scalar` repeated `len` times
    pub fn full(scalar: &Scalar, len: usize) -> Self {
        match scalar {
            Scalar::Int(v) => Column::Int64(Array1::from_elem(len, *v)),
            Scalar::Float(v) => Column::Float64(Array1::from_elem(len, *v)),
            Scalar::Str(v) => Column::Utf8(Array1::from_elem(len, Some(v.clone()))),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Float64(a) => a.len(),
            Column::Float32(a) => a.len(),
            Column::Int64(a) => a.len(),
            Column::Bool(a) => a.len(),
            Column::Utf8(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            Column::Float64(_) => Dtype::Float64,
            Column::Float32(_) => Dtype::Float32,
            Column::Int64(_) => Dtype::Int64,
            Column::Bool(_) => Dtype::Bool,
            Column::Utf8(_) => Dtype::Utf8,
        }
    }

    /// the cell at row `i`, `None` when missing or out of bounds
    pub fn get(&self, i: usize) -> Option<Scalar> {
        if i >= self.len() {
            return None;
        }
        match self {
            Column::Float64(a) => Some(a[i]).filter(|v| !v.is_nan()).map(Scalar::Float),
            Column::Float32(a) => Some(a[i])
                .filter(|v| !v.is_nan())
                .map(|v| Scalar::Float(v as f64)),
            Column::Int64(a) => Some(Scalar::Int(a[i])),
            Column::Bool(a) => Some(Scalar::Int(a[i] as i64)),
            Column::Utf8(a) => a[i].clone().map(Scalar::Str),
        }
    }

    pub fn is_missing(&self, i: usize) -> bool {
        match self {
            Column::Float64(a) => a[i].is_nan(),
            Column::Float32(a) => a[i].is_nan(),
            Column::Int64(_) | Column::Bool(_) => false,
            Column::Utf8(a) => a[i].is_none(),
        }
    }

    pub fn slice(&self, range: Range<usize>) -> Column {
        dispatch!(self, a => a.slice(s![range.start..range.end]).to_owned())
    }

    pub fn take(&self, indices: &[usize]) -> Column {
        dispatch!(self, a => a.select(Axis(0), indices))
    }

    /// Gather rows by position, `None` producing a missing cell.
    ///
    /// `Int64` / `Bool` columns are promoted to `Float64` when any cell is missing.
    pub fn take_nullable(&self, indices: &[Option<usize>]) -> Column {
        if indices.iter().all(Option::is_some) {
            let indices: Vec<usize> = indices.iter().flatten().copied().collect();
            return self.take(&indices);
        }
        match self {
            Column::Float64(a) => Column::Float64(take_nullable(a.view(), indices, f64::NAN)),
            Column::Float32(a) => Column::Float32(take_nullable(a.view(), indices, f32::NAN)),
            Column::Utf8(a) => Column::Utf8(take_nullable(a.view(), indices, None)),
            Column::Int64(_) | Column::Bool(_) => {
                log::debug!("promoting {} column to float64 to hold missing cells", self.dtype());
                let promoted = self.to_f64();
                Column::Float64(take_nullable(promoted.view(), indices, f64::NAN))
            }
        }
    }

    /// float64 view of a numeric column, missing cells as `NaN`, `Utf8` fails with `TypeError`
    pub fn try_to_f64(&self) -> Result<Array1<f64>> {
        ensure!(
            self.dtype().is_numeric(),
            Type,
            "{} column is not numeric",
            self.dtype()
        );
        Ok(self.to_f64())
    }

    fn to_f64(&self) -> Array1<f64> {
        match self {
            Column::Float64(a) => a.clone(),
            Column::Float32(a) => a.mapv(|v| v as f64),
            Column::Int64(a) => a.mapv(|v| v as f64),
            Column::Bool(a) => a.mapv(|v| if v { 1.0 } else { 0.0 }),
            Column::Utf8(a) => a.map(|v| {
                v.as_ref()
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(f64::NAN)
            }),
        }
    }

    /// Stack columns end to end, promoting to their common dtype.
    pub fn concat(columns: &[&Column]) -> Result<Column> {
        let Some(first) = columns.first() else {
            bail!(Value, "cannot concatenate zero columns");
        };
        let dtype = columns
            .iter()
            .skip(1)
            .try_fold(first.dtype(), |acc, c| acc.common(c.dtype()))?;
        let casted = columns
            .iter()
            .map(|c| c.cast(dtype))
            .collect::<Result<Vec<_>>>()?;
        macro_rules! stack {
            ($variant:ident) => {{
                let views: Vec<_> = casted
                    .iter()
                    .map(|c| match c {
                        Column::$variant(a) => Ok(a.view()),
                        _ => Err(PanelError::Type(format!("expected {dtype} column"))),
                    })
                    .collect::<Result<_>>()?;
                match concatenate(Axis(0), &views) {
                    Ok(stacked) => Column::$variant(stacked),
                    Err(e) => bail!(Value, "failed to concatenate columns: {e}"),
                }
            }};
        }
        Ok(match dtype {
            Dtype::Float64 => stack!(Float64),
            Dtype::Float32 => stack!(Float32),
            Dtype::Int64 => stack!(Int64),
            Dtype::Bool => stack!(Bool),
            Dtype::Utf8 => stack!(Utf8),
        })
    }

    /// Convert to `dtype`; fails with `TypeError` when a value cannot be represented.
    pub fn cast(&self, dtype: Dtype) -> Result<Column> {
        if self.dtype() == dtype {
            return Ok(self.clone());
        }
        Ok(match (self, dtype) {
            (Column::Utf8(a), Dtype::Float64) => Column::Float64(
                a.iter()
                    .map(|v| match v {
                        None => Ok(f64::NAN),
                        v => parse_cell(v, dtype),
                    })
                    .collect::<Result<_>>()?,
            ),
            (Column::Utf8(a), Dtype::Float32) => Column::Float32(
                a.iter()
                    .map(|v| match v {
                        None => Ok(f32::NAN),
                        v => parse_cell(v, dtype),
                    })
                    .collect::<Result<_>>()?,
            ),
            (Column::Utf8(a), Dtype::Int64) => Column::Int64(
                a.iter()
                    .map(|v| parse_cell(v, dtype))
                    .collect::<Result<_>>()?,
            ),
            (Column::Utf8(a), Dtype::Bool) => Column::Bool(
                a.iter()
                    .map(|v| match v.as_deref().map(str::trim) {
                        Some("true") | Some("True") | Some("1") => Ok(true),
                        Some("false") | Some("False") | Some("0") => Ok(false),
                        _ => bail!(Type, "cannot cast {v:?} to bool"),
                    })
                    .collect::<Result<_>>()?,
            ),
            (Column::Bool(a), Dtype::Utf8) => Column::Utf8(a.map(|v| Some(v.to_string()))),
            (column, Dtype::Utf8) => Column::Utf8(
                (0..column.len())
                    .map(|i| column.get(i).map(|v| v.to_string()))
                    .collect(),
            ),
            (Column::Float64(a), Dtype::Float32) => Column::Float32(a.mapv(|v| v as f32)),
            (Column::Float64(a), Dtype::Int64) => {
                Column::Int64(a.iter().map(|&v| float_to_int(v)).collect::<Result<_>>()?)
            }
            (Column::Float32(a), Dtype::Int64) => Column::Int64(
                a.iter()
                    .map(|&v| float_to_int(v as f64))
                    .collect::<Result<_>>()?,
            ),
            (Column::Float64(a), Dtype::Bool) => Column::Bool(
                a.iter()
                    .map(|&v| {
                        ensure!(!v.is_nan(), Type, "cannot cast NaN to bool");
                        Ok(v != 0.0)
                    })
                    .collect::<Result<_>>()?,
            ),
            (Column::Float32(a), Dtype::Bool) => Column::Bool(
                a.iter()
                    .map(|&v| {
                        ensure!(!v.is_nan(), Type, "cannot cast NaN to bool");
                        Ok(v != 0.0)
                    })
                    .collect::<Result<_>>()?,
            ),
            (Column::Int64(a), Dtype::Bool) => Column::Bool(a.mapv(|v| v != 0)),
            (Column::Int64(a), Dtype::Float32) => Column::Float32(a.mapv(|v| v as f32)),
            (Column::Bool(a), Dtype::Int64) => Column::Int64(a.mapv(|v| v as i64)),
            (Column::Bool(a), Dtype::Float32) => {
                Column::Float32(a.mapv(|v| if v { 1.0 } else { 0.0 }))
            }
            (column, Dtype::Float64) => Column::Float64(column.to_f64()),
            (column, dtype) => bail!(Type, "cannot cast {} to {dtype}", column.dtype()),
        })
    }
}
