//! # fill
//!
//! gap filling for missing cells of panel columns

use crate::{
    error::{bail, ensure, PanelError, Result},
    panel::Panel,
    series::Column,
    toolkit::array::{self, AFloat},
};
use ndarray::{s, Array1, ArrayView1};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMethod {
    /// max of the trailing window
    Max,
    /// min of the trailing window
    Min,
    /// mean of the trailing window
    Avg,
    /// median of the trailing window
    Median,
    /// the previous valid value
    #[default]
    Pre,
    /// the next valid value
    Back,
    Zero,
}

/// Fills missing cells of time-varying columns.
///
/// Window methods look at the `window_size` cells ending at the missing one and ignore
/// missing cells inside the window; a window without valid cells leaves the cell missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    columns: Option<Vec<String>>,
    method: FillMethod,
    window_size: usize,
}

impl fmt::Display for FillMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FillMethod::Max => "max",
            FillMethod::Min => "min",
            FillMethod::Avg => "avg",
            FillMethod::Median => "median",
            FillMethod::Pre => "pre",
            FillMethod::Back => "back",
            FillMethod::Zero => "zero",
        };
        write!(f, "{name}")
    }
}

impl FromStr for FillMethod {
    type Err = PanelError;

    fn from_str(name: &str) -> Result<Self> {
        Ok(match name {
            "max" => FillMethod::Max,
            "min" => FillMethod::Min,
            "avg" => FillMethod::Avg,
            "median" => FillMethod::Median,
            "pre" => FillMethod::Pre,
            "back" => FillMethod::Back,
            "zero" => FillMethod::Zero,
            _ => bail!(Value, "unknown fill method `{name}`"),
        })
    }
}

fn fill_forward<T: Clone>(values: &mut [T], is_missing: impl Fn(&T) -> bool) {
    let mut last: Option<T> = None;
    for v in values.iter_mut() {
        if is_missing(v) {
            if let Some(last) = &last {
                *v = last.clone();
            }
        } else {
            last = Some(v.clone());
        }
    }
}

fn fill_backward<T: Clone>(values: &mut [T], is_missing: impl Fn(&T) -> bool) {
    let mut next: Option<T> = None;
    for v in values.iter_mut().rev() {
        if is_missing(v) {
            if let Some(next) = &next {
                *v = next.clone();
            }
        } else {
            next = Some(v.clone());
        }
    }
}

fn fill_float<T: AFloat>(values: &Array1<T>, method: FillMethod, window_size: usize) -> Array1<T> {
    let mut filled = values.to_vec();
    match method {
        FillMethod::Pre => fill_forward(&mut filled, |v| v.is_nan()),
        FillMethod::Back => fill_backward(&mut filled, |v| v.is_nan()),
        FillMethod::Zero => filled
            .iter_mut()
            .filter(|v| v.is_nan())
            .for_each(|v| *v = T::zero()),
        FillMethod::Max | FillMethod::Min | FillMethod::Avg | FillMethod::Median => {
            let reduce: fn(ArrayView1<T>) -> T = match method {
                FillMethod::Max => array::max::<T>,
                FillMethod::Min => array::min::<T>,
                FillMethod::Avg => array::mean::<T>,
                _ => array::median::<T>,
            };
            for (i, v) in filled.iter_mut().enumerate() {
                if v.is_nan() {
                    let start = (i + 1).saturating_sub(window_size);
                    *v = reduce(values.slice(s![start..i + 1]));
                }
            }
        }
    }
    Array1::from_vec(filled)
}

impl Fill {
    pub fn new(method: FillMethod, window_size: usize) -> Result<Self> {
        ensure!(window_size >= 1, Value, "fill window size should be >= 1");
        Ok(Self {
            columns: None,
            method,
            window_size,
        })
    }

    /// restrict filling to `columns`, every time-varying column is filled otherwise
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// the filled copy of `column`, `None` when it cannot hold missing cells
    pub fn fill_column(&self, column: &Column) -> Option<Column> {
        match column {
            Column::Float64(a) => Some(Column::Float64(fill_float(a, self.method, self.window_size))),
            Column::Float32(a) => Some(Column::Float32(fill_float(a, self.method, self.window_size))),
            Column::Utf8(a) => {
                let mut filled = a.to_vec();
                match self.method {
                    FillMethod::Pre => fill_forward(&mut filled, Option::is_none),
                    FillMethod::Back => fill_backward(&mut filled, Option::is_none),
                    method => {
                        log::warn!("`{method}` fill does not apply to utf8 columns, skipped");
                        return None;
                    }
                }
                Some(Column::Utf8(Array1::from_vec(filled)))
            }
            Column::Int64(_) | Column::Bool(_) => None,
        }
    }

    /// Fill the selected columns of `panel` in place; unknown columns fail with `ValueError`
    /// and leave the panel untouched.
    pub fn transform(&self, panel: &mut Panel) -> Result<()> {
        if let Some(columns) = &self.columns {
            for column in columns {
                panel.locate(column)?;
            }
        }
        log::debug!(
            "filling missing cells with `{}` (window {})",
            self.method,
            self.window_size
        );
        panel.map_columns(|name, column| {
            let selected = self
                .columns
                .as_ref()
                .map_or(true, |columns| columns.iter().any(|c| c == name));
            if selected {
                self.fill_column(column)
            } else {
                None
            }
        })
    }
}
