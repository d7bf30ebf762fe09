//! # table
//!
//! the tabular input contract consumed by the loaders

use crate::{
    error::{bail, ensure, Result},
    series::column::Column,
};
use chrono::NaiveDateTime;
use itertools::Itertools;

/// Raw time values of a table, before they become an axis.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeValues {
    Ordinal(Vec<i64>),
    Text(Vec<String>),
    Calendar(Vec<NaiveDateTime>),
}

/// Named columns of equal length plus an optional ordering index.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    index: Option<TimeValues>,
    columns: Vec<String>,
    data: Vec<Column>,
}

/// The value frame and time values extracted by [`DataTable::select`].
#[derive(Debug, Clone)]
pub struct Selection {
    pub time: TimeValues,
    pub columns: Vec<String>,
    pub values: Vec<Column>,
}

impl TimeValues {
    pub fn len(&self) -> usize {
        match self {
            TimeValues::Ordinal(v) => v.len(),
            TimeValues::Text(v) => v.len(),
            TimeValues::Calendar(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataTable {
    pub fn new(columns: Vec<String>, data: Vec<Column>) -> Result<Self> {
        ensure!(
            columns.len() == data.len(),
            Schema,
            "{} column names given for {} columns",
            columns.len(),
            data.len()
        );
        if let Some(first) = data.first() {
            let n = first.len();
            for (name, column) in columns.iter().zip(&data) {
                ensure!(
                    column.len() == n,
                    Schema,
                    "column `{name}` has {} rows, expected {n}",
                    column.len()
                );
            }
        }
        Ok(Self {
            index: None,
            columns,
            data,
        })
    }

    /// attach an ordering index, which is used when no time column is named
    pub fn with_index(mut self, index: TimeValues) -> Result<Self> {
        ensure!(
            index.len() == self.num_rows(),
            Schema,
            "index has {} rows, table has {}",
            index.len(),
            self.num_rows()
        );
        self.index = Some(index);
        Ok(self)
    }

    pub fn num_rows(&self) -> usize {
        match (&self.index, self.data.first()) {
            (_, Some(column)) => column.len(),
            (Some(index), None) => index.len(),
            (None, None) => 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| &self.data[i])
    }

    fn time_values(&self, time_column: Option<&str>) -> Result<TimeValues> {
        let Some(name) = time_column else {
            return Ok(match &self.index {
                Some(index) => index.clone(),
                None => TimeValues::Ordinal((0..self.num_rows() as i64).collect()),
            });
        };
        let Some(column) = self.column(name) else {
            bail!(Schema, "time column `{name}` does not exist");
        };
        Ok(match column {
            Column::Int64(a) => TimeValues::Ordinal(a.to_vec()),
            Column::Utf8(a) => TimeValues::Text(
                a.iter()
                    .enumerate()
                    .map(|(i, v)| match v {
                        Some(v) => Ok(v.clone()),
                        None => bail!(Schema, "time column `{name}` is missing row {i}"),
                    })
                    .collect::<Result<_>>()?,
            ),
            other => bail!(
                Type,
                "time column `{name}` should hold integers or strings, got {}",
                other.dtype()
            ),
        })
    }

    /// Extract the value columns and the time values.
    ///
    /// Without `value_columns` every column except the time column is selected, and a
    /// single-column table selects itself.
    pub fn select(
        &self,
        time_column: Option<&str>,
        value_columns: Option<&[String]>,
    ) -> Result<Selection> {
        let columns: Vec<String> = match value_columns {
            Some(names) => names.to_vec(),
            None if self.columns.len() == 1 => self.columns.clone(),
            None => self
                .columns
                .iter()
                .filter(|c| Some(c.as_str()) != time_column)
                .cloned()
                .collect(),
        };
        let duplicates: Vec<&String> = columns.iter().duplicates().collect();
        ensure!(
            duplicates.is_empty(),
            Schema,
            "duplicate columns selected: {duplicates:?}"
        );
        let values = columns
            .iter()
            .map(|name| match self.column(name) {
                Some(column) => Ok(column.clone()),
                None => bail!(Schema, "column `{name}` does not exist"),
            })
            .collect::<Result<Vec<_>>>()?;
        let time = self.time_values(time_column)?;
        Ok(Selection {
            time,
            columns,
            values,
        })
    }
}
