use super::RegularSeries;
use crate::{
    error::{bail, ensure, Result},
    series::{
        column::{CastSpec, Column},
        index::{TimeIndex, TimeKey},
        ConcatAxis,
    },
};
use itertools::Itertools;
use std::collections::BTreeSet;

/// the grid spanning every input, or an empty axis at the first origin when no input has rows
fn spanning_index(series: &[&RegularSeries], keys: &[TimeKey]) -> Result<TimeIndex> {
    let first = series[0];
    if keys.is_empty() {
        return Ok(first.index.with_len(0));
    }
    TimeIndex::spanning(keys, first.freq())
}

fn concat_time(series: &[&RegularSeries]) -> Result<RegularSeries> {
    let keys: Vec<TimeKey> = series.iter().flat_map(|s| s.index.keys()).collect();
    let duplicates: Vec<&TimeKey> = keys.iter().duplicates().collect();
    ensure!(
        duplicates.is_empty(),
        Value,
        "duplicate time points across inputs: {}",
        duplicates.iter().join(", ")
    );
    let index = spanning_index(series, &keys)?;
    let columns: Vec<String> = series
        .iter()
        .flat_map(|s| s.columns.iter().cloned())
        .unique()
        .collect();
    let values = columns
        .iter()
        .map(|name| {
            let present: Vec<(&RegularSeries, &Column)> = series
                .iter()
                .filter_map(|s| s.column(name).map(|c| (*s, c)))
                .collect();
            let stacked = Column::concat(&present.iter().map(|(_, c)| *c).collect_vec())?;
            let mut rows: Vec<Option<usize>> = vec![None; index.len()];
            let mut offset = 0;
            for (s, column) in &present {
                for (row, key) in s.index.keys().iter().enumerate() {
                    if let Some(position) = index.position(key) {
                        rows[position] = Some(offset + row);
                    }
                }
                offset += column.len();
            }
            Ok(stacked.take_nullable(&rows))
        })
        .collect::<Result<Vec<_>>>()?;
    RegularSeries::new(index, columns, values)
}

fn concat_columns(series: &[&RegularSeries]) -> Result<RegularSeries> {
    let columns: Vec<String> = series
        .iter()
        .flat_map(|s| s.columns.iter().cloned())
        .collect();
    let duplicates: Vec<&String> = columns.iter().duplicates().collect();
    ensure!(
        duplicates.is_empty(),
        Value,
        "duplicate columns across inputs: {duplicates:?}"
    );
    let keys: Vec<TimeKey> = series
        .iter()
        .flat_map(|s| s.index.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index = spanning_index(series, &keys)?;
    let grid = index.keys();
    let mut values = Vec::with_capacity(columns.len());
    for s in series {
        let rows: Vec<Option<usize>> = grid.iter().map(|key| s.index.position(key)).collect();
        values.extend(s.values.iter().map(|c| c.take_nullable(&rows)));
    }
    RegularSeries::new(index, columns, values)
}

impl RegularSeries {
    /// Concatenate series sharing one frequency.
    ///
    /// Along [`ConcatAxis::Time`] rows are stacked onto the grid spanning all inputs, with the
    /// ordered union of columns. Along [`ConcatAxis::Columns`] columns are outer-joined on time.
    pub fn concat(series: &[&RegularSeries], axis: ConcatAxis) -> Result<RegularSeries> {
        let Some(first) = series.first() else {
            bail!(Value, "cannot concatenate zero series");
        };
        let freq = first.freq();
        for s in series.iter().skip(1) {
            ensure!(
                s.freq() == freq,
                Value,
                "cannot concatenate series with freq `{}` and `{freq}`",
                s.freq()
            );
        }
        log::debug!("concatenating {} series along {axis:?}", series.len());
        match axis {
            ConcatAxis::Time => concat_time(series),
            ConcatAxis::Columns => concat_columns(series),
        }
    }

    /// Re-key every column onto `index`; points absent from this series become missing.
    pub fn reindex(&self, index: TimeIndex) -> Result<RegularSeries> {
        ensure!(
            index.kind() == self.index.kind(),
            Value,
            "cannot reindex a {} axis onto a {} axis",
            self.index.kind(),
            index.kind()
        );
        let rows: Vec<Option<usize>> = index
            .keys()
            .iter()
            .map(|key| self.index.position(key))
            .collect();
        let values = self.values.iter().map(|c| c.take_nullable(&rows)).collect();
        RegularSeries::new(index, self.columns.clone(), values)
    }

    /// the casted columns, built without touching `self`
    pub(crate) fn cast_columns(&self, spec: &CastSpec) -> Result<Vec<Column>> {
        if let CastSpec::PerColumn(dtypes) = spec {
            for name in dtypes.keys() {
                if !self.contains(name) {
                    bail!(Key, "column `{name}` does not exist");
                }
            }
        }
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(name, column)| match spec {
                CastSpec::All(dtype) => column.cast(*dtype),
                CastSpec::PerColumn(dtypes) => match dtypes.get(name) {
                    Some(dtype) => column.cast(*dtype),
                    None => Ok(column.clone()),
                },
            })
            .collect()
    }

    /// Cast columns in place; nothing changes when any conversion fails.
    pub fn cast(&mut self, spec: &CastSpec) -> Result<()> {
        self.values = self.cast_columns(spec)?;
        Ok(())
    }

    pub(crate) fn replace_values(&mut self, values: Vec<Column>) -> Result<()> {
        ensure!(
            values.len() == self.values.len() && values.iter().all(|c| c.len() == self.len()),
            Value,
            "replacement values do not match the series layout"
        );
        self.values = values;
        Ok(())
    }

    pub fn sort_columns(&mut self, ascending: bool) {
        let mut pairs: Vec<(String, Column)> = std::mem::take(&mut self.columns)
            .into_iter()
            .zip(std::mem::take(&mut self.values))
            .collect();
        pairs.sort_by(|(a, _), (b, _)| if ascending { a.cmp(b) } else { b.cmp(a) });
        let (columns, values): (Vec<String>, Vec<Column>) = pairs.into_iter().unzip();
        self.columns = columns;
        self.values = values;
    }
}
