use super::RegularSeries;
use crate::{
    error::{bail, ensure, Result},
    series::{
        column::{Column, Dtype},
        index::{Frequency, TimeIndex, TimeKey},
        IndexedColumn,
    },
};
use itertools::Itertools;

impl RegularSeries {
    pub fn new(index: TimeIndex, columns: Vec<String>, values: Vec<Column>) -> Result<Self> {
        ensure!(
            columns.len() == values.len(),
            Schema,
            "{} column names given for {} columns",
            columns.len(),
            values.len()
        );
        let duplicates: Vec<&String> = columns.iter().duplicates().collect();
        ensure!(
            duplicates.is_empty(),
            Schema,
            "duplicate columns: {duplicates:?}"
        );
        for (name, column) in columns.iter().zip(&values) {
            ensure!(
                column.len() == index.len(),
                Schema,
                "column `{name}` has {} rows, the time axis has {}",
                column.len(),
                index.len()
            );
        }
        Ok(Self {
            index,
            columns,
            values,
        })
    }

    /// a series on `index` without columns
    pub fn empty(index: TimeIndex) -> Self {
        Self {
            index,
            columns: vec![],
            values: vec![],
        }
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn freq(&self) -> Frequency {
        self.index.freq()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn start_time(&self) -> Option<TimeKey> {
        self.index.start()
    }

    pub fn end_time(&self) -> Option<TimeKey> {
        self.index.end()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Column] {
        &self.values
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| &self.values[i])
    }

    pub fn dtypes(&self) -> Vec<(String, Dtype)> {
        self.columns
            .iter()
            .cloned()
            .zip(self.values.iter().map(Column::dtype))
            .collect()
    }

    /// the column `name` keyed by the axis points
    pub fn indexed(&self, name: &str) -> Option<IndexedColumn> {
        let column = self.column(name)?;
        IndexedColumn::new(self.index.keys(), column.clone()).ok()
    }

    /// Re-key `column` onto this axis; axis points without a value become missing.
    ///
    /// Fails with `ValueError` when the column holds a time point twice.
    pub fn align(&self, column: &IndexedColumn) -> Result<Column> {
        let mut rows: Vec<Option<usize>> = vec![None; self.len()];
        for (row, key) in column.keys().iter().enumerate() {
            let Some(position) = self.index.position(key) else {
                continue;
            };
            if rows[position].is_some() {
                bail!(Value, "time point {key} appears more than once");
            }
            rows[position] = Some(row);
        }
        Ok(column.values().take_nullable(&rows))
    }

    /// Add `name`, or replace it in place when it already exists.
    pub fn insert_column(&mut self, name: &str, column: Column) -> Result<()> {
        ensure!(
            column.len() == self.len(),
            Value,
            "column `{name}` has {} rows, the time axis has {}",
            column.len(),
            self.len()
        );
        match self.columns.iter().position(|c| c == name) {
            Some(i) => self.values[i] = column,
            None => {
                self.columns.push(name.to_string());
                self.values.push(column);
            }
        }
        Ok(())
    }

    /// drop the named columns, ignoring unknown names
    pub fn drop_columns(&mut self, names: &[String]) {
        let (columns, values): (Vec<String>, Vec<Column>) = std::mem::take(&mut self.columns)
            .into_iter()
            .zip(std::mem::take(&mut self.values))
            .filter(|(name, _)| !names.contains(name))
            .unzip();
        self.columns = columns;
        self.values = values;
    }

    /// a new series holding `names`, in that order
    pub fn select(&self, names: &[String]) -> Result<RegularSeries> {
        let values = names
            .iter()
            .map(|name| match self.column(name) {
                Some(column) => Ok(column.clone()),
                None => bail!(Value, "column `{name}` does not exist"),
            })
            .collect::<Result<Vec<_>>>()?;
        RegularSeries::new(self.index.clone(), names.to_vec(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{column::Scalar, tests::ordinal_series};
    use crate::table::tests::names;

    #[test]
    fn test_new_validates() {
        let index = TimeIndex::ordinal(0, 1, 2).unwrap();
        assert!(RegularSeries::new(
            index.clone(),
            names(&["a", "a"]),
            vec![Column::from_i64(vec![1, 2]), Column::from_i64(vec![3, 4])]
        )
        .unwrap_err()
        .is_schema());
        assert!(
            RegularSeries::new(index, names(&["a"]), vec![Column::from_i64(vec![1])])
                .unwrap_err()
                .is_schema()
        );
    }

    #[test]
    fn test_align() {
        let series = ordinal_series(0, 2, &[("a", vec![1.0, 2.0, 3.0])]);
        let column = IndexedColumn::new(
            vec![TimeKey::Ordinal(4), TimeKey::Ordinal(0), TimeKey::Ordinal(7)],
            Column::from_i64(vec![40, 0, 70]),
        )
        .unwrap();
        let aligned = series.align(&column).unwrap();
        assert_eq!(aligned.get(0), Some(Scalar::Float(0.0)));
        assert!(aligned.is_missing(1));
        assert_eq!(aligned.get(2), Some(Scalar::Float(40.0)));

        let twice = IndexedColumn::new(
            vec![TimeKey::Ordinal(0), TimeKey::Ordinal(0)],
            Column::from_i64(vec![1, 2]),
        )
        .unwrap();
        assert!(series.align(&twice).unwrap_err().is_value());

        let shifted = ordinal_series(2, 2, &[("b", vec![0.0, 0.0, 0.0])]);
        let a = series.indexed("a").unwrap();
        assert_eq!(a.keys().len(), 3);
        let moved = shifted.align(&a).unwrap();
        assert_eq!(moved.get(0), Some(Scalar::Float(2.0)));
        assert_eq!(moved.get(1), Some(Scalar::Float(3.0)));
        assert!(moved.is_missing(2));
        assert!(series.indexed("missing").is_none());
    }

    #[test]
    fn test_column_mutation() {
        let mut series = ordinal_series(0, 1, &[("a", vec![1.0, 2.0]), ("b", vec![3.0, 4.0])]);
        series
            .insert_column("c", Column::from_i64(vec![5, 6]))
            .unwrap();
        series
            .insert_column("a", Column::from_i64(vec![0, 0]))
            .unwrap();
        assert_eq!(series.columns(), names(&["a", "b", "c"]).as_slice());
        assert_eq!(series.column("a"), Some(&Column::from_i64(vec![0, 0])));
        assert!(series
            .insert_column("d", Column::from_i64(vec![1]))
            .unwrap_err()
            .is_value());

        series.drop_columns(&names(&["b", "missing"]));
        assert_eq!(series.columns(), names(&["a", "c"]).as_slice());

        let selected = series.select(&names(&["c", "a"])).unwrap();
        assert_eq!(selected.columns(), names(&["c", "a"]).as_slice());
        assert!(series.select(&names(&["b"])).unwrap_err().is_value());
    }
}
