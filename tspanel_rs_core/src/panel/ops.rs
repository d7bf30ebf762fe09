use super::{Panel, Partition, StaticCovariates, WriteValue};
use crate::{
    error::{bail, ensure, Result},
    series::{CastSpec, Column, ConcatAxis, IndexedColumn, RegularSeries, TimeIndex},
};
use itertools::Itertools;
use std::collections::BTreeMap;

impl Panel {
    fn write_series(
        &mut self,
        partition: Partition,
        column: &str,
        values: &IndexedColumn,
    ) -> Result<()> {
        let candidate = match self.slot(partition) {
            Some(series) => {
                let aligned = series.align(values)?;
                let mut candidate = series.clone();
                candidate.insert_column(column, aligned)?;
                candidate
            }
            None => {
                log::debug!("creating the {partition} partition from column `{column}`");
                let index = TimeIndex::spanning(values.keys(), self.freq)?;
                let mut candidate = RegularSeries::empty(index);
                let aligned = candidate.align(values)?;
                candidate.insert_column(column, aligned)?;
                candidate
            }
        };
        self.commit_series(partition, Some(candidate))
    }

    /// Write `column`, updating it where it lives or creating it in `default_partition`.
    ///
    /// Static columns take scalars, time-varying columns take indexed values that are
    /// re-aligned onto the partition axis.
    pub fn write(
        &mut self,
        column: &str,
        value: WriteValue,
        default_partition: Partition,
    ) -> Result<()> {
        let partition = self.locate(column).unwrap_or(default_partition);
        match (partition, value) {
            (Partition::Static, WriteValue::Scalar(scalar)) => {
                let mut statics = self.static_covariates.clone().unwrap_or_default();
                statics.insert(column.to_string(), scalar);
                self.commit_static(Some(statics))
            }
            (Partition::Static, WriteValue::Series(_)) => {
                bail!(Type, "static column `{column}` only accepts scalar values")
            }
            (partition, WriteValue::Series(values)) => {
                self.write_series(partition, column, &values)
            }
            (partition, WriteValue::Scalar(_)) => {
                bail!(Type, "{partition} column `{column}` only accepts series values")
            }
        }
    }

    /// bracket-style assignment, new columns go to the known partition
    pub fn set(&mut self, column: &str, value: impl Into<WriteValue>) -> Result<()> {
        self.write(column, value.into(), Partition::Known)
    }

    /// Drop `columns` wherever they live; unknown names are ignored and emptied partitions
    /// become absent.
    pub fn drop(&mut self, columns: &[String]) -> Result<()> {
        let duplicates: Vec<&String> = columns.iter().duplicates().collect();
        ensure!(
            duplicates.is_empty(),
            Value,
            "duplicate columns to drop: {duplicates:?}"
        );
        for partition in Partition::TIME_VARYING {
            if let Some(slot) = self.slot_mut(partition) {
                if let Some(series) = slot {
                    series.drop_columns(columns);
                    if series.num_columns() == 0 {
                        log::debug!("{partition} partition emptied by drop");
                        *slot = None;
                    }
                }
            }
        }
        if let Some(statics) = &mut self.static_covariates {
            statics.retain(|k, _| !columns.contains(k));
            if statics.is_empty() {
                self.static_covariates = None;
            }
        }
        Ok(())
    }

    /// Concatenate panels partition by partition; static covariates are merged and must agree.
    pub fn concat(panels: &[&Panel], axis: ConcatAxis) -> Result<Panel> {
        ensure!(!panels.is_empty(), Value, "cannot concatenate zero panels");
        let mut parts: Vec<Option<RegularSeries>> = vec![];
        for partition in Partition::TIME_VARYING {
            let present = panels.iter().filter_map(|p| p.slot(partition)).collect_vec();
            parts.push(if present.is_empty() {
                None
            } else {
                Some(RegularSeries::concat(&present, axis)?)
            });
        }
        let mut statics = StaticCovariates::new();
        for panel in panels {
            for (key, value) in panel.static_covariates.iter().flatten() {
                match statics.get(key) {
                    Some(existing) if existing != value => bail!(
                        Value,
                        "static covariate `{key}` conflicts: {existing} vs {value}"
                    ),
                    Some(_) => {}
                    None => {
                        statics.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        let [target, observed, known]: [Option<RegularSeries>; 3] = match parts.try_into() {
            Ok(parts) => parts,
            Err(_) => bail!(Value, "expected three time-varying partitions"),
        };
        Panel::new(target, observed, known, Some(statics))
    }

    /// Cast time-varying columns; nothing changes when any conversion fails.
    ///
    /// Static covariates are left as they are, and naming one in `spec` is a no-op.
    pub fn cast(&mut self, spec: &CastSpec) -> Result<()> {
        let mut specs: BTreeMap<Partition, CastSpec> = BTreeMap::new();
        match spec {
            CastSpec::All(dtype) => {
                for partition in Partition::TIME_VARYING {
                    specs.insert(partition, CastSpec::All(*dtype));
                }
            }
            CastSpec::PerColumn(dtypes) => {
                let mut split: BTreeMap<Partition, BTreeMap<String, _>> = BTreeMap::new();
                for (name, dtype) in dtypes {
                    match self.locate(name) {
                        Ok(Partition::Static) => {
                            log::debug!("static column `{name}` is left uncasted");
                        }
                        Ok(partition) => {
                            split.entry(partition).or_default().insert(name.clone(), *dtype);
                        }
                        Err(_) => bail!(Value, "column `{name}` does not exist"),
                    }
                }
                specs.extend(
                    split
                        .into_iter()
                        .map(|(p, dtypes)| (p, CastSpec::PerColumn(dtypes))),
                );
            }
        }
        let mut casted = vec![];
        for (partition, spec) in &specs {
            if let Some(series) = self.slot(*partition) {
                casted.push((*partition, series.cast_columns(spec)?));
            }
        }
        for (partition, values) in casted {
            if let Some(Some(series)) = self.slot_mut(partition) {
                series.replace_values(values)?;
            }
        }
        Ok(())
    }

    /// Replace time-varying columns by `f(name, column)` where it returns a value; all
    /// replacements are computed before any is applied.
    pub(crate) fn map_columns(
        &mut self,
        mut f: impl FnMut(&str, &Column) -> Option<Column>,
    ) -> Result<()> {
        let mut updates = vec![];
        for partition in Partition::TIME_VARYING {
            let Some(series) = self.slot(partition) else {
                continue;
            };
            let mut changed = false;
            let values: Vec<Column> = series
                .columns()
                .iter()
                .zip(series.values())
                .map(|(name, column)| match f(name, column) {
                    Some(replaced) => {
                        changed = true;
                        replaced
                    }
                    None => column.clone(),
                })
                .collect();
            if changed {
                updates.push((partition, values));
            }
        }
        for (partition, values) in updates {
            if let Some(Some(series)) = self.slot_mut(partition) {
                series.replace_values(values)?;
            }
        }
        Ok(())
    }

    pub fn sort_columns(&mut self, ascending: bool) {
        for partition in Partition::TIME_VARYING {
            if let Some(Some(series)) = self.slot_mut(partition) {
                series.sort_columns(ascending);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        panel::tests::get_test_panel,
        series::{period::parse_timestamp, Dtype, Scalar, TimeKey, TimePoint},
        table::tests::names,
    };

    fn days(texts: &[&str]) -> Vec<TimeKey> {
        texts
            .iter()
            .map(|t| TimeKey::Calendar(parse_timestamp(t).unwrap()))
            .collect()
    }

    #[test]
    fn test_write_existing() {
        let mut panel = get_test_panel();
        let update = IndexedColumn::new(
            days(&["2023-01-02", "2023-01-01"]),
            Column::from_f64(vec![20.0, 10.0]),
        )
        .unwrap();
        panel
            .write("sales", update.into(), Partition::Known)
            .unwrap();
        let sales = panel.target().and_then(|t| t.column("sales")).unwrap();
        assert_eq!(sales.get(0), Some(Scalar::Float(10.0)));
        assert!(sales.is_missing(3));

        panel.set("region", Scalar::from("south")).unwrap();
        assert_eq!(
            panel.static_covariates().and_then(|m| m.get("region")),
            Some(&Scalar::from("south"))
        );
        let before = panel.clone();
        assert!(panel.set("sales", Scalar::Int(1)).unwrap_err().is_type());
        let series = IndexedColumn::new(days(&["2023-01-01"]), Column::from_i64(vec![1])).unwrap();
        assert!(panel.set("region", series).unwrap_err().is_type());
        assert_eq!(panel, before);
    }

    #[test]
    fn test_write_new_columns() {
        let mut panel = get_test_panel();
        let series = IndexedColumn::new(
            days(&["2023-01-01", "2023-01-03"]),
            Column::from_i64(vec![1, 3]),
        )
        .unwrap();
        panel.set("promo", series.clone()).unwrap();
        assert_eq!(panel.locate("promo").unwrap(), Partition::Known);

        panel
            .write("store", Scalar::Int(3).into(), Partition::Static)
            .unwrap();
        assert_eq!(panel.locate("store").unwrap(), Partition::Static);
        assert!(panel
            .write("other", series.clone().into(), Partition::Static)
            .unwrap_err()
            .is_type());
        assert!(panel
            .write("other", Scalar::Int(1).into(), Partition::Observed)
            .unwrap_err()
            .is_type());

        panel.set_observed(None).unwrap();
        panel
            .write("rain", series.into(), Partition::Observed)
            .unwrap();
        let observed = panel.observed().unwrap();
        assert_eq!(observed.len(), 3);
        assert_eq!(observed.freq(), panel.freq());
    }

    #[test]
    fn test_drop() {
        let mut panel = get_test_panel();
        assert!(panel.drop(&names(&["temp", "temp"])).unwrap_err().is_value());
        panel.drop(&names(&["temp", "region", "nothing"])).unwrap();
        assert!(panel.observed().is_none());
        assert!(panel.static_covariates().is_none());
        let err = panel.read(&names(&["temp"])).unwrap_err();
        assert!(err.to_string().contains("columns don't exist"));

        let freq = panel.freq();
        panel.drop(&names(&["sales", "holiday"])).unwrap();
        assert!(panel.target().is_none() && panel.known().is_none());
        assert_eq!(panel.freq(), freq);
    }

    #[test]
    fn test_concat_static_conflict() {
        let panel = get_test_panel();
        let mut other = get_test_panel();
        other.drop(&names(&["sales", "temp", "holiday"])).unwrap();
        other
            .set_known(Some(crate::series::tests::daily_series(
                "2023-01-01",
                &[("promo", vec![1.0, 0.0])],
            )))
            .unwrap();
        let merged = Panel::concat(&[&panel, &other], ConcatAxis::Columns).unwrap();
        assert_eq!(merged.static_covariates().map(|m| m.len()), Some(1));
        assert_eq!(merged.locate("promo").unwrap(), Partition::Known);

        other.set("region", Scalar::from("south")).unwrap();
        assert!(Panel::concat(&[&panel, &other], ConcatAxis::Columns)
            .unwrap_err()
            .is_value());
        assert!(Panel::concat(&[], ConcatAxis::Time).unwrap_err().is_value());
    }

    #[test]
    fn test_split_then_concat() {
        let panel = get_test_panel();
        let at = TimePoint::Position(2);
        let (left, mut right) = panel.split(&at, true).unwrap();
        right.set_known(None).unwrap();
        let merged = Panel::concat(&[&left, &right], ConcatAxis::Time).unwrap();
        assert_eq!(merged.target(), panel.target());
    }

    #[test]
    fn test_cast() {
        let mut panel = get_test_panel();
        let before = panel.clone();
        let unknown = CastSpec::PerColumn(BTreeMap::from([
            ("sales".to_string(), Dtype::Int64),
            ("x".to_string(), Dtype::Int64),
        ]));
        assert!(panel.cast(&unknown).unwrap_err().is_value());
        assert_eq!(panel, before);

        let with_static = CastSpec::PerColumn(BTreeMap::from([
            ("sales".to_string(), Dtype::Float32),
            ("region".to_string(), Dtype::Int64),
        ]));
        panel.cast(&with_static).unwrap();
        assert_eq!(
            panel.target().and_then(|t| t.column("sales")).map(Column::dtype),
            Some(Dtype::Float32)
        );
        assert_eq!(panel.static_covariates(), before.static_covariates());

        panel.cast(&CastSpec::All(Dtype::Float32)).unwrap();
        assert!(panel
            .dtypes()
            .iter()
            .filter(|(name, _)| name != "region")
            .all(|(_, dtype)| *dtype == Dtype::Float32));

        let to_int = CastSpec::PerColumn(BTreeMap::from([("holiday".to_string(), Dtype::Int64)]));
        panel.cast(&to_int).unwrap();
        assert_eq!(
            panel.known().and_then(|k| k.column("holiday")),
            Some(&Column::from_i64(vec![0, 0, 1, 0, 0]))
        );
    }

    #[test]
    fn test_sort_columns() {
        let mut panel = get_test_panel();
        let series = IndexedColumn::new(days(&["2023-01-01"]), Column::from_i64(vec![1])).unwrap();
        panel.set("a_flag", series).unwrap();
        panel.sort_columns(true);
        assert_eq!(
            panel.known().map(|k| k.columns().to_vec()),
            Some(names(&["a_flag", "holiday"]))
        );
    }
}
