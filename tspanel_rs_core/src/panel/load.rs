use super::{Panel, PanelOptions, StaticCovariates};
use crate::{
    error::{bail, Result},
    fill::Fill,
    series::{Frequency, RegularSeries, Scalar},
    table::DataTable,
};

/// the single value held by every row of `name`
fn static_value(table: &DataTable, name: &str) -> Result<Scalar> {
    let Some(column) = table.column(name) else {
        bail!(Schema, "static column `{name}` does not exist");
    };
    let mut values: Vec<Option<Scalar>> = vec![];
    for value in (0..column.len()).map(|i| column.get(i)) {
        if !values.contains(&value) {
            values.push(value);
        }
    }
    match values.as_slice() {
        [Some(value)] => Ok(value.clone()),
        _ => bail!(
            Schema,
            "static column `{name}` should hold exactly one distinct value, got {}",
            values.len()
        ),
    }
}

fn load_role(
    table: &DataTable,
    time_column: Option<&str>,
    columns: Option<&[String]>,
    freq: Option<Frequency>,
) -> Result<Option<RegularSeries>> {
    match columns {
        Some(columns) if !columns.is_empty() => {
            RegularSeries::load(table, time_column, Some(columns), freq).map(Some)
        }
        _ => Ok(None),
    }
}

impl Panel {
    /// Build a panel and, when `options.fill_missing_dates` is set, fill the missing cells of
    /// every time-varying column.
    pub fn with_options(
        target: Option<RegularSeries>,
        observed: Option<RegularSeries>,
        known: Option<RegularSeries>,
        static_covariates: Option<StaticCovariates>,
        options: &PanelOptions,
    ) -> Result<Self> {
        let mut panel = Panel::new(target, observed, known, static_covariates)?;
        if options.fill_missing_dates {
            Fill::new(options.fill_method, options.fill_window_size)?.transform(&mut panel)?;
        }
        Ok(panel)
    }

    /// Build a panel from one table, routing columns to partitions by role.
    ///
    /// Without any role columns every non-time column becomes a target column. Static columns
    /// must hold exactly one distinct value.
    #[allow(clippy::too_many_arguments)]
    pub fn load_from_table(
        table: &DataTable,
        time_column: Option<&str>,
        target_columns: Option<&[String]>,
        observed_columns: Option<&[String]>,
        known_columns: Option<&[String]>,
        static_columns: Option<&[String]>,
        freq: Option<Frequency>,
        options: &PanelOptions,
    ) -> Result<Self> {
        let roles = [target_columns, observed_columns, known_columns, static_columns];
        if roles.iter().flatten().all(|columns| columns.is_empty()) {
            log::debug!("no role columns given, every non-time column is a target");
            let target = RegularSeries::load(table, time_column, None, freq)?;
            return Panel::with_options(Some(target), None, None, None, options);
        }
        let target = load_role(table, time_column, target_columns, freq)?;
        let observed = load_role(table, time_column, observed_columns, freq)?;
        let known = load_role(table, time_column, known_columns, freq)?;
        let static_covariates = static_columns
            .unwrap_or_default()
            .iter()
            .map(|name| Ok((name.clone(), static_value(table, name)?)))
            .collect::<Result<StaticCovariates>>()?;
        Panel::with_options(
            target,
            observed,
            known,
            Some(static_covariates),
            options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fill::FillMethod,
        panel::Partition,
        series::{Column, Dtype, Scalar},
        table::tests::names,
    };

    fn store_table() -> DataTable {
        DataTable::new(
            names(&["date", "sales", "temp", "holiday", "region"]),
            vec![
                Column::from_strs(&["2023-01-01", "2023-01-02", "2023-01-04"]),
                Column::from_f64(vec![1.0, 2.0, 4.0]),
                Column::from_f64(vec![10.0, 11.0, 13.0]),
                Column::from_i64(vec![0, 1, 0]),
                Column::from_strs(&["north", "north", "north"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_load_roles() {
        let table = store_table();
        let options = PanelOptions::default();
        let panel = Panel::load_from_table(
            &table,
            Some("date"),
            Some(&names(&["sales"])),
            Some(&names(&["temp"])),
            Some(&names(&["holiday"])),
            Some(&names(&["region"])),
            Some("D".parse().unwrap()),
            &options,
        )
        .unwrap();
        assert_eq!(panel.locate("temp").unwrap(), Partition::Observed);
        assert_eq!(
            panel.static_covariates().and_then(|m| m.get("region")),
            Some(&Scalar::from("north"))
        );
        let sales = panel.target().and_then(|t| t.column("sales")).unwrap();
        assert!(sales.is_missing(2));

        let varying = Panel::load_from_table(
            &table,
            Some("date"),
            Some(&names(&["sales"])),
            None,
            None,
            Some(&names(&["holiday"])),
            Some("D".parse().unwrap()),
            &options,
        );
        assert!(varying.unwrap_err().is_schema());

        let absent = Panel::load_from_table(
            &table,
            Some("date"),
            Some(&names(&["sales"])),
            None,
            None,
            Some(&names(&["country"])),
            Some("D".parse().unwrap()),
            &options,
        );
        assert!(absent.unwrap_err().is_schema());
    }

    #[test]
    fn test_load_defaults_to_target() {
        let table = DataTable::new(
            names(&["t", "a", "b"]),
            vec![
                Column::from_i64(vec![0, 1]),
                Column::from_i64(vec![1, 2]),
                Column::from_f64(vec![0.5, 1.5]),
            ],
        )
        .unwrap();
        let panel = Panel::load_from_table(
            &table,
            Some("t"),
            None,
            None,
            None,
            None,
            None,
            &PanelOptions::default(),
        )
        .unwrap();
        assert_eq!(
            panel.dtypes(),
            vec![("a".to_string(), Dtype::Int64), ("b".to_string(), Dtype::Float64)]
        );
        assert!(panel.observed().is_none());
    }

    #[test]
    fn test_load_fills_missing_dates() {
        let options = PanelOptions {
            fill_missing_dates: true,
            fill_method: FillMethod::Zero,
            ..Default::default()
        };
        let panel = Panel::load_from_table(
            &store_table(),
            Some("date"),
            Some(&names(&["sales"])),
            None,
            Some(&names(&["holiday"])),
            None,
            Some("D".parse().unwrap()),
            &options,
        )
        .unwrap();
        let sales = panel.target().and_then(|t| t.column("sales")).unwrap();
        assert_eq!(sales.get(2), Some(Scalar::Float(0.0)));
        let holiday = panel.known().and_then(|k| k.column("holiday")).unwrap();
        assert_eq!(holiday.get(2), Some(Scalar::Float(0.0)));
    }
}
