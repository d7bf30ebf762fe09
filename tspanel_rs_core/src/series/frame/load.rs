use super::RegularSeries;
use crate::{
    error::{bail, ensure, Result},
    series::{
        index::{Frequency, TimeIndex, TimeKey},
        period::{parse_timestamp, Period},
    },
    table::{DataTable, TimeValues},
};
use chrono::NaiveDateTime;
use itertools::Itertools;

fn ensure_unique(keys: &[TimeKey]) -> Result<()> {
    let duplicates: Vec<&TimeKey> = keys.iter().duplicates().collect();
    ensure!(
        duplicates.is_empty(),
        Schema,
        "duplicate time points: {}",
        duplicates.iter().join(", ")
    );
    Ok(())
}

fn ordinal_axis(values: &[i64], freq: Option<Frequency>) -> Result<(TimeIndex, Vec<TimeKey>)> {
    let step = match freq {
        None => 1,
        Some(Frequency::Ordinal(step)) if step >= 1 => step,
        Some(other) => bail!(Schema, "ordinal time axis cannot use freq `{other}`"),
    };
    let keys: Vec<TimeKey> = values.iter().copied().map(TimeKey::Ordinal).collect();
    ensure_unique(&keys)?;
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Ok((TimeIndex::ordinal(0, step, 0)?, keys));
    };
    let span = i128::from(max) + i128::from(step) - i128::from(min);
    let step_wide = i128::from(step);
    ensure!(
        span % step_wide == 0
            && span / step_wide == values.len() as i128
            && values.iter().all(|v| (i128::from(*v) - i128::from(min)) % step_wide == 0),
        Schema,
        "gap or overlap in the range [{min}, {max}] with step {step}"
    );
    let index = TimeIndex::ordinal(min, step, values.len())?;
    Ok((index, keys))
}

fn calendar_axis(
    values: Vec<NaiveDateTime>,
    freq: Option<Frequency>,
) -> Result<(TimeIndex, Vec<TimeKey>)> {
    let period = match freq {
        Some(Frequency::Calendar(period)) => {
            period.validate()?;
            Some(period)
        }
        Some(other) => bail!(Schema, "calendar time axis cannot use freq `{other}`"),
        None => None,
    };
    let keys: Vec<TimeKey> = values.iter().copied().map(TimeKey::Calendar).collect();
    ensure_unique(&keys)?;
    let sorted: Vec<NaiveDateTime> = values.iter().copied().sorted().collect();
    let period = match period {
        Some(period) => period,
        None => match Period::infer(&sorted) {
            Some(period) => {
                log::debug!("inferred calendar period `{period}`");
                period
            }
            None => bail!(
                Schema,
                "cannot infer the frequency of the time axis, please provide `freq` explicitly"
            ),
        },
    };
    let Some(&first) = sorted.first() else {
        return Ok((TimeIndex::calendar(NaiveDateTime::default(), period, 0)?, keys));
    };
    let last = sorted[sorted.len() - 1];
    let len = match period.steps_between(first, last) {
        Some(steps) => steps + 1,
        None => bail!(Schema, "{last} is not on the `{period}` grid starting at {first}"),
    };
    Ok((TimeIndex::calendar(first, period, len)?, keys))
}

impl RegularSeries {
    /// Build a series from tabular input.
    ///
    /// Integer time values make an ordinal axis, string time values a calendar axis whose
    /// period is inferred when `freq` is not given. Rows are placed by time value.
    pub fn load(
        table: &DataTable,
        time_column: Option<&str>,
        value_columns: Option<&[String]>,
        freq: Option<Frequency>,
    ) -> Result<Self> {
        let selection = table.select(time_column, value_columns)?;
        let (index, keys) = match selection.time {
            TimeValues::Ordinal(values) => ordinal_axis(&values, freq)?,
            TimeValues::Calendar(values) => calendar_axis(values, freq)?,
            TimeValues::Text(values) => {
                let parsed = values
                    .iter()
                    .map(|text| match parse_timestamp(text) {
                        Some(t) => Ok(t),
                        None => bail!(Schema, "`{text}` is not a valid timestamp"),
                    })
                    .collect::<Result<Vec<_>>>()?;
                calendar_axis(parsed, freq)?
            }
        };
        let mut rows: Vec<Option<usize>> = vec![None; index.len()];
        for (row, key) in keys.iter().enumerate() {
            match index.position(key) {
                Some(position) => rows[position] = Some(row),
                None => bail!(Schema, "time point {key} is not on the `{}` grid", index.freq()),
            }
        }
        let gaps = rows.iter().filter(|r| r.is_none()).count();
        if gaps > 0 {
            log::debug!("{gaps} grid points have no row and are filled with missing values");
        }
        let values = selection
            .values
            .iter()
            .map(|column| column.take_nullable(&rows))
            .collect();
        log::debug!(
            "loaded {} rows x {} columns at freq `{}`",
            index.len(),
            selection.columns.len(),
            index.freq()
        );
        RegularSeries::new(index, selection.columns, values)
    }
}
