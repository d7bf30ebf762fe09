use super::{Panel, Partition};
use crate::{
    error::{bail, ensure, Result},
    series::{Column, ConcatAxis, RegularSeries, TimePoint},
};
use itertools::Itertools;

impl Panel {
    /// the axis static values are broadcast over: target first, else the first present partition
    fn broadcast_base(&self) -> Option<&RegularSeries> {
        Partition::TIME_VARYING
            .iter()
            .find_map(|&p| self.slot(p))
    }

    /// Gather `columns` from every partition into one series, in request order.
    ///
    /// Static values are broadcast over the target axis.
    pub fn read(&self, columns: &[String]) -> Result<RegularSeries> {
        let duplicates: Vec<&String> = columns.iter().duplicates().collect();
        ensure!(
            duplicates.is_empty(),
            Value,
            "duplicate columns requested: {duplicates:?}"
        );
        let mut frames: Vec<RegularSeries> = vec![];
        for partition in Partition::TIME_VARYING {
            let Some(series) = self.slot(partition) else {
                continue;
            };
            let names: Vec<String> = columns
                .iter()
                .filter(|c| series.contains(c))
                .cloned()
                .collect();
            if !names.is_empty() {
                frames.push(series.select(&names)?);
            }
        }
        if let Some(statics) = &self.static_covariates {
            let names: Vec<&String> = columns.iter().filter(|c| statics.contains_key(*c)).collect();
            if !names.is_empty() {
                let Some(base) = self.broadcast_base() else {
                    bail!(Value, "no time axis to broadcast static covariates over");
                };
                let mut broadcast = RegularSeries::empty(base.index().clone());
                for name in names {
                    broadcast.insert_column(name, Column::full(&statics[name], base.len()))?;
                }
                frames.push(broadcast);
            }
        }
        let found: usize = frames.iter().map(RegularSeries::num_columns).sum();
        if found != columns.len() {
            let missing = columns
                .iter()
                .filter(|c| self.locate(c).is_err())
                .join(", ");
            bail!(Value, "columns don't exist: {missing}");
        }
        let joined = RegularSeries::concat(&frames.iter().collect_vec(), ConcatAxis::Columns)?;
        joined.select(columns)
    }

    /// Split along time at `point` of the target.
    ///
    /// The end point of the left target splits the observed partition; known and static
    /// covariates are carried into both halves.
    pub fn split(&self, point: &TimePoint, prefer_after: bool) -> Result<(Panel, Panel)> {
        let Some(target) = &self.target else {
            bail!(Value, "splitting a panel requires a target partition");
        };
        let (left_target, right_target) = target.split(point, prefer_after)?;
        let (left_observed, right_observed) = match &self.observed {
            None => (None, None),
            Some(observed) => {
                let (left, right) = match left_target.end_time() {
                    Some(boundary) => observed.split(&TimePoint::from(boundary), prefer_after)?,
                    None => observed.split(&TimePoint::Position(0), prefer_after)?,
                };
                (Some(left), Some(right))
            }
        };
        let half = |target, observed| {
            Panel::new(
                Some(target),
                observed,
                self.known.clone(),
                self.static_covariates.clone(),
            )
        };
        Ok((
            half(left_target, left_observed)?,
            half(right_target, right_observed)?,
        ))
    }

    /// observed joined with known, `None` when neither is present
    pub fn all_covariates(&self) -> Result<Option<RegularSeries>> {
        let present = [&self.observed, &self.known]
            .into_iter()
            .flatten()
            .collect_vec();
        if present.is_empty() {
            return Ok(None);
        }
        RegularSeries::concat(&present, ConcatAxis::Columns).map(Some)
    }

    /// target joined with every covariate series
    pub fn to_series(&self) -> Result<RegularSeries> {
        let present = Partition::TIME_VARYING
            .iter()
            .filter_map(|&p| self.slot(p))
            .collect_vec();
        if present.is_empty() {
            bail!(Value, "the panel has no time-varying partition");
        }
        RegularSeries::concat(&present, ConcatAxis::Columns)
    }
}
