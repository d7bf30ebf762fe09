//! # panel
//!
//! a composite of role-partitioned series (target / observed / known) and static covariates,
//! sharing one frequency and one column namespace

use crate::{
    error::{bail, ensure, PanelError, Result},
    fill::FillMethod,
    series::{Frequency, IndexedColumn, RegularSeries, Scalar},
};
use itertools::Itertools;
use std::{collections::BTreeMap, fmt, str::FromStr};

pub mod io;
mod indexing;
mod load;
mod meta;
mod ops;

pub type StaticCovariates = BTreeMap<String, Scalar>;

/// The role of a group of columns, in routing priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    Target,
    Observed,
    Known,
    Static,
}

/// A value written into a panel column.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    Scalar(Scalar),
    Series(IndexedColumn),
}

/// Construction options of a [`Panel`].
#[derive(Debug, Clone, PartialEq)]
pub struct PanelOptions {
    /// fill missing cells of every time-varying column after construction
    pub fill_missing_dates: bool,
    pub fill_method: FillMethod,
    pub fill_window_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    target: Option<RegularSeries>,
    observed: Option<RegularSeries>,
    known: Option<RegularSeries>,
    static_covariates: Option<StaticCovariates>,
    freq: Frequency,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            fill_missing_dates: false,
            fill_method: FillMethod::Pre,
            fill_window_size: 10,
        }
    }
}

impl Partition {
    pub const TIME_VARYING: [Partition; 3] =
        [Partition::Target, Partition::Observed, Partition::Known];
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Partition::Target => "target",
            Partition::Observed => "observed",
            Partition::Known => "known",
            Partition::Static => "static",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Partition {
    type Err = PanelError;

    fn from_str(name: &str) -> Result<Self> {
        Ok(match name {
            "target" => Partition::Target,
            "observed" => Partition::Observed,
            "known" => Partition::Known,
            "static" => Partition::Static,
            _ => bail!(
                Value,
                "partition should be one of target / observed / known / static, got `{name}`"
            ),
        })
    }
}

impl From<Scalar> for WriteValue {
    fn from(value: Scalar) -> Self {
        WriteValue::Scalar(value)
    }
}

impl From<IndexedColumn> for WriteValue {
    fn from(value: IndexedColumn) -> Self {
        WriteValue::Series(value)
    }
}

/// Validate a partition layout, returning its shared frequency.
///
/// `fallback` is used when no time-varying partition is present.
pub(crate) fn check(
    target: Option<&RegularSeries>,
    observed: Option<&RegularSeries>,
    known: Option<&RegularSeries>,
    static_covariates: Option<&StaticCovariates>,
    fallback: Option<Frequency>,
) -> Result<Frequency> {
    let present = [target, observed, known];
    let freqs: Vec<Frequency> = present.iter().flatten().map(|s| s.freq()).unique().collect();
    let freq = match freqs.as_slice() {
        [freq] => *freq,
        [] => match fallback {
            Some(freq) => freq,
            None => bail!(Value, "a panel needs at least one time-varying partition"),
        },
        _ => bail!(
            Value,
            "frequency mismatch between partitions: {}",
            freqs.iter().join(", ")
        ),
    };
    let names = present
        .iter()
        .flatten()
        .flat_map(|s| s.columns().iter())
        .chain(static_covariates.into_iter().flat_map(|m| m.keys()));
    let duplicates: Vec<&String> = names.duplicates().collect();
    ensure!(
        duplicates.is_empty(),
        Value,
        "columns appear in more than one partition: {duplicates:?}"
    );
    Ok(freq)
}

impl Panel {
    /// Build a panel, checking that the time-varying partitions share one frequency and that
    /// no column name appears twice.
    pub fn new(
        target: Option<RegularSeries>,
        observed: Option<RegularSeries>,
        known: Option<RegularSeries>,
        static_covariates: Option<StaticCovariates>,
    ) -> Result<Self> {
        let static_covariates = static_covariates.filter(|m| !m.is_empty());
        let freq = check(
            target.as_ref(),
            observed.as_ref(),
            known.as_ref(),
            static_covariates.as_ref(),
            None,
        )?;
        log::debug!("created panel at freq `{freq}`");
        Ok(Self {
            target,
            observed,
            known,
            static_covariates,
            freq,
        })
    }

    fn slot(&self, partition: Partition) -> Option<&RegularSeries> {
        match partition {
            Partition::Target => self.target.as_ref(),
            Partition::Observed => self.observed.as_ref(),
            Partition::Known => self.known.as_ref(),
            Partition::Static => None,
        }
    }

    fn slot_mut(&mut self, partition: Partition) -> Option<&mut Option<RegularSeries>> {
        match partition {
            Partition::Target => Some(&mut self.target),
            Partition::Observed => Some(&mut self.observed),
            Partition::Known => Some(&mut self.known),
            Partition::Static => None,
        }
    }

    fn validate(&self) -> Result<Frequency> {
        check(
            self.target.as_ref(),
            self.observed.as_ref(),
            self.known.as_ref(),
            self.static_covariates.as_ref(),
            Some(self.freq),
        )
    }

    /// Swap `candidate` into the `partition` slot, restoring the previous one when the new
    /// layout is invalid.
    pub(crate) fn commit_series(
        &mut self,
        partition: Partition,
        candidate: Option<RegularSeries>,
    ) -> Result<()> {
        let Some(slot) = self.slot_mut(partition) else {
            bail!(Type, "static covariates are not a series");
        };
        let previous = std::mem::replace(slot, candidate);
        match self.validate() {
            Ok(freq) => {
                self.freq = freq;
                Ok(())
            }
            Err(e) => {
                if let Some(slot) = self.slot_mut(partition) {
                    *slot = previous;
                }
                Err(e)
            }
        }
    }

    pub(crate) fn commit_static(&mut self, candidate: Option<StaticCovariates>) -> Result<()> {
        let candidate = candidate.filter(|m| !m.is_empty());
        let previous = std::mem::replace(&mut self.static_covariates, candidate);
        if let Err(e) = self.validate() {
            self.static_covariates = previous;
            return Err(e);
        }
        Ok(())
    }
}
