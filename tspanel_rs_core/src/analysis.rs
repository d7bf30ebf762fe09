//! # analysis
//!
//! named analysis operators over panels, dispatched through an [`OperatorRegistry`]

use crate::{
    error::PanelError,
    panel::{Panel, Partition},
    toolkit::array,
};
use anyhow::Result;
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use std::{collections::HashMap, fmt, sync::OnceLock};

/// Arguments shared by every operator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorArgs {
    /// columns to analyze, every time-varying column when `None`
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorOutput {
    /// one value per column, in column order
    Stats(Vec<(String, f64)>),
    /// a square column-by-column matrix
    Matrix {
        columns: Vec<String>,
        values: Array2<f64>,
    },
}

pub type Operator = fn(&Panel, &OperatorArgs) -> Result<OperatorOutput>;

#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: HashMap<String, Operator>,
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.names())
            .finish()
    }
}

/// the requested columns as float64 arrays, missing cells as `NaN`
fn numeric_columns(panel: &Panel, args: &OperatorArgs) -> Result<Vec<(String, Array1<f64>)>> {
    let names = match &args.columns {
        Some(columns) => columns.clone(),
        None => panel
            .columns()
            .into_iter()
            .filter(|(_, p)| *p != Partition::Static)
            .map(|(name, _)| name)
            .collect(),
    };
    let frame = panel.read(&names)?;
    let columns = frame
        .columns()
        .iter()
        .zip(frame.values())
        .map(|(name, column)| Ok((name.clone(), column.try_to_f64()?)))
        .collect::<crate::error::Result<Vec<_>>>()?;
    Ok(columns)
}

fn column_stats(
    panel: &Panel,
    args: &OperatorArgs,
    reduce: fn(ArrayView1<f64>) -> f64,
) -> Result<OperatorOutput> {
    let columns = numeric_columns(panel, args)?;
    let stats = columns
        .par_iter()
        .map(|(name, values)| (name.clone(), reduce(values.view())))
        .collect();
    Ok(OperatorOutput::Stats(stats))
}

fn mean(panel: &Panel, args: &OperatorArgs) -> Result<OperatorOutput> {
    column_stats(panel, args, array::mean)
}
fn max(panel: &Panel, args: &OperatorArgs) -> Result<OperatorOutput> {
    column_stats(panel, args, array::max)
}
fn min(panel: &Panel, args: &OperatorArgs) -> Result<OperatorOutput> {
    column_stats(panel, args, array::min)
}
fn std(panel: &Panel, args: &OperatorArgs) -> Result<OperatorOutput> {
    column_stats(panel, args, array::std)
}
fn count(panel: &Panel, args: &OperatorArgs) -> Result<OperatorOutput> {
    column_stats(panel, args, |values| array::count(values) as f64)
}

fn corr(panel: &Panel, args: &OperatorArgs) -> Result<OperatorOutput> {
    let columns = numeric_columns(panel, args)?;
    let n = columns.len();
    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .map(|j| array::corr(columns[i].1.view(), columns[j].1.view()))
                .collect()
        })
        .collect();
    let values = Array2::from_shape_vec((n, n), rows.concat())?;
    Ok(OperatorOutput::Matrix {
        columns: columns.into_iter().map(|(name, _)| name).collect(),
        values,
    })
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// a registry holding `mean`, `max`, `min`, `std`, `count` and `corr`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("mean", mean);
        registry.register("max", max);
        registry.register("min", min);
        registry.register("std", std);
        registry.register("count", count);
        registry.register("corr", corr);
        registry
    }

    /// the process-wide built-in registry
    pub fn builtins() -> &'static OperatorRegistry {
        static BUILTINS: OnceLock<OperatorRegistry> = OnceLock::new();
        BUILTINS.get_or_init(OperatorRegistry::with_builtins)
    }

    /// register `operator` under `name`, replacing any previous one
    pub fn register(&mut self, name: &str, operator: Operator) {
        if self.operators.insert(name.to_string(), operator).is_some() {
            log::warn!("operator `{name}` is overridden");
        }
    }

    pub fn get(&self, name: &str) -> Option<Operator> {
        self.operators.get(name).copied()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn invoke(&self, name: &str, panel: &Panel, args: &OperatorArgs) -> Result<OperatorOutput> {
        let Some(operator) = self.get(name) else {
            return Err(PanelError::Value(format!("unknown operator `{name}`")).into());
        };
        log::debug!("invoking operator `{name}`");
        operator(panel, args)
    }
}

impl Panel {
    /// run the built-in operator `name`
    pub fn invoke(&self, name: &str, args: &OperatorArgs) -> Result<OperatorOutput> {
        OperatorRegistry::builtins().invoke(name, self, args)
    }
}
