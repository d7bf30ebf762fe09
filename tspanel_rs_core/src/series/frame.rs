use super::{column::Column, index::TimeIndex};

mod indexing;
mod load;
mod meta;
mod ops;

/// A rectangular table of named columns keyed by a regular time axis.
///
/// Every column has exactly `index.len()` rows and column names are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularSeries {
    index: TimeIndex,
    columns: Vec<String>,
    values: Vec<Column>,
}
