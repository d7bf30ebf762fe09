//! # tspanel_core
//!
//! regularly sampled multivariate time series ([`RegularSeries`]) and the panel that groups them
//! by role ([`Panel`])

pub mod analysis;
pub mod error;
pub mod fill;
pub mod panel;
pub mod series;
pub mod table;
pub mod toolkit;

pub use analysis::{OperatorArgs, OperatorOutput, OperatorRegistry};
pub use error::{PanelError, Result};
pub use fill::{Fill, FillMethod};
pub use panel::{Panel, PanelOptions, Partition, StaticCovariates, WriteValue};
pub use series::{
    CastSpec, Column, ConcatAxis, Dtype, Frequency, IndexedColumn, RegularSeries, Scalar, SliceKey,
    TimeIndex, TimePoint,
};
pub use table::DataTable;
