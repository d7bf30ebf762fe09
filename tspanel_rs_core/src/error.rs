use std::io;
use thiserror::Error;

/// Errors raised by [`crate::series::RegularSeries`] and [`crate::panel::Panel`].
///
/// The variants follow the failure classes of the data model:
/// - `Schema`: malformed or inconsistent input (duplicate columns, gapped or duplicated time
///   axis, unresolved frequency).
/// - `Value`: out-of-range points, unknown columns, partition invariant violations, concat
///   conflicts.
/// - `Type`: wrong point / value kind, incompatible casts.
/// - `Key`: unknown column names in a per-column cast.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("schema error: {0}")]
    Schema(String),
    #[error("value error: {0}")]
    Value(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("key error: {0}")]
    Key(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("corrupted panel bytes: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, PanelError>;

macro_rules! bail {
    ($kind:ident, $($arg:tt)*) => {
        return Err($crate::error::PanelError::$kind(format!($($arg)*)))
    };
}
pub(crate) use bail;

macro_rules! ensure {
    ($cond:expr, $kind:ident, $($arg:tt)*) => {
        if !$cond {
            $crate::error::bail!($kind, $($arg)*);
        }
    };
}
pub(crate) use ensure;

impl PanelError {
    pub fn is_schema(&self) -> bool {
        matches!(self, PanelError::Schema(_))
    }
    pub fn is_value(&self) -> bool {
        matches!(self, PanelError::Value(_))
    }
    pub fn is_type(&self) -> bool {
        matches!(self, PanelError::Type(_))
    }
    pub fn is_key(&self) -> bool {
        matches!(self, PanelError::Key(_))
    }
}
