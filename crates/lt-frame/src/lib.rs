#![forbid(unsafe_code)]

//! Labeled two-dimensional tables.
//!
//! A [`Table`] is an ordered set of typed [`Column`]s sharing one row
//! [`Index`], addressed by label ([`Table::loc`], [`Table::at`]) or by
//! position ([`Table::iloc`], [`Table::iat`]). Missing cells hold a distinct
//! not-available [`Scalar`] that never compares equal to anything.

use std::fmt;

use lt_columnar::ColumnError;
use lt_index::IndexError;
use lt_types::TypeError;
use thiserror::Error;

mod mutate;
mod options;
mod selector;
mod series;
mod table;

pub use chrono::NaiveDate;
pub use lt_columnar::{Column, ComparisonOp};
pub use lt_index::{Index, IndexLabel};
pub use lt_types::{DType, NullKind, Scalar};
pub use options::{FrameOptions, NaPosition};
pub use selector::{ColumnInput, ColumnLabels, Positions, RowLabels, Selection};
pub use series::Series;
pub use table::{DropNaHow, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows => f.write_str("row"),
            Self::Columns => f.write_str("column"),
        }
    }
}

/// The four contract violations a table operation can report, plus
/// configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Length or dimension mismatch, including a date range too long for
    /// the calendar.
    Shape,
    /// Unknown or duplicate label.
    Key,
    /// Position outside an axis.
    Index,
    /// Value incompatible with a column's dtype.
    Type,
    Config,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("index length ({index_len}) does not match column length ({column_len})")]
    LengthMismatch { index_len: usize, column_len: usize },
    #[error("{labels} column labels given for {columns} columns")]
    ColumnCountMismatch { labels: usize, columns: usize },
    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{selected} rows selected but {provided} values provided")]
    AssignmentLengthMismatch { selected: usize, provided: usize },
    #[error("boolean mask of length {mask_len} cannot select from {len} rows")]
    MaskLengthMismatch { mask_len: usize, len: usize },
    #[error("constructing from scalar values alone requires row labels")]
    ScalarsRequireIndex,
    #[error("duplicate {axis} label: {label}")]
    DuplicateLabel { axis: Axis, label: IndexLabel },
    #[error("{axis} label not found: {label}")]
    LabelNotFound { axis: Axis, label: IndexLabel },
    #[error("{axis} position {position} out of bounds for length {len}")]
    PositionOutOfBounds {
        axis: Axis,
        position: i64,
        len: usize,
    },
    #[error("boolean mask required; found dtype {0:?}")]
    NonBooleanMask(DType),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FrameError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LengthMismatch { .. }
            | Self::ColumnCountMismatch { .. }
            | Self::RaggedRows { .. }
            | Self::AssignmentLengthMismatch { .. }
            | Self::MaskLengthMismatch { .. }
            | Self::ScalarsRequireIndex => ErrorKind::Shape,
            Self::DuplicateLabel { .. } | Self::LabelNotFound { .. } => ErrorKind::Key,
            Self::PositionOutOfBounds { .. } => ErrorKind::Index,
            Self::NonBooleanMask(_) | Self::Type(_) => ErrorKind::Type,
            Self::InvalidOptions(_) | Self::Json(_) => ErrorKind::Config,
            Self::Column(err) => match err {
                ColumnError::LengthMismatch { .. } => ErrorKind::Shape,
                ColumnError::PositionOutOfBounds { .. } => ErrorKind::Index,
                ColumnError::Type(_) => ErrorKind::Type,
            },
            Self::Index(err) => match err {
                IndexError::InvalidAlignmentVectors => ErrorKind::Shape,
                IndexError::SliceBoundNotFound(_) => ErrorKind::Key,
                IndexError::DateOutOfRange { .. } => ErrorKind::Shape,
            },
        }
    }

    pub(crate) fn row_not_found(label: &IndexLabel) -> Self {
        Self::LabelNotFound {
            axis: Axis::Rows,
            label: label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use lt_columnar::ColumnError;
    use lt_types::TypeError;

    use super::{Axis, ErrorKind, FrameError, Index, IndexLabel, NaiveDate, Series, Table};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn tables_and_series_are_shareable_across_threads() {
        assert_send_sync::<Table>();
        assert_send_sync::<Series>();
        assert_send_sync::<Index>();
    }

    #[test]
    fn overlong_date_range_is_a_shape_error() {
        let err = FrameError::from(Index::date_range(NaiveDate::MAX, 2).expect_err("overflow"));
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn error_kinds_cover_contract_violations() {
        let shape = FrameError::LengthMismatch {
            index_len: 2,
            column_len: 3,
        };
        assert_eq!(shape.kind(), ErrorKind::Shape);

        let key = FrameError::LabelNotFound {
            axis: Axis::Columns,
            label: IndexLabel::from("Z"),
        };
        assert_eq!(key.kind(), ErrorKind::Key);
        assert_eq!(key.to_string(), "column label not found: Z");

        let index = FrameError::PositionOutOfBounds {
            axis: Axis::Rows,
            position: 9,
            len: 6,
        };
        assert_eq!(index.kind(), ErrorKind::Index);

        let ty = FrameError::from(ColumnError::from(TypeError::LossyFloatToInt { value: 1.5 }));
        assert_eq!(ty.kind(), ErrorKind::Type);
    }
}
