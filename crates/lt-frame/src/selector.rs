use lt_index::{Index, IndexLabel};
use lt_types::{DType, Scalar};

use crate::{Axis, FrameError, Series, Table};

/// Row selector for label-based access.
#[derive(Debug, Clone, PartialEq)]
pub enum RowLabels {
    All,
    Label(IndexLabel),
    Labels(Vec<IndexLabel>),
    /// Inclusive of both endpoints; `None` leaves that side open.
    Range {
        start: Option<IndexLabel>,
        end: Option<IndexLabel>,
    },
    /// One flag per row; `true` selects the row.
    Mask(Vec<bool>),
}

impl RowLabels {
    pub fn label(label: impl Into<IndexLabel>) -> Self {
        Self::Label(label.into())
    }

    pub fn labels<L: Into<IndexLabel>>(labels: impl IntoIterator<Item = L>) -> Self {
        Self::Labels(labels.into_iter().map(Into::into).collect())
    }

    pub fn range(start: impl Into<IndexLabel>, end: impl Into<IndexLabel>) -> Self {
        Self::Range {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }
}

/// Column selector for label-based access.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnLabels {
    All,
    Label(IndexLabel),
    Labels(Vec<IndexLabel>),
}

impl ColumnLabels {
    pub fn label(label: impl Into<IndexLabel>) -> Self {
        Self::Label(label.into())
    }

    pub fn labels<L: Into<IndexLabel>>(labels: impl IntoIterator<Item = L>) -> Self {
        Self::Labels(labels.into_iter().map(Into::into).collect())
    }
}

/// Position selector. Negative positions count from the end of the axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Positions {
    All,
    At(i64),
    List(Vec<i64>),
    /// Half-open `[start, end)`, clamped to the axis like slice syntax.
    Range { start: Option<i64>, end: Option<i64> },
}

impl Positions {
    #[must_use]
    pub fn range(start: i64, end: i64) -> Self {
        Self::Range {
            start: Some(start),
            end: Some(end),
        }
    }
}

/// Result of a general selection, shaped by how many rows and columns were
/// addressed by a single label or position.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Scalar(Scalar),
    Series(Series),
    Table(Table),
}

impl Selection {
    #[must_use]
    pub fn into_scalar(self) -> Option<Scalar> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_series(self) -> Option<Series> {
        match self {
            Self::Series(series) => Some(series),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_table(self) -> Option<Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }
}

/// Values for a column, as accepted by construction and assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnInput {
    /// Positional values; dtype inferred.
    Values(Vec<Scalar>),
    /// Positional values with a declared dtype.
    Typed { dtype: DType, values: Vec<Scalar> },
    /// Broadcast to every addressed row.
    Scalar(Scalar),
    /// Aligned by row label; unmatched rows become not-available.
    Series(Series),
}

impl From<Vec<Scalar>> for ColumnInput {
    fn from(values: Vec<Scalar>) -> Self {
        Self::Values(values)
    }
}

impl From<Scalar> for ColumnInput {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<Series> for ColumnInput {
    fn from(series: Series) -> Self {
        Self::Series(series)
    }
}

/// Positions addressed along one axis, and whether a single label or
/// position addressed them (which collapses that axis in the result).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub positions: Vec<usize>,
    pub single: bool,
}

impl Resolved {
    fn many(positions: Vec<usize>) -> Self {
        Self {
            positions,
            single: false,
        }
    }

    fn one(position: usize) -> Self {
        Self {
            positions: vec![position],
            single: true,
        }
    }
}

pub(crate) fn lookup(index: &Index, label: &IndexLabel, axis: Axis) -> Result<usize, FrameError> {
    index.position(label).ok_or_else(|| FrameError::LabelNotFound {
        axis,
        label: label.clone(),
    })
}

pub(crate) fn resolve_row_labels(index: &Index, rows: &RowLabels) -> Result<Resolved, FrameError> {
    match rows {
        RowLabels::All => Ok(Resolved::many((0..index.len()).collect())),
        RowLabels::Label(label) => Ok(Resolved::one(lookup(index, label, Axis::Rows)?)),
        RowLabels::Labels(labels) => labels
            .iter()
            .map(|label| lookup(index, label, Axis::Rows))
            .collect::<Result<Vec<_>, _>>()
            .map(Resolved::many),
        RowLabels::Range { start, end } => {
            let (lo, hi) = index.slice_locs(start.as_ref(), end.as_ref())?;
            Ok(Resolved::many((lo..hi).collect()))
        }
        RowLabels::Mask(mask) => {
            if mask.len() != index.len() {
                return Err(FrameError::MaskLengthMismatch {
                    mask_len: mask.len(),
                    len: index.len(),
                });
            }
            Ok(Resolved::many(
                mask.iter()
                    .enumerate()
                    .filter_map(|(pos, &keep)| keep.then_some(pos))
                    .collect(),
            ))
        }
    }
}

pub(crate) fn resolve_column_labels(
    columns: &Index,
    selector: &ColumnLabels,
) -> Result<Resolved, FrameError> {
    match selector {
        ColumnLabels::All => Ok(Resolved::many((0..columns.len()).collect())),
        ColumnLabels::Label(label) => Ok(Resolved::one(lookup(columns, label, Axis::Columns)?)),
        ColumnLabels::Labels(labels) => labels
            .iter()
            .map(|label| lookup(columns, label, Axis::Columns))
            .collect::<Result<Vec<_>, _>>()
            .map(Resolved::many),
    }
}

pub(crate) fn normalize_position(position: i64, len: usize, axis: Axis) -> Result<usize, FrameError> {
    let out_of_bounds = || FrameError::PositionOutOfBounds {
        axis,
        position,
        len,
    };
    let len_i64 = i64::try_from(len).map_err(|_| out_of_bounds())?;
    let normalized = if position < 0 {
        len_i64 + position
    } else {
        position
    };
    if normalized < 0 || normalized >= len_i64 {
        return Err(out_of_bounds());
    }
    usize::try_from(normalized).map_err(|_| out_of_bounds())
}

fn clamp_slice_bound(bound: i64, len: usize) -> usize {
    let len_i64 = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if bound < 0 { len_i64 + bound } else { bound };
    usize::try_from(resolved.clamp(0, len_i64)).unwrap_or(len)
}

pub(crate) fn resolve_positions(
    len: usize,
    selector: &Positions,
    axis: Axis,
) -> Result<Resolved, FrameError> {
    match selector {
        Positions::All => Ok(Resolved::many((0..len).collect())),
        Positions::At(position) => Ok(Resolved::one(normalize_position(*position, len, axis)?)),
        Positions::List(positions) => positions
            .iter()
            .map(|&position| normalize_position(position, len, axis))
            .collect::<Result<Vec<_>, _>>()
            .map(Resolved::many),
        Positions::Range { start, end } => {
            let lo = start.map_or(0, |s| clamp_slice_bound(s, len));
            let hi = end.map_or(len, |e| clamp_slice_bound(e, len));
            Ok(Resolved::many((lo..hi.max(lo)).collect()))
        }
    }
}
