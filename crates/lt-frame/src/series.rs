use std::cmp::Ordering;

use lt_columnar::{Column, ComparisonOp};
use lt_index::{Index, IndexLabel, align_left, validate_alignment_plan};
use lt_types::{DType, Scalar, nanmax, nanmean, nanmin, nanstd, nansum};

use crate::selector::normalize_position;
use crate::table::first_duplicate;
use crate::{Axis, FrameError, FrameOptions, NaPosition};

/// One labeled column: a name, a row index and typed values.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: IndexLabel,
    index: Index,
    column: Column,
}

pub(crate) fn compare_non_missing_scalars_for_sort(left: &Scalar, right: &Scalar) -> Ordering {
    match (left, right) {
        (Scalar::Bool(lhs), Scalar::Bool(rhs)) => lhs.cmp(rhs),
        (Scalar::Int64(lhs), Scalar::Int64(rhs)) => lhs.cmp(rhs),
        (Scalar::Utf8(lhs), Scalar::Utf8(rhs)) => lhs.cmp(rhs),
        (Scalar::Date(lhs), Scalar::Date(rhs)) => lhs.cmp(rhs),
        (Scalar::Float64(_) | Scalar::Int64(_), Scalar::Float64(_) | Scalar::Int64(_)) => {
            match (left.to_f64(), right.to_f64()) {
                (Ok(lhs), Ok(rhs)) => lhs.total_cmp(&rhs),
                _ => Ordering::Equal,
            }
        }
        // Object columns can mix kinds: order by dtype first.
        _ => left.dtype().cmp(&right.dtype()),
    }
}

pub(crate) fn compare_scalars_for_sort(
    left: &Scalar,
    right: &Scalar,
    ascending: bool,
    na_position: NaPosition,
) -> Ordering {
    let missing_order = match na_position {
        NaPosition::Last => Ordering::Greater,
        NaPosition::First => Ordering::Less,
    };
    match (left.is_missing(), right.is_missing()) {
        (true, true) => Ordering::Equal,
        (true, false) => missing_order,
        (false, true) => missing_order.reverse(),
        (false, false) => {
            let order = compare_non_missing_scalars_for_sort(left, right);
            if ascending { order } else { order.reverse() }
        }
    }
}

impl Series {
    pub fn new(
        name: impl Into<IndexLabel>,
        index: Index,
        column: Column,
    ) -> Result<Self, FrameError> {
        if index.len() != column.len() {
            return Err(FrameError::LengthMismatch {
                index_len: index.len(),
                column_len: column.len(),
            });
        }

        Ok(Self {
            name: name.into(),
            index,
            column,
        })
    }

    pub fn from_values(
        name: impl Into<IndexLabel>,
        index_labels: Vec<IndexLabel>,
        values: Vec<Scalar>,
    ) -> Result<Self, FrameError> {
        let index = Index::new(index_labels);
        let column = Column::from_values(values)?;
        Self::new(name, index, column)
    }

    #[must_use]
    pub fn name(&self) -> &IndexLabel {
        &self.name
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn column(&self) -> &Column {
        &self.column
    }

    pub(crate) fn into_column(self) -> Column {
        self.column
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        self.column.values()
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.column.dtype()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Value at a row label.
    pub fn get(&self, label: impl Into<IndexLabel>) -> Result<&Scalar, FrameError> {
        let label = label.into();
        let position = self
            .index
            .position(&label)
            .ok_or_else(|| FrameError::row_not_found(&label))?;
        Ok(&self.column.values()[position])
    }

    /// Value at a position; negative positions count from the end.
    pub fn iget(&self, position: i64) -> Result<&Scalar, FrameError> {
        let position = normalize_position(position, self.len(), Axis::Rows)?;
        Ok(&self.column.values()[position])
    }

    fn with_column(&self, column: Column) -> Result<Self, FrameError> {
        Self::new(self.name.clone(), self.index.clone(), column)
    }

    fn take(&self, positions: &[usize]) -> Result<Self, FrameError> {
        let column = self.column.take(positions)?;
        Self::new(self.name.clone(), self.index.take(positions), column)
    }

    /// Element-wise comparison against a scalar, producing a boolean mask.
    /// Missing elements produce missing mask entries.
    pub fn compare_scalar(&self, scalar: &Scalar, op: ComparisonOp) -> Result<Self, FrameError> {
        self.with_column(self.column.compare_scalar(scalar, op)?)
    }

    pub fn gt(&self, scalar: impl Into<Scalar>) -> Result<Self, FrameError> {
        self.compare_scalar(&scalar.into(), ComparisonOp::Gt)
    }

    pub fn lt(&self, scalar: impl Into<Scalar>) -> Result<Self, FrameError> {
        self.compare_scalar(&scalar.into(), ComparisonOp::Lt)
    }

    /// Boolean mask marking elements contained in `candidates`.
    pub fn isin(&self, candidates: &[Scalar]) -> Result<Self, FrameError> {
        self.with_column(self.column.isin(candidates)?)
    }

    /// Interpret this series as a row mask: `true` keeps, missing counts as
    /// `false`. Fails unless every value is Bool or missing.
    pub(crate) fn to_mask(&self) -> Result<Vec<bool>, FrameError> {
        if !matches!(self.dtype(), DType::Bool | DType::Null) {
            return Err(FrameError::NonBooleanMask(self.dtype()));
        }
        Ok(self
            .values()
            .iter()
            .map(|value| matches!(value, Scalar::Bool(true)))
            .collect())
    }

    /// Conform this mask to `index`: positionally when the indexes are
    /// identical, by label otherwise (absent labels count as `false`).
    pub(crate) fn mask_for(&self, index: &Index) -> Result<Vec<bool>, FrameError> {
        if &self.index == index {
            self.to_mask()
        } else {
            self.align_to(index)?.to_mask()
        }
    }

    /// Keep elements whose label maps to `true` in `mask`.
    pub fn filter(&self, mask: &Self) -> Result<Self, FrameError> {
        let positions: Vec<usize> = mask
            .mask_for(&self.index)?
            .iter()
            .enumerate()
            .filter_map(|(pos, &keep)| keep.then_some(pos))
            .collect();
        self.take(&positions)
    }

    /// Conform to `target` by label: matched labels copy their value,
    /// unmatched ones become not-available. Duplicate labels in this series
    /// are rejected, since the match would be ambiguous.
    pub fn align_to(&self, target: &Index) -> Result<Self, FrameError> {
        if let Some(label) = first_duplicate(&self.index) {
            return Err(FrameError::DuplicateLabel {
                axis: Axis::Rows,
                label,
            });
        }

        let plan = align_left(target, &self.index);
        validate_alignment_plan(&plan)?;
        let unmatched = plan.unmatched_right();
        if unmatched > 0 {
            log::debug!(
                "aligning series {} onto {} labels: {unmatched} unmatched filled with not-available",
                self.name,
                target.len()
            );
        }
        let column = self.column.reindex_by_positions(&plan.right_positions)?;
        Self::new(self.name.clone(), plan.union_index, column)
    }

    /// Reindex to new labels, filling labels not present with not-available.
    pub fn reindex(&self, labels: Vec<IndexLabel>) -> Result<Self, FrameError> {
        self.align_to(&Index::new(labels))
    }

    pub fn sort_values(&self, ascending: bool) -> Result<Self, FrameError> {
        self.sort_values_with(ascending, &FrameOptions::default())
    }

    /// Stable sort by value; not-available placement follows `options`.
    pub fn sort_values_with(
        &self,
        ascending: bool,
        options: &FrameOptions,
    ) -> Result<Self, FrameError> {
        let mut order = (0..self.len()).collect::<Vec<_>>();
        order.sort_by(|&left, &right| {
            compare_scalars_for_sort(
                &self.values()[left],
                &self.values()[right],
                ascending,
                options.na_position,
            )
        });
        self.take(&order)
    }

    /// Number of non-missing values.
    #[must_use]
    pub fn count(&self) -> usize {
        self.column.validity().count_valid()
    }

    fn numeric_values(&self) -> Result<&[Scalar], FrameError> {
        match self.dtype() {
            DType::Bool | DType::Int64 | DType::Float64 | DType::Null => Ok(self.values()),
            other => Err(FrameError::Type(lt_types::TypeError::NonNumericValue {
                value: self.name.to_string(),
                dtype: other,
            })),
        }
    }

    pub fn sum(&self) -> Result<Scalar, FrameError> {
        Ok(nansum(self.numeric_values()?))
    }

    pub fn mean(&self) -> Result<Scalar, FrameError> {
        Ok(nanmean(self.numeric_values()?))
    }

    /// Sample standard deviation (`ddof = 1`).
    pub fn std(&self) -> Result<Scalar, FrameError> {
        Ok(nanstd(self.numeric_values()?, 1))
    }

    pub fn min(&self) -> Result<Scalar, FrameError> {
        Ok(nanmin(self.numeric_values()?))
    }

    pub fn max(&self) -> Result<Scalar, FrameError> {
        Ok(nanmax(self.numeric_values()?))
    }
}
