//! In-place assignment.
//!
//! Every method here validates its whole input and builds the replacement
//! values before touching the table, so an `Err` leaves the table exactly as
//! it was.

use lt_columnar::Column;
use lt_index::{Index, IndexLabel};
use lt_types::{DType, Scalar};

use crate::selector::{
    ColumnInput, Positions, RowLabels, normalize_position, resolve_positions, resolve_row_labels,
};
use crate::table::materialize;
use crate::{Axis, FrameError, Series, Table};

/// Expand a column input to exactly one value per addressed row.
///
/// `targets` holds the labels of the addressed rows; a series input is
/// aligned to them by label.
fn values_for_rows(input: ColumnInput, targets: &Index) -> Result<Vec<Scalar>, FrameError> {
    let selected = targets.len();
    let check_len = |provided: usize| {
        if provided == selected {
            Ok(())
        } else {
            Err(FrameError::AssignmentLengthMismatch { selected, provided })
        }
    };
    match input {
        ColumnInput::Scalar(value) => Ok(vec![value; selected]),
        ColumnInput::Values(values) => {
            check_len(values.len())?;
            Ok(values)
        }
        ColumnInput::Typed { dtype, values } => {
            check_len(values.len())?;
            Ok(Column::new(dtype, values)?.into_values())
        }
        ColumnInput::Series(series) => Ok(series.align_to(targets)?.into_column().into_values()),
    }
}

impl Table {
    /// Replace the column `label`, or append it when absent.
    ///
    /// A series input is aligned by row label; rows it lacks become
    /// not-available. An empty table with no columns adopts the input's
    /// row labels instead.
    pub fn assign_column(
        &mut self,
        label: impl Into<IndexLabel>,
        input: impl Into<ColumnInput>,
    ) -> Result<(), FrameError> {
        let label = label.into();
        let input = input.into();

        if self.num_columns() == 0 && self.is_empty() {
            let index = match &input {
                ColumnInput::Values(values) | ColumnInput::Typed { values, .. } => {
                    Some(Index::range(values.len()))
                }
                ColumnInput::Series(series) => Some(series.index().clone()),
                ColumnInput::Scalar(_) => None,
            };
            if let Some(index) = index {
                let column = materialize(input, &index)?;
                let table = Self::build(index, Index::new(vec![label.clone()]), vec![column])?;
                log::debug!("assigned column {label} to an empty table");
                *self = table;
                return Ok(());
            }
        }

        let column = materialize(input, self.index())
            .inspect_err(|err| log::debug!("rejected assignment to column {label}: {err}"))?;
        match self.columns().position(&label) {
            Some(pos) => {
                log::debug!("replacing column {label} ({:?})", column.dtype());
                self.data_mut()[pos] = column;
            }
            None => {
                log::debug!("appending column {label} ({:?})", column.dtype());
                let columns = self.columns().with_label(label);
                *self.columns_mut() = columns;
                self.data_mut().push(column);
            }
        }
        Ok(())
    }

    /// Overwrite one cell by label. The value must cast losslessly to the
    /// column's dtype.
    pub fn set_at(
        &mut self,
        row: impl Into<IndexLabel>,
        column: impl Into<IndexLabel>,
        value: impl Into<Scalar>,
    ) -> Result<(), FrameError> {
        let row = self.row_position(&row.into())?;
        let col = self.column_position(&column.into())?;
        self.write_cells(col, &[row], vec![value.into()])
    }

    /// Overwrite one cell by position.
    pub fn set_iat(
        &mut self,
        row: i64,
        column: i64,
        value: impl Into<Scalar>,
    ) -> Result<(), FrameError> {
        let row = normalize_position(row, self.len(), Axis::Rows)?;
        let col = normalize_position(column, self.num_columns(), Axis::Columns)?;
        self.write_cells(col, &[row], vec![value.into()])
    }

    /// Assign to the rows addressed by `rows` in one column.
    ///
    /// When the column does not exist it is created, with not-available in
    /// every row not addressed.
    pub fn set_loc(
        &mut self,
        rows: &RowLabels,
        column: impl Into<IndexLabel>,
        input: impl Into<ColumnInput>,
    ) -> Result<(), FrameError> {
        let column = column.into();
        let rows = resolve_row_labels(self.index(), rows)?;
        let targets = self.index().take(&rows.positions);
        let values = values_for_rows(input.into(), &targets)
            .inspect_err(|err| log::debug!("rejected assignment to column {column}: {err}"))?;

        match self.columns().position(&column) {
            Some(col) => self.write_cells(col, &rows.positions, values),
            None => {
                let mut created = Column::all_missing(DType::Null, self.len())?;
                created.replace_at(&rows.positions, values)?;
                log::debug!(
                    "created column {column} ({:?}) from {} assigned rows",
                    created.dtype(),
                    rows.positions.len()
                );
                let columns = self.columns().with_label(column);
                *self.columns_mut() = columns;
                self.data_mut().push(created);
                Ok(())
            }
        }
    }

    /// Assign to the rows addressed by `rows` in the column at `column`.
    pub fn set_iloc(
        &mut self,
        rows: &Positions,
        column: i64,
        input: impl Into<ColumnInput>,
    ) -> Result<(), FrameError> {
        let col = normalize_position(column, self.num_columns(), Axis::Columns)?;
        let rows = resolve_positions(self.len(), rows, Axis::Rows)?;
        let targets = self.index().take(&rows.positions);
        let values = values_for_rows(input.into(), &targets)?;
        self.write_cells(col, &rows.positions, values)
    }

    /// Overwrite a whole row by label, one value per column.
    pub fn set_row(
        &mut self,
        row: impl Into<IndexLabel>,
        values: Vec<Scalar>,
    ) -> Result<(), FrameError> {
        let row = self.row_position(&row.into())?;
        self.write_row(row, values)
    }

    /// Overwrite a whole row by position.
    pub fn set_irow(&mut self, row: i64, values: Vec<Scalar>) -> Result<(), FrameError> {
        let row = normalize_position(row, self.len(), Axis::Rows)?;
        self.write_row(row, values)
    }

    /// Replace every non-missing cell satisfying `predicate` with
    /// `replace(cell)`. Returns the number of cells written.
    ///
    /// All replacements are cast before any column is swapped in.
    pub fn set_where<P, R>(&mut self, predicate: P, replace: R) -> Result<usize, FrameError>
    where
        P: Fn(&Scalar) -> bool,
        R: Fn(&Scalar) -> Scalar,
    {
        let mut written = 0;
        let mut updated = Vec::with_capacity(self.num_columns());
        for column in self.data() {
            let (positions, values): (Vec<usize>, Vec<Scalar>) = column
                .values()
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.is_missing() && predicate(*value))
                .map(|(pos, value)| (pos, replace(value)))
                .unzip();
            if positions.is_empty() {
                updated.push(None);
                continue;
            }
            let mut next = column.clone();
            next.replace_at(&positions, values)
                .inspect_err(|err| log::debug!("rejected masked assignment: {err}"))?;
            written += positions.len();
            updated.push(Some(next));
        }

        for (slot, next) in self.data_mut().iter_mut().zip(updated) {
            if let Some(next) = next {
                *slot = next;
            }
        }
        log::debug!("masked assignment wrote {written} cells");
        Ok(written)
    }

    /// Remove a column, returning it as a series.
    pub fn drop_column(&mut self, label: impl Into<IndexLabel>) -> Result<Series, FrameError> {
        let label = label.into();
        let pos = self.column_position(&label)?;
        let remaining: Vec<usize> = (0..self.num_columns()).filter(|&c| c != pos).collect();
        let columns = self.columns().take(&remaining);
        let column = self.data_mut().remove(pos);
        *self.columns_mut() = columns;
        log::debug!("dropped column {label}");
        Series::new(label, self.index().clone(), column)
    }

    fn write_cells(
        &mut self,
        col: usize,
        rows: &[usize],
        values: Vec<Scalar>,
    ) -> Result<(), FrameError> {
        let label = self.columns().labels()[col].clone();
        self.data_mut()[col]
            .replace_at(rows, values)
            .inspect_err(|err| log::debug!("rejected assignment to column {label}: {err}"))?;
        log::debug!("wrote {} cells in column {label}", rows.len());
        Ok(())
    }

    fn write_row(&mut self, row: usize, values: Vec<Scalar>) -> Result<(), FrameError> {
        if values.len() != self.num_columns() {
            return Err(FrameError::AssignmentLengthMismatch {
                selected: self.num_columns(),
                provided: values.len(),
            });
        }
        let updated = self
            .data()
            .iter()
            .zip(values)
            .map(|(column, value)| -> Result<Column, FrameError> {
                let mut next = column.clone();
                next.replace_at(&[row], vec![value])?;
                Ok(next)
            })
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|err| log::debug!("rejected row assignment: {err}"))?;
        *self.data_mut() = updated;
        log::debug!("wrote row {}", self.index().labels()[row]);
        Ok(())
    }
}
