use std::collections::HashSet;

use lt_columnar::Column;
use lt_index::{Index, IndexLabel, align_left, align_union};
use lt_types::{DType, Scalar, nanmax, nanmean, nanmin, nanquantile, nanstd};

use crate::selector::{
    ColumnInput, ColumnLabels, Positions, Resolved, RowLabels, Selection, lookup,
    normalize_position, resolve_column_labels, resolve_positions, resolve_row_labels,
};
use crate::series::compare_scalars_for_sort;
use crate::{Axis, FrameError, FrameOptions, Series};

/// A two-dimensional table: one row [`Index`], one column [`Index`] and one
/// typed [`Column`] per column label.
///
/// Every column has exactly as many values as there are row labels, and
/// labels are unique along both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index: Index,
    columns: Index,
    data: Vec<Column>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropNaHow {
    #[default]
    Any,
    All,
}

/// First position that occurs more than once in a selection.
fn repeated_position(positions: &[usize]) -> Option<usize> {
    let mut seen = HashSet::with_capacity(positions.len());
    positions.iter().copied().find(|&pos| !seen.insert(pos))
}

pub(crate) fn first_duplicate(index: &Index) -> Option<IndexLabel> {
    if !index.has_duplicates() {
        return None;
    }
    let mut seen = HashSet::with_capacity(index.len());
    index
        .labels()
        .iter()
        .find(|label| !seen.insert(*label))
        .cloned()
}

fn saturating_i64_to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn normalize_head_take(n: i64, len: usize) -> usize {
    if n >= 0 {
        saturating_i64_to_usize(n).min(len)
    } else {
        len.saturating_sub(saturating_i64_to_usize(n.saturating_neg()))
    }
}

fn normalize_tail_start(n: i64, len: usize) -> usize {
    if n >= 0 {
        len - saturating_i64_to_usize(n).min(len)
    } else {
        saturating_i64_to_usize(n.saturating_neg()).min(len)
    }
}

fn percentile_label(q: f64) -> IndexLabel {
    let pct = (q * 100.0 * 1e6).round() / 1e6;
    IndexLabel::Utf8(format!("{pct}%"))
}

impl Table {
    /// Assemble a table, checking the shape and uniqueness invariants.
    pub(crate) fn build(index: Index, columns: Index, data: Vec<Column>) -> Result<Self, FrameError> {
        if columns.len() != data.len() {
            return Err(FrameError::ColumnCountMismatch {
                labels: columns.len(),
                columns: data.len(),
            });
        }
        if let Some(column) = data.iter().find(|column| column.len() != index.len()) {
            return Err(FrameError::LengthMismatch {
                index_len: index.len(),
                column_len: column.len(),
            });
        }
        if let Some(label) = first_duplicate(&index) {
            return Err(FrameError::DuplicateLabel {
                axis: Axis::Rows,
                label,
            });
        }
        if let Some(label) = first_duplicate(&columns) {
            return Err(FrameError::DuplicateLabel {
                axis: Axis::Columns,
                label,
            });
        }
        Ok(Self {
            index,
            columns,
            data,
        })
    }

    /// Build from row-major values.
    ///
    /// Without row labels the rows are labeled `0..n`; without column labels
    /// the columns are labeled `0..m` and the width is taken from the first
    /// row. Each column's dtype is inferred from its values.
    pub fn from_rows(
        rows: Vec<Vec<Scalar>>,
        row_labels: Option<Vec<IndexLabel>>,
        column_labels: Option<Vec<IndexLabel>>,
    ) -> Result<Self, FrameError> {
        let width = match &column_labels {
            Some(labels) => labels.len(),
            None => rows.first().map_or(0, Vec::len),
        };
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != width)
            .map(|(row, values)| (row, values.len()))
        {
            return Err(FrameError::RaggedRows {
                row,
                expected: width,
                found,
            });
        }

        let index = match row_labels {
            Some(labels) if labels.len() != rows.len() => {
                return Err(FrameError::LengthMismatch {
                    index_len: labels.len(),
                    column_len: rows.len(),
                });
            }
            Some(labels) => Index::new(labels),
            None => Index::range(rows.len()),
        };
        let columns = column_labels.map_or_else(|| Index::range(width), Index::new);

        let mut by_column: Vec<Vec<Scalar>> =
            (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
        for row in rows {
            for (slot, value) in by_column.iter_mut().zip(row) {
                slot.push(value);
            }
        }
        let data = by_column
            .into_iter()
            .map(Column::from_values)
            .collect::<Result<Vec<_>, _>>()?;

        Self::build(index, columns, data)
    }

    /// Build from an ordered mapping of column label to column input.
    ///
    /// Without row labels, the index is the union of any `Series` inputs'
    /// indexes, or `0..n` for plain value vectors. Scalars broadcast to every
    /// row, so a table made only of scalars needs explicit row labels.
    pub fn from_columns(
        columns: Vec<(IndexLabel, ColumnInput)>,
        row_labels: Option<Vec<IndexLabel>>,
    ) -> Result<Self, FrameError> {
        let index = match row_labels {
            Some(labels) => Index::new(labels),
            None => Self::infer_index(&columns)?,
        };

        let mut labels = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        for (label, input) in columns {
            data.push(materialize(input, &index)?);
            labels.push(label);
        }

        Self::build(index, Index::new(labels), data)
    }

    fn infer_index(columns: &[(IndexLabel, ColumnInput)]) -> Result<Index, FrameError> {
        let mut union: Option<Index> = None;
        for (_, input) in columns {
            if let ColumnInput::Series(series) = input {
                union = Some(match union {
                    None => series.index().clone(),
                    Some(acc) => align_union(&acc, series.index()).union_index,
                });
            }
        }
        if let Some(index) = union {
            return Ok(index);
        }

        let positional_len = columns.iter().find_map(|(_, input)| match input {
            ColumnInput::Values(values) | ColumnInput::Typed { values, .. } => Some(values.len()),
            ColumnInput::Scalar(_) | ColumnInput::Series(_) => None,
        });
        match positional_len {
            Some(len) => Ok(Index::range(len)),
            None if columns.is_empty() => Ok(Index::range(0)),
            None => Err(FrameError::ScalarsRequireIndex),
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn columns(&self) -> &Index {
        &self.columns
    }

    /// `(rows, columns)`
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.index.len(), self.columns.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn dtypes(&self) -> Vec<(IndexLabel, DType)> {
        self.columns
            .labels()
            .iter()
            .cloned()
            .zip(self.data.iter().map(Column::dtype))
            .collect()
    }

    pub(crate) fn column_position(&self, label: &IndexLabel) -> Result<usize, FrameError> {
        lookup(&self.columns, label, Axis::Columns)
    }

    pub(crate) fn row_position(&self, label: &IndexLabel) -> Result<usize, FrameError> {
        lookup(&self.index, label, Axis::Rows)
    }

    pub(crate) fn data(&self) -> &[Column] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut Vec<Column> {
        &mut self.data
    }

    pub(crate) fn columns_mut(&mut self) -> &mut Index {
        &mut self.columns
    }

    /// The column as an owned series named by its label.
    pub fn column(&self, label: impl Into<IndexLabel>) -> Result<Series, FrameError> {
        let label = label.into();
        let pos = self.column_position(&label)?;
        Series::new(label, self.index.clone(), self.data[pos].clone())
    }

    // ── Selection ──────────────────────────────────────────────────────

    /// Label-based selection.
    ///
    /// A single row and a single column yield a scalar; one single axis
    /// yields a series along the other; anything else yields a table.
    pub fn loc(&self, rows: &RowLabels, columns: &ColumnLabels) -> Result<Selection, FrameError> {
        let rows = resolve_row_labels(&self.index, rows)?;
        let columns = resolve_column_labels(&self.columns, columns)?;
        self.project(&rows, &columns)
    }

    /// Position-based selection, shaped like [`Table::loc`].
    pub fn iloc(&self, rows: &Positions, columns: &Positions) -> Result<Selection, FrameError> {
        let rows = resolve_positions(self.len(), rows, Axis::Rows)?;
        let columns = resolve_positions(self.num_columns(), columns, Axis::Columns)?;
        self.project(&rows, &columns)
    }

    fn project(&self, rows: &Resolved, columns: &Resolved) -> Result<Selection, FrameError> {
        if let Some(pos) = repeated_position(&rows.positions) {
            return Err(FrameError::DuplicateLabel {
                axis: Axis::Rows,
                label: self.index.labels()[pos].clone(),
            });
        }
        if let Some(pos) = repeated_position(&columns.positions) {
            return Err(FrameError::DuplicateLabel {
                axis: Axis::Columns,
                label: self.columns.labels()[pos].clone(),
            });
        }
        match (rows.single, columns.single) {
            (true, true) => Ok(Selection::Scalar(
                self.data[columns.positions[0]].values()[rows.positions[0]].clone(),
            )),
            (true, false) => {
                let row = rows.positions[0];
                let values = columns
                    .positions
                    .iter()
                    .map(|&col| self.data[col].values()[row].clone())
                    .collect();
                Series::new(
                    self.index.labels()[row].clone(),
                    self.columns.take(&columns.positions),
                    Column::from_values_widening(values)?,
                )
                .map(Selection::Series)
            }
            (false, true) => {
                let col = columns.positions[0];
                Series::new(
                    self.columns.labels()[col].clone(),
                    self.index.take(&rows.positions),
                    self.data[col].take(&rows.positions)?,
                )
                .map(Selection::Series)
            }
            (false, false) => self
                .take_block(&rows.positions, &columns.positions)
                .map(Selection::Table),
        }
    }

    fn take_block(&self, rows: &[usize], columns: &[usize]) -> Result<Self, FrameError> {
        let data = columns
            .iter()
            .map(|&col| self.data[col].take(rows))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(self.index.take(rows), self.columns.take(columns), data)
    }

    pub(crate) fn take_rows(&self, rows: &[usize]) -> Result<Self, FrameError> {
        let data = self
            .data
            .iter()
            .map(|column| column.take(rows))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(self.index.take(rows), self.columns.clone(), data)
    }

    pub fn at(
        &self,
        row: impl Into<IndexLabel>,
        column: impl Into<IndexLabel>,
    ) -> Result<&Scalar, FrameError> {
        let row = self.row_position(&row.into())?;
        let col = self.column_position(&column.into())?;
        Ok(&self.data[col].values()[row])
    }

    pub fn iat(&self, row: i64, column: i64) -> Result<&Scalar, FrameError> {
        let row = normalize_position(row, self.len(), Axis::Rows)?;
        let col = normalize_position(column, self.num_columns(), Axis::Columns)?;
        Ok(&self.data[col].values()[row])
    }

    pub fn select_columns(&self, labels: &ColumnLabels) -> Result<Self, FrameError> {
        let columns = resolve_column_labels(&self.columns, labels)?;
        let rows: Vec<usize> = (0..self.len()).collect();
        self.take_block(&rows, &columns.positions)
    }

    pub fn head(&self, n: i64) -> Result<Self, FrameError> {
        let take = normalize_head_take(n, self.len());
        self.take_rows(&(0..take).collect::<Vec<_>>())
    }

    pub fn tail(&self, n: i64) -> Result<Self, FrameError> {
        let start = normalize_tail_start(n, self.len());
        self.take_rows(&(start..self.len()).collect::<Vec<_>>())
    }

    // ── Filtering ──────────────────────────────────────────────────────

    /// Keep rows whose mask value is `true`. The mask is aligned to the row
    /// labels; missing mask values count as `false`.
    pub fn filter_rows(&self, mask: &Series) -> Result<Self, FrameError> {
        let keep: Vec<usize> = mask
            .mask_for(&self.index)?
            .iter()
            .enumerate()
            .filter_map(|(pos, &k)| k.then_some(pos))
            .collect();
        self.take_rows(&keep)
    }

    /// Same-shape table keeping only cells that satisfy `predicate`; every
    /// other cell becomes not-available. Missing cells are never passed to
    /// the predicate.
    pub fn where_cells<F>(&self, predicate: F) -> Result<Self, FrameError>
    where
        F: Fn(&Scalar) -> bool,
    {
        let data = self
            .data
            .iter()
            .map(|column| {
                let values = column
                    .values()
                    .iter()
                    .map(|value| {
                        if !value.is_missing() && predicate(value) {
                            value.clone()
                        } else {
                            Scalar::missing_for_dtype(column.dtype())
                        }
                    })
                    .collect();
                Column::new(column.dtype(), values)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(self.index.clone(), self.columns.clone(), data)
    }

    /// Rows whose value in `column` is one of `candidates`.
    pub fn isin(
        &self,
        column: impl Into<IndexLabel>,
        candidates: &[Scalar],
    ) -> Result<Self, FrameError> {
        let col = self.column_position(&column.into())?;
        let mask = self.data[col].isin(candidates)?;
        let keep: Vec<usize> = mask
            .values()
            .iter()
            .enumerate()
            .filter_map(|(pos, value)| matches!(value, Scalar::Bool(true)).then_some(pos))
            .collect();
        self.take_rows(&keep)
    }

    /// Same-shape `Bool` table marking missing cells.
    pub fn isna(&self) -> Result<Self, FrameError> {
        let data = self
            .data
            .iter()
            .map(|column| {
                let flags = column
                    .values()
                    .iter()
                    .map(|value| Scalar::Bool(value.is_missing()))
                    .collect();
                Column::new(DType::Bool, flags)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(self.index.clone(), self.columns.clone(), data)
    }

    pub fn dropna(&self, how: DropNaHow) -> Result<Self, FrameError> {
        if self.data.is_empty() {
            return Ok(self.clone());
        }
        let keep: Vec<usize> = (0..self.len())
            .filter(|&row| {
                let missing = self
                    .data
                    .iter()
                    .filter(|column| column.values()[row].is_missing())
                    .count();
                match how {
                    DropNaHow::Any => missing == 0,
                    DropNaHow::All => missing < self.data.len(),
                }
            })
            .collect();
        self.take_rows(&keep)
    }

    /// Replace missing cells with `value`. Columns whose dtype cannot hold
    /// the value are left as they are.
    pub fn fillna(&self, value: &Scalar) -> Result<Self, FrameError> {
        let data = self
            .data
            .iter()
            .map(|column| {
                if column.dtype() == DType::Null && !value.is_missing() {
                    return Column::new(value.dtype(), vec![value.clone(); column.len()]);
                }
                Ok(column.fillna(value).unwrap_or_else(|_| column.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(self.index.clone(), self.columns.clone(), data)
    }

    /// Conform to new row labels; labels not present become all-missing rows.
    pub fn reindex(&self, labels: Vec<IndexLabel>) -> Result<Self, FrameError> {
        let target = Index::new(labels);
        if let Some(label) = first_duplicate(&target) {
            return Err(FrameError::DuplicateLabel {
                axis: Axis::Rows,
                label,
            });
        }
        let plan = align_left(&target, &self.index);
        log::debug!(
            "reindexing {} rows onto {} labels: {} new",
            self.len(),
            target.len(),
            plan.unmatched_right()
        );
        let data = self
            .data
            .iter()
            .map(|column| column.reindex_by_positions(&plan.right_positions))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(plan.union_index, self.columns.clone(), data)
    }

    // ── Reshaping ──────────────────────────────────────────────────────

    /// Order rows (or columns) by label. Stable.
    pub fn sort_index(&self, axis: Axis, ascending: bool) -> Result<Self, FrameError> {
        match axis {
            Axis::Rows => self.take_rows(&self.index.argsort(ascending)),
            Axis::Columns => {
                let rows: Vec<usize> = (0..self.len()).collect();
                self.take_block(&rows, &self.columns.argsort(ascending))
            }
        }
    }

    pub fn sort_values(
        &self,
        column: impl Into<IndexLabel>,
        ascending: bool,
    ) -> Result<Self, FrameError> {
        self.sort_values_with(column, ascending, &FrameOptions::default())
    }

    /// Order rows by the values of one column. Stable; where not-available
    /// values land is set by `options.na_position`.
    pub fn sort_values_with(
        &self,
        column: impl Into<IndexLabel>,
        ascending: bool,
        options: &FrameOptions,
    ) -> Result<Self, FrameError> {
        let col = self.column_position(&column.into())?;
        let values = self.data[col].values();
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&left, &right| {
            compare_scalars_for_sort(
                &values[left],
                &values[right],
                ascending,
                options.na_position,
            )
        });
        self.take_rows(&order)
    }

    /// Swap rows and columns. Each new column gets the one dtype that holds
    /// all of its values unchanged, `Object` for a mix.
    pub fn transpose(&self) -> Result<Self, FrameError> {
        let data = (0..self.len())
            .map(|row| {
                let values = self
                    .data
                    .iter()
                    .map(|column| column.values()[row].clone())
                    .collect();
                Column::from_values_widening(values)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(self.columns.clone(), self.index.clone(), data)
    }

    // ── Statistics ─────────────────────────────────────────────────────

    pub fn describe(&self) -> Result<Self, FrameError> {
        self.describe_with(&FrameOptions::default())
    }

    /// Summary statistics of every `Int64`/`Float64` column: count, mean,
    /// std, min, the configured percentiles and max, all as `Float64`.
    pub fn describe_with(&self, options: &FrameOptions) -> Result<Self, FrameError> {
        options.validate()?;
        let mut percentiles = options.percentiles.clone();
        percentiles.sort_by(f64::total_cmp);
        percentiles.dedup();

        let mut stat_labels = vec![
            IndexLabel::from("count"),
            IndexLabel::from("mean"),
            IndexLabel::from("std"),
            IndexLabel::from("min"),
        ];
        stat_labels.extend(percentiles.iter().map(|&q| percentile_label(q)));
        stat_labels.push(IndexLabel::from("max"));

        let mut labels = Vec::new();
        let mut data = Vec::new();
        for (label, column) in self.columns.labels().iter().zip(&self.data) {
            if !column.dtype().is_numeric() {
                continue;
            }
            let values = column.values();
            let mut stats = vec![
                Scalar::Float64(column.validity().count_valid() as f64),
                nanmean(values),
                nanstd(values, options.ddof),
                nanmin(values),
            ];
            stats.extend(percentiles.iter().map(|&q| nanquantile(values, q)));
            stats.push(nanmax(values));

            labels.push(label.clone());
            data.push(Column::new(DType::Float64, stats)?);
        }

        Self::build(Index::new(stat_labels), Index::new(labels), data)
    }

    /// Deep copy; later mutation of either table never affects the other.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

/// Turn a column input into a column conforming to `index`.
pub(crate) fn materialize(input: ColumnInput, index: &Index) -> Result<Column, FrameError> {
    let check_len = |len: usize| {
        if len == index.len() {
            Ok(())
        } else {
            Err(FrameError::LengthMismatch {
                index_len: index.len(),
                column_len: len,
            })
        }
    };
    match input {
        ColumnInput::Values(values) => {
            check_len(values.len())?;
            Ok(Column::from_values(values)?)
        }
        ColumnInput::Typed { dtype, values } => {
            check_len(values.len())?;
            Ok(Column::new(dtype, values)?)
        }
        ColumnInput::Scalar(value) => Ok(Column::new(value.dtype(), vec![value; index.len()])?),
        ColumnInput::Series(series) => Ok(series.align_to(index)?.into_column()),
    }
}
