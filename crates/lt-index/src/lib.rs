#![forbid(unsafe_code)]

use std::sync::OnceLock;
use std::collections::HashMap;
use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A row or column label.
///
/// Labels of different kinds order by kind first (`Int64 < Utf8 < Date`),
/// then by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IndexLabel {
    Int64(i64),
    Utf8(String),
    Date(NaiveDate),
}

impl From<i64> for IndexLabel {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<&str> for IndexLabel {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for IndexLabel {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl From<&String> for IndexLabel {
    fn from(value: &String) -> Self {
        Self::Utf8(value.clone())
    }
}

impl From<NaiveDate> for IndexLabel {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<&IndexLabel> for IndexLabel {
    fn from(value: &IndexLabel) -> Self {
        value.clone()
    }
}

impl fmt::Display for IndexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
        }
    }
}

/// Detected sort order of an index's labels, computed lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    Unsorted,
    /// Strictly ascending (hence duplicate-free). Lookups use binary search.
    Ascending,
}

fn detect_sort_order(labels: &[IndexLabel]) -> SortOrder {
    if labels.windows(2).all(|w| w[0] < w[1]) {
        SortOrder::Ascending
    } else {
        SortOrder::Unsorted
    }
}

fn detect_duplicates(labels: &[IndexLabel]) -> bool {
    let mut seen = HashMap::<&IndexLabel, ()>::with_capacity(labels.len());
    for label in labels {
        if seen.insert(label, ()).is_some() {
            return true;
        }
    }
    false
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    labels: Vec<IndexLabel>,
    #[serde(skip)]
    duplicate_cache: OnceLock<bool>,
    #[serde(skip)]
    sort_order_cache: OnceLock<SortOrder>,
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Eq for Index {}

impl Index {
    #[must_use]
    pub fn new(labels: Vec<IndexLabel>) -> Self {
        Self {
            labels,
            duplicate_cache: OnceLock::new(),
            sort_order_cache: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn from_i64(values: Vec<i64>) -> Self {
        Self::new(values.into_iter().map(IndexLabel::from).collect())
    }

    #[must_use]
    pub fn from_utf8(values: Vec<String>) -> Self {
        Self::new(values.into_iter().map(IndexLabel::from).collect())
    }

    /// Default positional labels `0..len`.
    #[must_use]
    pub fn range(len: usize) -> Self {
        Self::new((0..len as i64).map(IndexLabel::Int64).collect())
    }

    /// `periods` consecutive calendar days starting at `start`.
    pub fn date_range(start: NaiveDate, periods: usize) -> Result<Self, IndexError> {
        let mut labels = Vec::with_capacity(periods);
        for offset in 0..periods {
            let date = start
                .checked_add_days(Days::new(offset as u64))
                .ok_or(IndexError::DateOutOfRange { start, periods })?;
            labels.push(IndexLabel::Date(date));
        }
        Ok(Self::new(labels))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn labels(&self) -> &[IndexLabel] {
        &self.labels
    }

    #[must_use]
    pub fn into_labels(self) -> Vec<IndexLabel> {
        self.labels
    }

    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        *self
            .duplicate_cache
            .get_or_init(|| detect_duplicates(&self.labels))
    }

    fn sort_order(&self) -> SortOrder {
        *self
            .sort_order_cache
            .get_or_init(|| detect_sort_order(&self.labels))
    }

    /// Returns `true` if this index is strictly ascending.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        matches!(self.sort_order(), SortOrder::Ascending)
    }

    /// Position of the first occurrence of `needle`.
    ///
    /// Binary search for strictly ascending indexes, linear scan otherwise.
    #[must_use]
    pub fn position(&self, needle: &IndexLabel) -> Option<usize> {
        match self.sort_order() {
            SortOrder::Ascending => self.labels.binary_search(needle).ok(),
            SortOrder::Unsorted => self.labels.iter().position(|label| label == needle),
        }
    }

    #[must_use]
    pub fn position_map_first(&self) -> HashMap<&IndexLabel, usize> {
        let mut positions = HashMap::with_capacity(self.labels.len());
        for (idx, label) in self.labels.iter().enumerate() {
            positions.entry(label).or_insert(idx);
        }
        positions
    }

    /// Half-open position bounds `[start, end)` for an inclusive label slice.
    ///
    /// A bound that is present resolves to its own position (inclusive on
    /// both sides). A bound that is absent is located by binary search when
    /// the index is sorted and is an error otherwise. `None` means open.
    pub fn slice_locs(
        &self,
        start: Option<&IndexLabel>,
        end: Option<&IndexLabel>,
    ) -> Result<(usize, usize), IndexError> {
        let lo = match start {
            None => 0,
            Some(label) => match self.position(label) {
                Some(pos) => pos,
                None if self.is_sorted() => self.labels.partition_point(|l| l < label),
                None => return Err(IndexError::SliceBoundNotFound(label.clone())),
            },
        };
        let hi = match end {
            None => self.labels.len(),
            Some(label) => match self.position(label) {
                Some(pos) => pos + 1,
                None if self.is_sorted() => self.labels.partition_point(|l| l <= label),
                None => return Err(IndexError::SliceBoundNotFound(label.clone())),
            },
        };
        Ok((lo, hi.max(lo)))
    }

    /// Stable ordering of positions by label.
    #[must_use]
    pub fn argsort(&self, ascending: bool) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.labels.len()).collect();
        if ascending {
            indices.sort_by(|&a, &b| self.labels[a].cmp(&self.labels[b]));
        } else {
            indices.sort_by(|&a, &b| self.labels[b].cmp(&self.labels[a]));
        }
        indices
    }

    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        Self::new(indices.iter().map(|&i| self.labels[i].clone()).collect())
    }

    /// Append a label, returning the extended index.
    #[must_use]
    pub fn with_label(&self, label: IndexLabel) -> Self {
        let mut labels = self.labels.clone();
        labels.push(label);
        Self::new(labels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentPlan {
    pub union_index: Index,
    pub left_positions: Vec<Option<usize>>,
    pub right_positions: Vec<Option<usize>>,
}

impl AlignmentPlan {
    /// Number of output rows with no counterpart on the right side.
    #[must_use]
    pub fn unmatched_right(&self) -> usize {
        self.right_positions.iter().filter(|p| p.is_none()).count()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("alignment vectors must have equal lengths")]
    InvalidAlignmentVectors,
    #[error("slice bound {0} not found in unsorted index")]
    SliceBoundNotFound(IndexLabel),
    #[error("date range of {periods} periods from {start} overflows the calendar")]
    DateOutOfRange { start: NaiveDate, periods: usize },
}

/// Left alignment: all left labels preserved in order, right positions by
/// first-match label lookup (`None` where the right side lacks the label).
pub fn align_left(left: &Index, right: &Index) -> AlignmentPlan {
    let right_map = right.position_map_first();

    let mut left_positions = Vec::with_capacity(left.len());
    let mut right_positions = Vec::with_capacity(left.len());

    for (left_pos, label) in left.labels.iter().enumerate() {
        left_positions.push(Some(left_pos));
        right_positions.push(right_map.get(label).copied());
    }

    AlignmentPlan {
        union_index: left.clone(),
        left_positions,
        right_positions,
    }
}

/// Outer alignment: left labels in order, then right labels not seen on the left.
pub fn align_union(left: &Index, right: &Index) -> AlignmentPlan {
    let left_positions_map = left.position_map_first();
    let right_positions_map = right.position_map_first();

    let mut union_labels = Vec::with_capacity(left.labels.len() + right.labels.len());
    union_labels.extend(left.labels.iter().cloned());
    for label in &right.labels {
        if !left_positions_map.contains_key(label) {
            union_labels.push(label.clone());
        }
    }

    let left_positions = union_labels
        .iter()
        .map(|label| left_positions_map.get(label).copied())
        .collect();

    let right_positions = union_labels
        .iter()
        .map(|label| right_positions_map.get(label).copied())
        .collect();

    AlignmentPlan {
        union_index: Index::new(union_labels),
        left_positions,
        right_positions,
    }
}

pub fn validate_alignment_plan(plan: &AlignmentPlan) -> Result<(), IndexError> {
    if plan.left_positions.len() != plan.right_positions.len()
        || plan.left_positions.len() != plan.union_index.len()
    {
        return Err(IndexError::InvalidAlignmentVectors);
    }

    Ok(())
}
