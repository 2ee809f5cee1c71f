#![forbid(unsafe_code)]

use lt_types::{
    DType, Scalar, TypeError, cast_scalar, cast_scalar_owned, infer_dtype, infer_dtype_widening,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Packed validity bitmap: bit set means the value is present.
#[derive(Debug, Clone, Eq)]
pub struct ValidityMask {
    words: Vec<u64>,
    len: usize,
}

impl ValidityMask {
    #[must_use]
    pub fn from_values(values: &[Scalar]) -> Self {
        let len = values.len();
        let word_count = len.div_ceil(64);
        let mut words = vec![0_u64; word_count];
        for (idx, value) in values.iter().enumerate() {
            if !value.is_missing() {
                words[idx / 64] |= 1_u64 << (idx % 64);
            }
        }
        Self { words, len }
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        (self.words[idx / 64] >> (idx % 64)) & 1 == 1
    }

    pub fn set(&mut self, idx: usize, value: bool) {
        if idx >= self.len {
            return;
        }
        if value {
            self.words[idx / 64] |= 1_u64 << (idx % 64);
        } else {
            self.words[idx / 64] &= !(1_u64 << (idx % 64));
        }
    }

    #[must_use]
    pub fn count_valid(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|idx| self.get(idx))
    }
}

impl PartialEq for ValidityMask {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.bits().eq(other.bits())
    }
}

impl Serialize for ValidityMask {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let bits: Vec<bool> = self.bits().collect();
        let mut state = serializer.serialize_struct("ValidityMask", 1)?;
        state.serialize_field("bits", &bits)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ValidityMask {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            bits: Vec<bool>,
        }
        let raw = Raw::deserialize(deserializer)?;
        let len = raw.bits.len();
        let mut words = vec![0_u64; len.div_ceil(64)];
        for (idx, &valid) in raw.bits.iter().enumerate() {
            if valid {
                words[idx / 64] |= 1_u64 << (idx % 64);
            }
        }
        Ok(Self { words, len })
    }
}

/// Element-wise comparison operations that produce `Bool`-typed columns.
///
/// Missing inputs produce missing outputs, so a missing value never compares
/// equal to anything, itself included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Gt,
    Lt,
    Eq,
    Ne,
    Ge,
    Le,
}

/// Compare two non-missing scalars. Utf8 and Date compare by their natural
/// order, Bool as `false < true`, everything else numerically.
fn scalar_compare(left: &Scalar, right: &Scalar, op: ComparisonOp) -> Result<bool, ColumnError> {
    let ordering = match (left, right) {
        (Scalar::Utf8(a), Scalar::Utf8(b)) => a.cmp(b),
        (Scalar::Date(a), Scalar::Date(b)) => a.cmp(b),
        (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
        _ => {
            let lhs = left.to_f64()?;
            let rhs = right.to_f64()?;
            return Ok(match op {
                ComparisonOp::Gt => lhs > rhs,
                ComparisonOp::Lt => lhs < rhs,
                ComparisonOp::Eq => lhs == rhs,
                ComparisonOp::Ne => lhs != rhs,
                ComparisonOp::Ge => lhs >= rhs,
                ComparisonOp::Le => lhs <= rhs,
            });
        }
    };

    Ok(match op {
        ComparisonOp::Gt => ordering.is_gt(),
        ComparisonOp::Lt => ordering.is_lt(),
        ComparisonOp::Eq => ordering.is_eq(),
        ComparisonOp::Ne => ordering.is_ne(),
        ComparisonOp::Ge => ordering.is_ge(),
        ComparisonOp::Le => ordering.is_le(),
    })
}

/// Membership equality: numeric values match across Int64/Float64, other
/// kinds must match exactly. Missing values are never members.
fn scalar_matches(value: &Scalar, candidate: &Scalar) -> bool {
    if value.is_missing() || candidate.is_missing() {
        return false;
    }
    match (value, candidate) {
        (Scalar::Int64(a), Scalar::Float64(b)) => (*a as f64) == *b,
        (Scalar::Float64(a), Scalar::Int64(b)) => *a == (*b as f64),
        _ => value == candidate,
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("position {position} out of bounds for column of length {len}")]
    PositionOutOfBounds { position: usize, len: usize },
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// One homogeneous column: a declared dtype, its values and a validity mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    dtype: DType,
    values: Vec<Scalar>,
    validity: ValidityMask,
}

impl Column {
    /// Construct a column, coercing values to the target dtype.
    ///
    /// Missing values are remapped to the dtype's own missing marker, except
    /// in `Object` columns which keep every value as given.
    pub fn new(dtype: DType, values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let coerced = if dtype == DType::Object {
            values
        } else {
            values
                .into_iter()
                .map(|value| cast_scalar_owned(value, dtype))
                .collect::<Result<Vec<_>, _>>()?
        };

        let validity = ValidityMask::from_values(&coerced);

        Ok(Self {
            dtype,
            values: coerced,
            validity,
        })
    }

    /// Construct with a dtype inferred by numeric promotion.
    pub fn from_values(values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let dtype = infer_dtype(&values)?;
        Self::new(dtype, values)
    }

    /// Construct with a dtype that holds every value unchanged, widening
    /// heterogeneous input to `Object`.
    pub fn from_values_widening(values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let dtype = infer_dtype_widening(&values);
        Self::new(dtype, values)
    }

    pub fn all_missing(dtype: DType, len: usize) -> Result<Self, ColumnError> {
        Self::new(dtype, vec![Scalar::missing_for_dtype(dtype); len])
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    #[must_use]
    pub fn validity(&self) -> &ValidityMask {
        &self.validity
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Scalar> {
        self.values
    }

    pub fn reindex_by_positions(&self, positions: &[Option<usize>]) -> Result<Self, ColumnError> {
        let values = positions
            .iter()
            .map(|slot| match slot {
                Some(idx) => self
                    .values
                    .get(*idx)
                    .cloned()
                    .unwrap_or_else(|| Scalar::missing_for_dtype(self.dtype)),
                None => Scalar::missing_for_dtype(self.dtype),
            })
            .collect::<Vec<_>>();

        Self::new(self.dtype, values)
    }

    /// Gather values at the given positions, keeping the dtype.
    pub fn take(&self, positions: &[usize]) -> Result<Self, ColumnError> {
        let values = positions
            .iter()
            .map(|&position| {
                self.values
                    .get(position)
                    .cloned()
                    .ok_or(ColumnError::PositionOutOfBounds {
                        position,
                        len: self.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(self.dtype, values)
    }

    /// Write `values` at `positions` in place.
    ///
    /// Every position is bounds-checked and every value cast before the first
    /// write, so a failing call leaves the column untouched. An all-missing
    /// `Null` column adopts the dtype of the incoming values.
    pub fn replace_at(&mut self, positions: &[usize], values: Vec<Scalar>) -> Result<(), ColumnError> {
        if positions.len() != values.len() {
            return Err(ColumnError::LengthMismatch {
                left: positions.len(),
                right: values.len(),
            });
        }
        if let Some(&position) = positions.iter().find(|&&p| p >= self.len()) {
            return Err(ColumnError::PositionOutOfBounds {
                position,
                len: self.len(),
            });
        }

        if self.dtype == DType::Null {
            let dtype = infer_dtype(&values)?;
            if dtype != DType::Null {
                let mut promoted = Self::all_missing(dtype, self.len())?;
                promoted.replace_at(positions, values)?;
                *self = promoted;
                return Ok(());
            }
        }

        let coerced = values
            .into_iter()
            .map(|value| cast_scalar_owned(value, self.dtype))
            .collect::<Result<Vec<_>, _>>()?;

        for (&position, value) in positions.iter().zip(coerced) {
            self.validity.set(position, !value.is_missing());
            self.values[position] = value;
        }
        Ok(())
    }

    /// Compare every element against a scalar value, producing a `Bool` column.
    pub fn compare_scalar(&self, scalar: &Scalar, op: ComparisonOp) -> Result<Self, ColumnError> {
        let values = self
            .values
            .iter()
            .map(|v| -> Result<Scalar, ColumnError> {
                if v.is_missing() || scalar.is_missing() {
                    return Ok(Scalar::na());
                }
                Ok(Scalar::Bool(scalar_compare(v, scalar, op)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(DType::Bool, values)
    }

    /// `Bool` column marking elements that belong to `candidates`.
    pub fn isin(&self, candidates: &[Scalar]) -> Result<Self, ColumnError> {
        let values = self
            .values
            .iter()
            .map(|v| Scalar::Bool(candidates.iter().any(|c| scalar_matches(v, c))))
            .collect();
        Self::new(DType::Bool, values)
    }

    /// Replace missing values with `fill_value` cast to this column's dtype.
    pub fn fillna(&self, fill_value: &Scalar) -> Result<Self, ColumnError> {
        let cast_fill = cast_scalar(fill_value, self.dtype)?;
        let values = self
            .values
            .iter()
            .map(|v| {
                if v.is_missing() {
                    cast_fill.clone()
                } else {
                    v.clone()
                }
            })
            .collect();

        Self::new(self.dtype, values)
    }
}

#[cfg(test)]
mod tests {
    use lt_types::{DType, NullKind, Scalar};

    use super::{Column, ColumnError, ComparisonOp, ValidityMask};

    #[test]
    fn reindex_injects_missing_values() {
        let column = Column::from_values(vec![Scalar::Int64(10), Scalar::Int64(20)])
            .expect("column should build");

        let out = column
            .reindex_by_positions(&[Some(1), None, Some(0)])
            .expect("reindex should work");

        assert_eq!(
            out.values(),
            &[
                Scalar::Int64(20),
                Scalar::Null(NullKind::Null),
                Scalar::Int64(10)
            ]
        );
        assert_eq!(out.dtype(), DType::Int64);
    }

    #[test]
    fn float_reindex_uses_nan_marker() {
        let column = Column::from_values(vec![Scalar::Float64(1.5)]).expect("column");
        let out = column.reindex_by_positions(&[None]).expect("reindex");
        assert_eq!(out.values(), &[Scalar::Null(NullKind::NaN)]);
    }

    #[test]
    fn from_values_rejects_mixed_string_and_int() {
        let err = Column::from_values(vec![Scalar::from("a"), Scalar::Int64(1)])
            .expect_err("mixed column");
        assert!(matches!(err, ColumnError::Type(_)));
    }

    #[test]
    fn widening_keeps_mixed_values_as_object() {
        let column = Column::from_values_widening(vec![
            Scalar::from("a"),
            Scalar::Int64(1),
            Scalar::Null(NullKind::NaN),
        ])
        .expect("object column");
        assert_eq!(column.dtype(), DType::Object);
        assert_eq!(column.values()[1], Scalar::Int64(1));
        assert_eq!(column.values()[2], Scalar::Null(NullKind::NaN));
        assert_eq!(column.validity().count_valid(), 2);
    }

    #[test]
    fn validity_mask_tracks_missing() {
        let values = vec![
            Scalar::Int64(1),
            Scalar::Null(NullKind::Null),
            Scalar::Int64(3),
        ];
        let mask = ValidityMask::from_values(&values);
        assert_eq!(mask.len(), 3);
        assert!(mask.get(0));
        assert!(!mask.get(1));
        assert!(mask.get(2));
        assert!(!mask.get(3));
        assert_eq!(mask.count_valid(), 2);
    }

    #[test]
    fn validity_mask_spans_word_boundaries() {
        let values: Vec<Scalar> = (0..130).map(Scalar::Int64).collect();
        let mut mask = ValidityMask::from_values(&values);
        assert_eq!(mask.count_valid(), 130);
        mask.set(64, false);
        mask.set(129, false);
        assert!(!mask.get(64));
        assert!(mask.get(65));
        assert_eq!(mask.count_valid(), 128);
    }

    #[test]
    fn replace_at_casts_and_updates_validity() {
        let mut column = Column::from_values(vec![Scalar::Float64(1.0), Scalar::Float64(2.0)])
            .expect("column");
        column
            .replace_at(&[1, 0], vec![Scalar::Int64(7), Scalar::na()])
            .expect("replace");
        assert_eq!(
            column.values(),
            &[Scalar::Null(NullKind::NaN), Scalar::Float64(7.0)]
        );
        assert_eq!(column.validity().count_valid(), 1);
    }

    #[test]
    fn replace_at_is_all_or_nothing() {
        let mut column =
            Column::from_values(vec![Scalar::Int64(1), Scalar::Int64(2)]).expect("column");
        let before = column.clone();

        let err = column
            .replace_at(&[0, 1], vec![Scalar::Int64(9), Scalar::Float64(2.5)])
            .expect_err("lossy cast");
        assert!(matches!(err, ColumnError::Type(_)));
        assert_eq!(column, before);

        let err = column
            .replace_at(&[0, 5], vec![Scalar::Int64(9), Scalar::Int64(9)])
            .expect_err("out of bounds");
        assert_eq!(err, ColumnError::PositionOutOfBounds { position: 5, len: 2 });
        assert_eq!(column, before);
    }

    #[test]
    fn replace_at_promotes_all_missing_column() {
        let mut column = Column::all_missing(DType::Null, 3).expect("column");
        column
            .replace_at(&[1], vec![Scalar::from("x")])
            .expect("replace");
        assert_eq!(column.dtype(), DType::Utf8);
        assert_eq!(
            column.values(),
            &[Scalar::na(), Scalar::from("x"), Scalar::na()]
        );
    }

    #[test]
    fn compare_scalar_propagates_missing() {
        let column = Column::from_values(vec![
            Scalar::Float64(1.0),
            Scalar::Float64(f64::NAN),
            Scalar::Float64(-2.0),
        ])
        .expect("column");
        let mask = column
            .compare_scalar(&Scalar::Float64(0.0), ComparisonOp::Gt)
            .expect("compare");
        assert_eq!(
            mask.values(),
            &[Scalar::Bool(true), Scalar::na(), Scalar::Bool(false)]
        );
    }

    #[test]
    fn missing_never_equals_itself() {
        let column = Column::from_values(vec![Scalar::na()]).expect("column");
        let mask = column
            .compare_scalar(&Scalar::na(), ComparisonOp::Eq)
            .expect("compare");
        assert!(mask.values()[0].is_missing());
    }

    #[test]
    fn compare_scalar_rejects_string_vs_number() {
        let column = Column::from_values(vec![Scalar::from("a")]).expect("column");
        let err = column
            .compare_scalar(&Scalar::Int64(1), ComparisonOp::Lt)
            .expect_err("mismatch");
        assert!(matches!(err, ColumnError::Type(_)));
    }

    #[test]
    fn isin_matches_across_numeric_kinds_and_skips_missing() {
        let column = Column::from_values(vec![
            Scalar::Int64(1),
            Scalar::na(),
            Scalar::Int64(3),
        ])
        .expect("column");
        let mask = column
            .isin(&[Scalar::Float64(3.0), Scalar::na()])
            .expect("isin");
        assert_eq!(
            mask.values(),
            &[Scalar::Bool(false), Scalar::Bool(false), Scalar::Bool(true)]
        );
    }

    #[test]
    fn fillna_casts_fill_value() {
        let column =
            Column::from_values(vec![Scalar::Float64(1.0), Scalar::na()]).expect("column");
        let filled = column.fillna(&Scalar::Int64(5)).expect("fill");
        assert_eq!(filled.values(), &[Scalar::Float64(1.0), Scalar::Float64(5.0)]);
    }

    #[test]
    fn take_rejects_out_of_bounds() {
        let column = Column::from_values(vec![Scalar::Int64(1)]).expect("column");
        assert_eq!(
            column.take(&[0, 0]).expect("take").values(),
            &[Scalar::Int64(1), Scalar::Int64(1)]
        );
        assert!(column.take(&[1]).is_err());
    }
}
