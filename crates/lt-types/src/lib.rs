#![forbid(unsafe_code)]

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Null,
    Bool,
    Int64,
    Float64,
    Utf8,
    Date,
    /// Accepts any scalar; produced when heterogeneous values share a column.
    Object,
}

impl DType {
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullKind {
    Null,
    NaN,
    NaT,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Null(NullKind),
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    Date(NaiveDate),
}

impl Scalar {
    /// The generic not-available marker.
    #[must_use]
    pub const fn na() -> Self {
        Self::Null(NullKind::Null)
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Null(_) => DType::Null,
            Self::Bool(_) => DType::Bool,
            Self::Int64(_) => DType::Int64,
            Self::Float64(_) => DType::Float64,
            Self::Utf8(_) => DType::Utf8,
            Self::Date(_) => DType::Date,
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null(_) => true,
            Self::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    #[must_use]
    pub fn missing_for_dtype(dtype: DType) -> Self {
        match dtype {
            DType::Float64 => Self::Null(NullKind::NaN),
            DType::Date => Self::Null(NullKind::NaT),
            DType::Null | DType::Bool | DType::Int64 | DType::Utf8 | DType::Object => {
                Self::Null(NullKind::Null)
            }
        }
    }

    /// Value equality where any two missing markers compare equal.
    ///
    /// Intended for assertions and round-trip checks; element-wise comparison
    /// operators never treat a missing value as equal to anything.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        if self.is_missing() || other.is_missing() {
            return self.is_missing() && other.is_missing();
        }
        self == other
    }

    pub fn to_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Self::Int64(v) => Ok(*v as f64),
            Self::Float64(v) => Ok(*v),
            Self::Null(kind) => Err(TypeError::ValueIsMissing { kind: *kind }),
            Self::Utf8(v) => Err(TypeError::NonNumericValue {
                value: v.clone(),
                dtype: DType::Utf8,
            }),
            Self::Date(v) => Err(TypeError::NonNumericValue {
                value: v.to_string(),
                dtype: DType::Date,
            }),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(NullKind::Null) => f.write_str("<NA>"),
            Self::Null(NullKind::NaN) => f.write_str("NaN"),
            Self::Null(NullKind::NaT) => f.write_str("NaT"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => f.write_str(v),
            Self::Date(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("dtype coercion from {left:?} to {right:?} has no compatible common type")]
    IncompatibleDtypes { left: DType, right: DType },
    #[error("cannot cast scalar of dtype {from:?} to {to:?}")]
    InvalidCast { from: DType, to: DType },
    #[error("cannot cast float {value} to int64 without loss")]
    LossyFloatToInt { value: f64 },
    #[error("expected 0/1 for bool cast from int64 but found {value}")]
    InvalidBoolInt { value: i64 },
    #[error("expected 0.0/1.0 for bool cast from float64 but found {value}")]
    InvalidBoolFloat { value: f64 },
    #[error("value {value:?} has non-numeric dtype {dtype:?}")]
    NonNumericValue { value: String, dtype: DType },
    #[error("value is missing ({kind:?})")]
    ValueIsMissing { kind: NullKind },
}

pub fn common_dtype(left: DType, right: DType) -> Result<DType, TypeError> {
    use DType::{Bool, Float64, Int64, Null, Object};

    let out = match (left, right) {
        (a, b) if a == b => a,
        (Null, other) | (other, Null) => other,
        (Object, _) | (_, Object) => Object,
        (Bool, Int64) | (Int64, Bool) => Int64,
        (Bool, Float64) | (Float64, Bool) => Float64,
        (Int64, Float64) | (Float64, Int64) => Float64,
        _ => return Err(TypeError::IncompatibleDtypes { left, right }),
    };

    Ok(out)
}

pub fn infer_dtype(values: &[Scalar]) -> Result<DType, TypeError> {
    let mut current = DType::Null;
    for value in values {
        current = common_dtype(current, value.dtype())?;
    }
    Ok(current)
}

/// Infer a dtype that can hold every value without changing any of them.
///
/// Identical dtypes (ignoring missing values) are kept; any mix, including
/// the numeric mixes `infer_dtype` would promote, widens to `Object`.
#[must_use]
pub fn infer_dtype_widening(values: &[Scalar]) -> DType {
    let mut current = DType::Null;
    for value in values {
        let next = value.dtype();
        current = match (current, next) {
            (a, b) if a == b => a,
            (DType::Null, other) | (other, DType::Null) => other,
            _ => return DType::Object,
        };
    }
    current
}

/// Cast a scalar to a target dtype, taking ownership to avoid redundant clones
/// when the value already has the correct type.
pub fn cast_scalar_owned(value: Scalar, target: DType) -> Result<Scalar, TypeError> {
    let from = value.dtype();
    if target == DType::Object {
        return Ok(value);
    }
    if matches!(value, Scalar::Null(_)) {
        return Ok(Scalar::missing_for_dtype(target));
    }
    if from == target {
        return Ok(value);
    }

    match target {
        DType::Null => Ok(Scalar::Null(NullKind::Null)),
        DType::Bool => match &value {
            Scalar::Int64(v) => match *v {
                0 => Ok(Scalar::Bool(false)),
                1 => Ok(Scalar::Bool(true)),
                _ => Err(TypeError::InvalidBoolInt { value: *v }),
            },
            Scalar::Float64(v) => {
                if *v == 0.0 {
                    Ok(Scalar::Bool(false))
                } else if *v == 1.0 {
                    Ok(Scalar::Bool(true))
                } else {
                    Err(TypeError::InvalidBoolFloat { value: *v })
                }
            }
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Int64 => match &value {
            Scalar::Bool(v) => Ok(Scalar::Int64(i64::from(*v))),
            Scalar::Float64(v) if v.is_nan() => Ok(Scalar::missing_for_dtype(target)),
            Scalar::Float64(v) => {
                if !v.is_finite() || *v != v.trunc() {
                    return Err(TypeError::LossyFloatToInt { value: *v });
                }
                if *v < i64::MIN as f64 || *v > i64::MAX as f64 {
                    return Err(TypeError::LossyFloatToInt { value: *v });
                }
                Ok(Scalar::Int64(*v as i64))
            }
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Float64 => match &value {
            Scalar::Bool(v) => Ok(Scalar::Float64(if *v { 1.0 } else { 0.0 })),
            Scalar::Int64(v) => Ok(Scalar::Float64(*v as f64)),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Utf8 | DType::Date | DType::Object => {
            Err(TypeError::InvalidCast { from, to: target })
        }
    }
}

/// Cast a scalar reference to a target dtype (clones only when conversion is needed).
pub fn cast_scalar(value: &Scalar, target: DType) -> Result<Scalar, TypeError> {
    cast_scalar_owned(value.clone(), target)
}

// ── Nanops: null-skipping numeric reductions ───────────────────────────

fn collect_finite(values: &[Scalar]) -> Vec<f64> {
    values
        .iter()
        .filter(|v| !v.is_missing())
        .filter_map(|v| v.to_f64().ok())
        .collect()
}

pub fn nansum(values: &[Scalar]) -> Scalar {
    let nums = collect_finite(values);
    Scalar::Float64(nums.iter().sum())
}

pub fn nanmean(values: &[Scalar]) -> Scalar {
    let nums = collect_finite(values);
    if nums.is_empty() {
        return Scalar::Null(NullKind::NaN);
    }
    let sum: f64 = nums.iter().sum();
    Scalar::Float64(sum / nums.len() as f64)
}

pub fn nanmin(values: &[Scalar]) -> Scalar {
    let nums = collect_finite(values);
    if nums.is_empty() {
        return Scalar::Null(NullKind::NaN);
    }
    Scalar::Float64(nums.iter().copied().fold(f64::INFINITY, f64::min))
}

pub fn nanmax(values: &[Scalar]) -> Scalar {
    let nums = collect_finite(values);
    if nums.is_empty() {
        return Scalar::Null(NullKind::NaN);
    }
    Scalar::Float64(nums.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

pub fn nanvar(values: &[Scalar], ddof: usize) -> Scalar {
    let nums = collect_finite(values);
    if nums.len() <= ddof {
        return Scalar::Null(NullKind::NaN);
    }
    let mean: f64 = nums.iter().sum::<f64>() / nums.len() as f64;
    let sum_sq: f64 = nums.iter().map(|x| (x - mean).powi(2)).sum();
    Scalar::Float64(sum_sq / (nums.len() - ddof) as f64)
}

pub fn nanstd(values: &[Scalar], ddof: usize) -> Scalar {
    match nanvar(values, ddof) {
        Scalar::Float64(v) => Scalar::Float64(v.sqrt()),
        other => other,
    }
}

/// Quantile with linear interpolation between the two nearest ranks.
pub fn nanquantile(values: &[Scalar], q: f64) -> Scalar {
    let mut nums = collect_finite(values);
    if nums.is_empty() {
        return Scalar::Null(NullKind::NaN);
    }
    nums.sort_by(f64::total_cmp);
    if nums.len() == 1 {
        return Scalar::Float64(nums[0]);
    }
    let pos = q * (nums.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        Scalar::Float64(nums[lower])
    } else {
        let frac = pos - lower as f64;
        Scalar::Float64(nums[lower] * (1.0 - frac) + nums[upper] * frac)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        DType, NullKind, Scalar, cast_scalar, common_dtype, infer_dtype, infer_dtype_widening,
    };

    #[test]
    fn dtype_inference_coerces_numeric_values() {
        let values = vec![Scalar::Bool(true), Scalar::Int64(7), Scalar::Float64(3.5)];
        assert_eq!(
            infer_dtype(&values).expect("dtype should infer"),
            DType::Float64
        );
    }

    #[test]
    fn widening_inference_keeps_identical_dtype() {
        let values = vec![Scalar::Int64(1), Scalar::na(), Scalar::Int64(3)];
        assert_eq!(infer_dtype_widening(&values), DType::Int64);
    }

    #[test]
    fn widening_inference_falls_back_to_object() {
        let values = vec![Scalar::Int64(1), Scalar::Float64(2.5)];
        assert_eq!(infer_dtype_widening(&values), DType::Object);
        let values = vec![Scalar::from("a"), Scalar::Int64(1)];
        assert_eq!(infer_dtype_widening(&values), DType::Object);
    }

    #[test]
    fn missing_values_get_target_missing_marker() {
        let missing = Scalar::Null(NullKind::Null);
        let cast = cast_scalar(&missing, DType::Float64).expect("missing casts");
        assert_eq!(cast, Scalar::Null(NullKind::NaN));
        let cast = cast_scalar(&missing, DType::Date).expect("missing casts");
        assert_eq!(cast, Scalar::Null(NullKind::NaT));
    }

    #[test]
    fn object_cast_is_identity() {
        let value = Scalar::from("x");
        assert_eq!(cast_scalar(&value, DType::Object).expect("object"), value);
        let nan = Scalar::Null(NullKind::NaN);
        assert_eq!(cast_scalar(&nan, DType::Object).expect("object"), nan);
    }

    #[test]
    fn lossy_float_to_int_is_rejected() {
        assert!(cast_scalar(&Scalar::Float64(2.5), DType::Int64).is_err());
        assert_eq!(
            cast_scalar(&Scalar::Float64(3.0), DType::Int64).expect("exact"),
            Scalar::Int64(3)
        );
    }

    #[test]
    fn utf8_never_casts_to_numeric() {
        assert!(cast_scalar(&Scalar::from("1"), DType::Int64).is_err());
        let date = NaiveDate::from_ymd_opt(2013, 1, 1).expect("date");
        assert!(cast_scalar(&Scalar::Date(date), DType::Float64).is_err());
    }

    #[test]
    fn semantic_eq_treats_missing_markers_as_equal() {
        let left = Scalar::Float64(f64::NAN);
        let right = Scalar::Null(NullKind::NaN);
        assert!(left.semantic_eq(&right));
        assert!(Scalar::na().semantic_eq(&Scalar::Null(NullKind::NaT)));
        assert!(!Scalar::na().semantic_eq(&Scalar::Int64(0)));
    }

    #[test]
    fn common_dtype_rejects_string_numeric_mix() {
        let err = common_dtype(DType::Utf8, DType::Int64).expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "dtype coercion from Utf8 to Int64 has no compatible common type"
        );
    }

    #[test]
    fn display_distinguishes_missing_kinds() {
        assert_eq!(Scalar::na().to_string(), "<NA>");
        assert_eq!(Scalar::Null(NullKind::NaN).to_string(), "NaN");
        assert_eq!(Scalar::Null(NullKind::NaT).to_string(), "NaT");
    }

    #[test]
    fn scalar_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Scalar::Int64(5)).expect("serialize");
        assert_eq!(json, r#"{"kind":"int64","value":5}"#);
    }

    // ── Nanops ─────────────────────────────────────────────────────────

    #[test]
    fn nansum_skips_nulls() {
        let vals = vec![
            Scalar::Float64(1.0),
            Scalar::Null(NullKind::Null),
            Scalar::Float64(2.0),
            Scalar::Float64(f64::NAN),
            Scalar::Int64(7),
        ];
        assert_eq!(super::nansum(&vals), Scalar::Float64(10.0));
    }

    #[test]
    fn nansum_empty_returns_zero() {
        assert_eq!(super::nansum(&[]), Scalar::Float64(0.0));
    }

    #[test]
    fn nanmean_all_null_returns_nan() {
        let vals = vec![Scalar::Null(NullKind::Null), Scalar::Float64(f64::NAN)];
        assert!(super::nanmean(&vals).is_missing());
    }

    #[test]
    fn nanmin_nanmax_skip_missing() {
        let vals = vec![
            Scalar::Float64(5.0),
            Scalar::Null(NullKind::Null),
            Scalar::Float64(2.0),
            Scalar::Float64(8.0),
        ];
        assert_eq!(super::nanmin(&vals), Scalar::Float64(2.0));
        assert_eq!(super::nanmax(&vals), Scalar::Float64(8.0));
        assert!(super::nanmin(&[]).is_missing());
    }

    #[test]
    fn nanstd_sample_and_population() {
        let vals: Vec<Scalar> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .into_iter()
            .map(Scalar::Float64)
            .collect();
        let Scalar::Float64(population) = super::nanstd(&vals, 0) else {
            panic!("expected Float64");
        };
        assert!((population - 2.0).abs() < 1e-10);
        let Scalar::Float64(sample) = super::nanvar(&vals, 1) else {
            panic!("expected Float64");
        };
        assert!((sample - 32.0 / 7.0).abs() < 1e-10);
    }

    #[test]
    fn nanvar_insufficient_values_returns_nan() {
        assert!(super::nanvar(&[Scalar::Float64(5.0)], 1).is_missing());
    }

    #[test]
    fn nanquantile_interpolates_linearly() {
        let vals: Vec<Scalar> = [4_i64, 1, 3, 2].into_iter().map(Scalar::Int64).collect();
        assert_eq!(super::nanquantile(&vals, 0.5), Scalar::Float64(2.5));
        assert_eq!(super::nanquantile(&vals, 0.25), Scalar::Float64(1.75));
        assert_eq!(super::nanquantile(&vals, 0.0), Scalar::Float64(1.0));
        assert_eq!(super::nanquantile(&vals, 1.0), Scalar::Float64(4.0));
        assert!(super::nanquantile(&[Scalar::na()], 0.5).is_missing());
    }
}
