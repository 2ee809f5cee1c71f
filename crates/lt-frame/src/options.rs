use serde::{Deserialize, Serialize};

use crate::FrameError;

/// Where not-available values land when sorting by values.
///
/// The placement is independent of sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NaPosition {
    First,
    #[default]
    Last,
}

/// Tunables for sorting and summary statistics.
///
/// Every field has a default, so a JSON document only needs the keys it
/// overrides:
///
/// ```
/// use lt_frame::{FrameOptions, NaPosition};
///
/// let options = FrameOptions::from_json_str(r#"{"na_position": "first"}"#).unwrap();
/// assert_eq!(options.na_position, NaPosition::First);
/// assert_eq!(options.ddof, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameOptions {
    pub na_position: NaPosition,
    /// Quantiles reported by `describe`, each within `[0, 1]`.
    pub percentiles: Vec<f64>,
    /// Delta degrees of freedom for standard deviation.
    pub ddof: usize,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            na_position: NaPosition::Last,
            percentiles: vec![0.25, 0.5, 0.75],
            ddof: 1,
        }
    }
}

impl FrameOptions {
    pub fn from_json_str(input: &str) -> Result<Self, FrameError> {
        let options: Self = serde_json::from_str(input)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        if let Some(bad) = self
            .percentiles
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(FrameError::InvalidOptions(format!(
                "percentile {bad} is outside [0, 1]"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_na_position(mut self, na_position: NaPosition) -> Self {
        self.na_position = na_position;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameOptions, NaPosition};
    use crate::ErrorKind;

    #[test]
    fn empty_document_yields_defaults() {
        let options = FrameOptions::from_json_str("{}").expect("defaults");
        assert_eq!(options, FrameOptions::default());
        assert_eq!(options.na_position, NaPosition::Last);
    }

    #[test]
    fn overrides_are_applied() {
        let options = FrameOptions::from_json_str(
            r#"{"na_position": "first", "percentiles": [0.1, 0.9], "ddof": 0}"#,
        )
        .expect("parse");
        assert_eq!(options.na_position, NaPosition::First);
        assert_eq!(options.percentiles, vec![0.1, 0.9]);
        assert_eq!(options.ddof, 0);
    }

    #[test]
    fn out_of_range_percentile_is_rejected() {
        let err = FrameOptions::from_json_str(r#"{"percentiles": [1.5]}"#).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FrameOptions::from_json_str(r#"{"sort": "fast"}"#).expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
