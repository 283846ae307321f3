//! Feature schema validation for heart disease model inference.
//!
//! Turns raw JSON records into typed records laid out in the exact
//! column order the classifier was trained with.

use crate::error::ValidationError;
use crate::types::record::{FeatureName, FeatureRecord, ValidatedRecord};
use anyhow::{bail, Result};
use serde_json::{Map, Value};

/// Validator that checks raw records against the 13-feature schema.
///
/// Extra fields are ignored. Numbers are accepted as-is; strings are
/// accepted when they parse to a finite number. Everything else,
/// including `null` and booleans, is a type error.
#[derive(Debug, Clone)]
pub struct FeatureValidator {
    feature_order: Vec<FeatureName>,
}

impl FeatureValidator {
    /// Create a validator using the canonical feature order.
    pub fn new() -> Self {
        Self {
            feature_order: FeatureName::ALL.to_vec(),
        }
    }

    /// Create a validator for a model trained with a specific column order.
    ///
    /// Every feature must appear exactly once.
    pub fn with_order<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut feature_order = Vec::with_capacity(FeatureName::COUNT);

        for name in names {
            let feature: FeatureName = name
                .as_ref()
                .parse()
                .map_err(|e: String| anyhow::anyhow!("invalid feature order: {}", e))?;
            if feature_order.contains(&feature) {
                bail!("invalid feature order: `{}` listed twice", feature);
            }
            feature_order.push(feature);
        }

        if feature_order.len() != FeatureName::COUNT {
            let missing: Vec<&str> = FeatureName::ALL
                .iter()
                .filter(|f| !feature_order.contains(f))
                .map(|f| f.as_str())
                .collect();
            bail!("invalid feature order: missing {}", missing.join(", "));
        }

        Ok(Self { feature_order })
    }

    /// Training-time feature order.
    pub fn feature_order(&self) -> &[FeatureName] {
        &self.feature_order
    }

    /// Feature names in training-time order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        self.feature_order.iter().map(|f| f.as_str()).collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.feature_order.len()
    }

    /// Validate one raw record.
    pub fn validate(&self, record: &Value) -> Result<ValidatedRecord, ValidationError> {
        let fields = record.as_object().ok_or(ValidationError::NotAnObject)?;
        if fields.is_empty() {
            return Err(ValidationError::EmptyRecord);
        }

        let missing: Vec<String> = self
            .feature_order
            .iter()
            .filter(|f| !fields.contains_key(f.as_str()))
            .map(|f| f.as_str().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields { fields: missing });
        }

        let typed = self.coerce_all(fields)?;
        Ok(ValidatedRecord::new(typed, &self.feature_order))
    }

    fn coerce_all(&self, fields: &Map<String, Value>) -> Result<FeatureRecord, ValidationError> {
        let mut values = [0.0_f64; FeatureName::COUNT];

        for &feature in &self.feature_order {
            let raw = &fields[feature.as_str()];
            values[feature as usize] =
                coerce_numeric(raw).ok_or_else(|| ValidationError::InvalidType {
                    field: feature.as_str().to_string(),
                })?;
        }

        Ok(FeatureRecord::from_canonical(values))
    }
}

impl Default for FeatureValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn coerce_numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    // the model consumes f32; anything wider would overflow to infinity
    (number.is_finite() && number.abs() <= f32::MAX as f64).then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "age": 55, "sex": 1, "cp": 3, "trestbps": 140, "chol": 230,
            "fbs": 0, "restecg": 0, "thalach": 150, "exang": 0,
            "oldpeak": 1.0, "slope": 0, "ca": 0, "thal": 3
        })
    }

    #[test]
    fn test_valid_record_preserves_values() {
        let validator = FeatureValidator::new();
        let validated = validator.validate(&sample()).unwrap();

        assert_eq!(validated.values().len(), validator.feature_count());
        assert_eq!(
            validated.values(),
            &[55.0, 1.0, 3.0, 140.0, 230.0, 0.0, 0.0, 150.0, 0.0, 1.0, 0.0, 0.0, 3.0]
        );
        assert_eq!(validated.record().thalach, 150.0);
    }

    #[test]
    fn test_custom_order_reorders_columns() {
        let mut names = FeatureName::canonical_order();
        names.reverse();
        let validator = FeatureValidator::with_order(&names).unwrap();

        let validated = validator.validate(&sample()).unwrap();
        assert_eq!(validated.values()[0], 3.0); // thal
        assert_eq!(validated.values()[12], 55.0); // age
        assert_eq!(validator.feature_names()[0], "thal");
    }

    #[test]
    fn test_invalid_orders_rejected() {
        let mut duplicated = FeatureName::canonical_order();
        duplicated[1] = "age".to_string();
        assert!(FeatureValidator::with_order(&duplicated).is_err());

        let short = &FeatureName::canonical_order()[..12];
        let err = FeatureValidator::with_order(short).unwrap_err();
        assert!(err.to_string().contains("thal"));

        let mut unknown = FeatureName::canonical_order();
        unknown[0] = "weight".to_string();
        assert!(FeatureValidator::with_order(&unknown).is_err());
    }

    #[test]
    fn test_missing_fields_all_named() {
        let mut record = sample();
        let fields = record.as_object_mut().unwrap();
        fields.remove("age");
        fields.remove("thal");

        let err = FeatureValidator::new().validate(&record).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields {
                fields: vec!["age".to_string(), "thal".to_string()]
            }
        );
    }

    #[test]
    fn test_missing_checked_before_types() {
        let mut record = sample();
        let fields = record.as_object_mut().unwrap();
        fields.remove("chol");
        fields.insert("sex".to_string(), json!("male"));

        let err = FeatureValidator::new().validate(&record).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFields { .. }));
    }

    #[test]
    fn test_type_errors() {
        for bad in [json!("abc"), json!(null), json!(true), json!([1]), json!({"v": 1})] {
            let mut record = sample();
            record["chol"] = bad;
            let err = FeatureValidator::new().validate(&record).unwrap_err();
            assert_eq!(
                err,
                ValidationError::InvalidType {
                    field: "chol".to_string()
                }
            );
        }

        let mut record = sample();
        record["oldpeak"] = json!("NaN");
        assert!(FeatureValidator::new().validate(&record).is_err());
    }

    #[test]
    fn test_values_beyond_f32_range_rejected() {
        for huge in [json!(1e300), json!(-1e300), json!("1e39")] {
            let mut record = sample();
            record["thalach"] = huge;
            let err = FeatureValidator::new().validate(&record).unwrap_err();
            assert_eq!(
                err,
                ValidationError::InvalidType {
                    field: "thalach".to_string()
                }
            );
        }

        let mut record = sample();
        record["chol"] = json!(f32::MAX as f64);
        assert!(FeatureValidator::new().validate(&record).is_ok());
    }

    #[test]
    fn test_numeric_strings_coerced() {
        let mut record = sample();
        record["age"] = json!(" 61 ");
        record["oldpeak"] = json!("2.3");

        let validated = FeatureValidator::new().validate(&record).unwrap();
        assert_eq!(validated.record().age, 61.0);
        assert_eq!(validated.record().oldpeak, 2.3);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let mut record = sample();
        record["patient_name"] = json!("anonymous");

        let validated = FeatureValidator::new().validate(&record).unwrap();
        assert_eq!(validated.values().len(), 13);
    }

    #[test]
    fn test_shape_errors() {
        let validator = FeatureValidator::new();
        assert_eq!(validator.validate(&json!({})), Err(ValidationError::EmptyRecord));
        assert_eq!(validator.validate(&json!([1, 2])), Err(ValidationError::NotAnObject));
        assert_eq!(validator.validate(&json!(null)), Err(ValidationError::NotAnObject));
    }
}
