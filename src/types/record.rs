//! Patient feature record data structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clinical attributes the classifier was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureName {
    /// Age in years
    Age,
    /// Sex (0 = female, 1 = male)
    Sex,
    /// Chest pain type (0-3)
    Cp,
    /// Resting blood pressure (mm Hg)
    Trestbps,
    /// Serum cholesterol (mg/dl)
    Chol,
    /// Fasting blood sugar > 120 mg/dl
    Fbs,
    /// Resting ECG result (0-2)
    Restecg,
    /// Maximum heart rate achieved
    Thalach,
    /// Exercise induced angina
    Exang,
    /// ST depression induced by exercise relative to rest
    Oldpeak,
    /// Slope of the peak exercise ST segment (0-2)
    Slope,
    /// Number of major vessels colored by fluoroscopy (0-4)
    Ca,
    /// Thalassemia code (0-3)
    Thal,
}

impl FeatureName {
    /// All features in canonical (training-time) order.
    pub const ALL: [FeatureName; 13] = [
        FeatureName::Age,
        FeatureName::Sex,
        FeatureName::Cp,
        FeatureName::Trestbps,
        FeatureName::Chol,
        FeatureName::Fbs,
        FeatureName::Restecg,
        FeatureName::Thalach,
        FeatureName::Exang,
        FeatureName::Oldpeak,
        FeatureName::Slope,
        FeatureName::Ca,
        FeatureName::Thal,
    ];

    /// Number of features the model expects.
    pub const COUNT: usize = 13;

    /// Wire name of the feature.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::Age => "age",
            FeatureName::Sex => "sex",
            FeatureName::Cp => "cp",
            FeatureName::Trestbps => "trestbps",
            FeatureName::Chol => "chol",
            FeatureName::Fbs => "fbs",
            FeatureName::Restecg => "restecg",
            FeatureName::Thalach => "thalach",
            FeatureName::Exang => "exang",
            FeatureName::Oldpeak => "oldpeak",
            FeatureName::Slope => "slope",
            FeatureName::Ca => "ca",
            FeatureName::Thal => "thal",
        }
    }

    /// Canonical feature names as owned strings (config default).
    pub fn canonical_order() -> Vec<String> {
        Self::ALL.iter().map(|f| f.as_str().to_string()).collect()
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureName::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown feature `{}`", s))
    }
}

/// A fully typed patient record with all 13 attributes present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub age: f64,
    pub sex: f64,
    pub cp: f64,
    pub trestbps: f64,
    pub chol: f64,
    pub fbs: f64,
    pub restecg: f64,
    pub thalach: f64,
    pub exang: f64,
    pub oldpeak: f64,
    pub slope: f64,
    pub ca: f64,
    pub thal: f64,
}

impl FeatureRecord {
    /// Read one attribute by name.
    pub fn get(&self, feature: FeatureName) -> f64 {
        match feature {
            FeatureName::Age => self.age,
            FeatureName::Sex => self.sex,
            FeatureName::Cp => self.cp,
            FeatureName::Trestbps => self.trestbps,
            FeatureName::Chol => self.chol,
            FeatureName::Fbs => self.fbs,
            FeatureName::Restecg => self.restecg,
            FeatureName::Thalach => self.thalach,
            FeatureName::Exang => self.exang,
            FeatureName::Oldpeak => self.oldpeak,
            FeatureName::Slope => self.slope,
            FeatureName::Ca => self.ca,
            FeatureName::Thal => self.thal,
        }
    }

    /// Build a record from values given in canonical order.
    pub fn from_canonical(values: [f64; FeatureName::COUNT]) -> Self {
        let [age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang, oldpeak, slope, ca, thal] =
            values;
        Self {
            age,
            sex,
            cp,
            trestbps,
            chol,
            fbs,
            restecg,
            thalach,
            exang,
            oldpeak,
            slope,
            ca,
            thal,
        }
    }

    /// Values in the given feature order.
    pub fn ordered(&self, order: &[FeatureName]) -> Vec<f64> {
        order.iter().map(|&f| self.get(f)).collect()
    }
}

/// A record that passed validation, already laid out in the model's feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    record: FeatureRecord,
    values: Vec<f64>,
}

impl ValidatedRecord {
    pub(crate) fn new(record: FeatureRecord, order: &[FeatureName]) -> Self {
        let values = record.ordered(order);
        Self { record, values }
    }

    /// The typed record.
    pub fn record(&self) -> &FeatureRecord {
        &self.record
    }

    /// Feature values in training-time order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
