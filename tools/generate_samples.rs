//! Sample Request Generator
//!
//! Emits random prediction request bodies for exercising the API, either as
//! JSON or as a ready-to-run curl command.
//!
//! Usage: generate_samples [count] [positive_rate] [--curl] [url]

use heart_disease_api::types::{FeatureRecord, PredictRequest};
use rand::Rng;
use tracing::info;

/// Patient record generator for testing
struct PatientGenerator {
    rng: rand::rngs::ThreadRng,
}

impl PatientGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a patient drawn from the full clinical ranges
    fn generate_typical(&mut self) -> FeatureRecord {
        FeatureRecord {
            age: self.rng.gen_range(29..=77) as f64,
            sex: self.rng.gen_range(0..=1) as f64,
            cp: self.rng.gen_range(0..=3) as f64,
            trestbps: self.rng.gen_range(94..=200) as f64,
            chol: self.rng.gen_range(126..=400) as f64,
            fbs: if self.rng.gen_bool(0.15) { 1.0 } else { 0.0 },
            restecg: self.rng.gen_range(0..=2) as f64,
            thalach: self.rng.gen_range(90..=202) as f64,
            exang: if self.rng.gen_bool(0.3) { 1.0 } else { 0.0 },
            oldpeak: self.one_decimal(0.0..4.0),
            slope: self.rng.gen_range(0..=2) as f64,
            ca: self.rng.gen_range(0..=3) as f64,
            thal: self.rng.gen_range(0..=3) as f64,
        }
    }

    /// Generate a patient with risk factors pushed toward disease
    fn generate_high_risk(&mut self) -> FeatureRecord {
        FeatureRecord {
            age: self.rng.gen_range(55..=77) as f64,
            sex: 1.0,
            cp: self.rng.gen_range(2..=3) as f64, // non-anginal / asymptomatic
            trestbps: self.rng.gen_range(140..=200) as f64,
            chol: self.rng.gen_range(240..=400) as f64,
            fbs: if self.rng.gen_bool(0.4) { 1.0 } else { 0.0 },
            restecg: self.rng.gen_range(1..=2) as f64,
            thalach: self.rng.gen_range(90..=140) as f64, // low max heart rate
            exang: 1.0,
            oldpeak: self.one_decimal(2.0..6.0),
            slope: self.rng.gen_range(1..=2) as f64,
            ca: self.rng.gen_range(1..=3) as f64,
            thal: self.rng.gen_range(2..=3) as f64,
        }
    }

    fn one_decimal(&mut self, range: std::ops::Range<f64>) -> f64 {
        (self.rng.gen_range(range) * 10.0).round() / 10.0
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pipeable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("generate_samples=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let curl = args.iter().any(|a| a == "--curl");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let count: usize = positional
        .first()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let positive_rate: f64 = positional
        .get(1)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.3)
        .clamp(0.0, 1.0);
    let url = positional
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("http://localhost:8000");

    info!(
        count = count,
        positive_rate = positive_rate,
        curl = curl,
        "Generating sample records"
    );

    let mut generator = PatientGenerator::new();
    let mut rng = rand::thread_rng();
    let mut high_risk_count = 0;

    let records: Vec<FeatureRecord> = (0..count)
        .map(|_| {
            if rng.gen_bool(positive_rate) {
                high_risk_count += 1;
                generator.generate_high_risk()
            } else {
                generator.generate_typical()
            }
        })
        .collect();

    let request = PredictRequest {
        data: records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?,
    };

    if curl {
        let body = serde_json::to_string(&request)?;
        println!(
            "curl -s -X POST '{}/predict' -H 'Content-Type: application/json' -d '{}'",
            url.trim_end_matches('/'),
            body
        );
    } else {
        println!("{}", serde_json::to_string_pretty(&request)?);
    }

    info!(
        "Generated {} records ({} typical, {} high-risk)",
        count,
        count - high_risk_count,
        high_risk_count
    );

    Ok(())
}
