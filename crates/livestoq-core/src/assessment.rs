//! The `ScanAssessment` domain record rendered by every front end.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ml::{AgePredictionResult, DimensionWeightResult, SkinDiseaseResult};

/// Capture slots of the scan wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSlot {
    /// Lateral view. Required for every analysis.
    Side,
    /// Teeth close-up. Optional; enables age prediction.
    Teeth,
}

impl CaptureSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Side => "side",
            Self::Teeth => "teeth",
        }
    }
}

/// Captured images keyed by slot. Values are opaque to the core.
pub type CapturedImages = BTreeMap<CaptureSlot, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Cow,
    Goat,
    Sheep,
    Lamb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HealthRisk {
    Low,
    Medium,
    High,
}

impl HealthRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for HealthRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimated sale price bounds in Indonesian Rupiah.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub species: Species,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_months: Option<u32>,
    /// Display string: the age in months, or "N/A".
    pub age_eligibility: String,
    pub weight_kg: f64,
    pub gender: Gender,
    pub health_risk: HealthRisk,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_risk_explanation: Option<String>,
    pub fair_price_idr_range: PriceRange,
}

/// Per-field confidence, each in `[0, 1]` with two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confidence {
    pub species: f64,
    pub age_eligibility: f64,
    pub weight: f64,
    pub health_risk: f64,
    pub fair_price: f64,
    pub gender: f64,
}

impl Confidence {
    /// Label/value pairs in display order.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("species", self.species),
            ("ageEligibility", self.age_eligibility),
            ("weight", self.weight),
            ("healthRisk", self.health_risk),
            ("fairPrice", self.fair_price),
            ("gender", self.gender),
        ]
    }
}

/// Clamp to `[0, 1]` and round to two decimals. Non-finite input maps to 0.
pub fn round_confidence(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// Result of one scan attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanAssessment {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub images: CapturedImages,
    pub prediction: Prediction,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_analysis: Option<DimensionWeightResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_disease: Option<SkinDiseaseResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_prediction: Option<AgePredictionResult>,
    pub analyses_run: Vec<String>,
}

impl ScanAssessment {
    pub fn is_mock(&self) -> bool {
        self.analyses_run.iter().any(|a| a == crate::ml::ANALYSIS_MOCK)
    }
}

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a scan id: `scan_<unix-millis>_<9 base-36 chars>`.
pub fn new_scan_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("scan_{}_{}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn scan_id_shape() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut rng = StdRng::seed_from_u64(1);
        let id = new_scan_id(now, &mut rng);

        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "scan");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn round_confidence_clamps_and_rounds() {
        assert_eq!(round_confidence(0.876), 0.88);
        assert_eq!(round_confidence(1.4), 1.0);
        assert_eq!(round_confidence(-0.2), 0.0);
        assert_eq!(round_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn health_risk_orders_by_severity() {
        assert!(HealthRisk::Low < HealthRisk::Medium);
        assert!(HealthRisk::Medium < HealthRisk::High);
    }

    #[test]
    fn capture_slots_serialize_lowercase() {
        let mut images = CapturedImages::new();
        images.insert(CaptureSlot::Teeth, "teeth.jpg".into());
        images.insert(CaptureSlot::Side, "side.jpg".into());
        let json = serde_json::to_string(&images).unwrap();
        assert_eq!(json, r#"{"side":"side.jpg","teeth":"teeth.jpg"}"#);
    }
}
