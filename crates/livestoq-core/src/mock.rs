//! Demo-mode assessments that need no analysis service.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::assessment::{
    CaptureSlot, CapturedImages, Confidence, Gender, HealthRisk, Prediction, PriceRange,
    ScanAssessment, Species, new_scan_id, round_confidence,
};
use crate::builder::{AGE_NOT_AVAILABLE, MOCK_HEALTH_RISK_FLOOR, NEUTRAL_CONFIDENCE};
use crate::ml::ANALYSIS_MOCK;

pub const MOCK_WEIGHT_KG: f64 = 380.0;
pub const MOCK_AGE_MONTHS: u32 = 18;
pub const MOCK_FAIR_PRICE: PriceRange = PriceRange {
    min: 12_000_000,
    max: 18_000_000,
};
pub const MOCK_EXPLANATION: &str =
    "Demo mode - simulated assessment. Enable ML Pipeline for real analysis.";

const MOCK_CONFIDENCE_LOW: f64 = 0.70;
const MOCK_CONFIDENCE_HIGH: f64 = 0.99;

/// Generate a mock assessment using the thread-local RNG.
pub fn generate_mock_assessment(images: CapturedImages) -> ScanAssessment {
    generate_mock_assessment_at(images, Utc::now(), &mut rand::thread_rng())
}

/// Generate a mock assessment from an injected clock and random source.
///
/// Structurally identical to a built assessment, minus the ML sub-records.
/// Age is only filled when a teeth image was captured.
pub fn generate_mock_assessment_at<R: Rng + ?Sized>(
    images: CapturedImages,
    now: DateTime<Utc>,
    rng: &mut R,
) -> ScanAssessment {
    let has_teeth = images.contains_key(&CaptureSlot::Teeth);

    let confidence = Confidence {
        species: mock_confidence(rng),
        age_eligibility: if has_teeth {
            mock_confidence(rng)
        } else {
            NEUTRAL_CONFIDENCE
        },
        weight: mock_confidence(rng),
        health_risk: mock_confidence(rng).max(MOCK_HEALTH_RISK_FLOOR),
        fair_price: mock_confidence(rng),
        gender: mock_confidence(rng),
    };

    ScanAssessment {
        id: new_scan_id(now, rng),
        created_at: now,
        images,
        prediction: Prediction {
            species: Species::Cow,
            age_months: has_teeth.then_some(MOCK_AGE_MONTHS),
            age_eligibility: if has_teeth {
                MOCK_AGE_MONTHS.to_string()
            } else {
                AGE_NOT_AVAILABLE.to_string()
            },
            weight_kg: MOCK_WEIGHT_KG,
            gender: Gender::Male,
            health_risk: HealthRisk::Medium,
            health_risk_explanation: Some(MOCK_EXPLANATION.to_string()),
            fair_price_idr_range: MOCK_FAIR_PRICE,
        },
        confidence,
        ml_analysis: None,
        skin_disease: None,
        age_prediction: None,
        analyses_run: vec![ANALYSIS_MOCK.to_string()],
    }
}

fn mock_confidence<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    round_confidence(rng.gen_range(MOCK_CONFIDENCE_LOW..=MOCK_CONFIDENCE_HIGH))
}
