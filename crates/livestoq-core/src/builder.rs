//! Assessment builder: turns a validated analysis response into a
//! [`ScanAssessment`].
//!
//! Three derived values are computed here rather than by the service:
//! the fair-price range (linear in live weight), the health-risk label
//! (body condition score escalated by skin status), and the per-field
//! confidence vector aggregated from the stage confidences.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, warn};

use crate::assessment::{
    CaptureSlot, CapturedImages, Confidence, Gender, HealthRisk, Prediction, PriceRange,
    ScanAssessment, Species, new_scan_id, round_confidence,
};
use crate::ml::{MlFullAnalysisResult, ResponseError, SkinDiseaseResult, SkinStatus};

/// Lower fair-price bound per kilogram of live weight (IDR).
pub const PRICE_PER_KG_LOW_IDR: f64 = 55_000.0;
/// Upper fair-price bound per kilogram of live weight (IDR).
pub const PRICE_PER_KG_HIGH_IDR: f64 = 75_000.0;

/// BCS assumed when the dimension/weight result is missing.
pub const DEFAULT_BCS: f64 = 5.0;
/// Stage confidence assumed when a stage did not run.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;
/// Gender is not predicted; its confidence is a fixed neutral value.
pub const GENDER_CONFIDENCE: f64 = 0.75;

const CONFIDENCE_FLOOR: f64 = 0.5;
/// Health-risk confidence floor used for mock assessments.
pub const MOCK_HEALTH_RISK_FLOOR: f64 = 0.6;
const FAIR_PRICE_CONFIDENCE_FACTOR: f64 = 0.9;

// TODO: take species and gender from the service once it classifies them;
// until then these are placeholders, not predictions.
const PLACEHOLDER_SPECIES: Species = Species::Cow;
const PLACEHOLDER_GENDER: Gender = Gender::Male;

/// Age display value when no age is known.
pub const AGE_NOT_AVAILABLE: &str = "N/A";

// ── Fair price ──

/// Two-sided price estimate from live weight.
///
/// Non-positive or non-finite weights mean "weight unavailable" and yield a
/// zero range.
pub fn estimate_fair_price(weight_kg: f64) -> PriceRange {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return PriceRange::default();
    }
    PriceRange {
        min: (weight_kg * PRICE_PER_KG_LOW_IDR).round() as u64,
        max: (weight_kg * PRICE_PER_KG_HIGH_IDR).round() as u64,
    }
}

// ── Health risk ──

/// Health-risk label with its human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthAssessment {
    pub risk: HealthRisk,
    pub explanation: String,
}

/// Derive the health-risk label from body condition score and skin status.
///
/// The BCS gives the baseline; a `diseased` skin result forces `High`, a
/// `suspect` one lifts `Low` to `Medium`. Skin status never lowers the risk.
pub fn derive_health_risk(bcs: f64, skin: Option<&SkinDiseaseResult>) -> HealthAssessment {
    let bcs = if bcs.is_finite() { bcs } else { DEFAULT_BCS };

    let (mut risk, mut explanation) = if (4.0..=7.0).contains(&bcs) {
        (
            HealthRisk::Low,
            "Body condition is within the optimal range.".to_string(),
        )
    } else if (3.0..4.0).contains(&bcs) || (bcs > 7.0 && bcs <= 8.0) {
        (
            HealthRisk::Medium,
            format!("BCS {bcs:.1} is slightly outside optimal range."),
        )
    } else if bcs < 3.0 {
        (
            HealthRisk::High,
            "Animal appears underweight, possible malnutrition.".to_string(),
        )
    } else {
        (
            HealthRisk::High,
            "Animal appears overconditioned, metabolic risk.".to_string(),
        )
    };

    if let Some(skin) = skin {
        match skin.overall_status {
            SkinStatus::Diseased => {
                risk = HealthRisk::High;
                let names: Vec<&str> = skin.conditions.iter().map(|c| c.name.as_str()).collect();
                explanation.push_str(&format!(" Skin conditions detected: {}.", names.join(", ")));
            }
            SkinStatus::Suspect => {
                risk = risk.max(HealthRisk::Medium);
                explanation
                    .push_str(" Possible skin anomalies detected - recommend veterinary check.");
            }
            SkinStatus::Healthy | SkinStatus::Unknown => {}
        }
    }

    HealthAssessment { risk, explanation }
}

// ── Confidence ──

/// Confidence reported by each upstream stage. `None` means the stage did
/// not run or reported nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageConfidences {
    pub segmentation: Option<f64>,
    pub distance: Option<f64>,
    pub pose: Option<f64>,
    /// Mean of the per-dimension confidences.
    pub dimensions: Option<f64>,
    pub skin: Option<f64>,
    pub age: Option<f64>,
}

impl StageConfidences {
    pub fn from_ml(result: &MlFullAnalysisResult) -> Self {
        let dw = result.dimension_weight.as_ref();
        Self {
            segmentation: dw.map(|d| d.segmentation.confidence),
            distance: dw.map(|d| d.distance.confidence),
            pose: dw.map(|d| d.pose.confidence),
            dimensions: dw.and_then(|d| d.mean_dimension_confidence()),
            skin: result.skin_disease.as_ref().map(|s| s.overall_confidence),
            age: result.age_prediction.as_ref().map(|a| a.confidence),
        }
    }

    /// Weakest-link confidence of the weight estimate, before flooring.
    fn weakest_link(&self) -> f64 {
        [self.segmentation, self.distance, self.pose, self.dimensions]
            .into_iter()
            .map(|c| c.unwrap_or(NEUTRAL_CONFIDENCE))
            .fold(f64::INFINITY, f64::min)
    }

    /// Mean of segmentation, pose and (when present) skin confidence.
    fn health_mean(&self) -> f64 {
        let seg = self.segmentation.unwrap_or(NEUTRAL_CONFIDENCE);
        let pose = self.pose.unwrap_or(NEUTRAL_CONFIDENCE);
        match self.skin {
            Some(skin) => (seg + pose + skin) / 3.0,
            None => (seg + pose) / 2.0,
        }
    }

    /// Aggregate into the per-field confidence vector.
    ///
    /// Weight uses the weakest stage; health risk uses the average. Both are
    /// floored at 0.5 and every value is clamped and rounded to two decimals.
    pub fn aggregate(&self) -> Confidence {
        let weight = self.weakest_link();
        Confidence {
            species: round_confidence(self.segmentation.unwrap_or(NEUTRAL_CONFIDENCE)),
            age_eligibility: round_confidence(self.age.unwrap_or(NEUTRAL_CONFIDENCE)),
            weight: round_confidence(weight.max(CONFIDENCE_FLOOR)),
            health_risk: round_confidence(self.health_mean().max(CONFIDENCE_FLOOR)),
            fair_price: round_confidence(
                (weight * FAIR_PRICE_CONFIDENCE_FACTOR).max(CONFIDENCE_FLOOR),
            ),
            gender: GENDER_CONFIDENCE,
        }
    }
}

// ── Assembly ──

/// Build a [`ScanAssessment`] from a validated analysis response.
///
/// Missing sub-results degrade the record (zero weight and price, neutral
/// confidences, absent optional fields) rather than failing the build. The
/// build fails with [`ResponseError::NothingRan`] only when no analysis is
/// left to report, e.g. an age-only response for a scan without a teeth image.
pub fn build_assessment_from_ml(
    result: MlFullAnalysisResult,
    images: CapturedImages,
) -> Result<ScanAssessment, ResponseError> {
    build_assessment_at(result, images, Utc::now(), &mut rand::thread_rng())
}

/// As [`build_assessment_from_ml`] with an explicit clock and id source.
pub fn build_assessment_at<R: Rng + ?Sized>(
    mut result: MlFullAnalysisResult,
    images: CapturedImages,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<ScanAssessment, ResponseError> {
    for failure in result.partial_failures() {
        warn!(
            analysis = failure.analysis,
            detail = %failure.detail,
            "sub-pipeline failed, building partial assessment"
        );
    }

    if !images.contains_key(&CaptureSlot::Teeth) && result.age_prediction.take().is_some() {
        debug!("no teeth image captured, ignoring age prediction");
        result.analyses_run.retain(|a| a != crate::ml::ANALYSIS_AGE_PREDICTION);
    }

    let dw = result.dimension_weight.as_ref();
    let weight_kg = dw
        .map(|d| (d.weight.predicted_kg * 10.0).round() / 10.0)
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(0.0);
    let bcs = dw.map(|d| d.weight.bcs).unwrap_or(DEFAULT_BCS);

    let age_months = result
        .age_prediction
        .as_ref()
        .map(|a| a.predicted_age_months)
        .filter(|m| m.is_finite() && *m >= 0.0)
        .map(|m| m.round() as u32);
    let age_eligibility = age_months
        .map(|m| m.to_string())
        .unwrap_or_else(|| AGE_NOT_AVAILABLE.to_string());

    let health = derive_health_risk(bcs, result.skin_disease.as_ref());
    let confidence = StageConfidences::from_ml(&result).aggregate();

    // Fall back to what is present, then to what was attempted.
    let analyses_run = if !result.analyses_run.is_empty() {
        std::mem::take(&mut result.analyses_run)
    } else if !result.present_analyses().is_empty() {
        result.present_analyses()
    } else {
        result
            .partial_failures()
            .into_iter()
            .map(|f| f.analysis.to_string())
            .collect()
    };
    if analyses_run.is_empty() {
        return Err(ResponseError::NothingRan);
    }

    Ok(ScanAssessment {
        id: new_scan_id(now, rng),
        created_at: now,
        images,
        prediction: Prediction {
            species: PLACEHOLDER_SPECIES,
            age_months,
            age_eligibility,
            weight_kg,
            gender: PLACEHOLDER_GENDER,
            health_risk: health.risk,
            health_risk_explanation: Some(health.explanation),
            fair_price_idr_range: estimate_fair_price(weight_kg),
        },
        confidence,
        ml_analysis: result.dimension_weight,
        skin_disease: result.skin_disease,
        age_prediction: result.age_prediction,
        analyses_run,
    })
}
