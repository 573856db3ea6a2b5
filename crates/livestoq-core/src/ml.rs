//! Response contract of the external analysis service (`POST /analyze/full`).
//!
//! Field names match the wire format exactly (snake_case). These records are
//! also embedded verbatim in a [`ScanAssessment`](crate::ScanAssessment) when
//! the corresponding sub-pipeline ran.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Label reported in `analyses_run` by the dimension/weight sub-pipeline.
pub const ANALYSIS_DIMENSION_WEIGHT: &str = "dimension_weight";
/// Label reported in `analyses_run` by the skin-disease sub-pipeline.
pub const ANALYSIS_SKIN_DISEASE: &str = "skin_disease";
/// Label reported in `analyses_run` by the age-from-teeth sub-pipeline.
pub const ANALYSIS_AGE_PREDICTION: &str = "age_prediction";
/// Sentinel marking an assessment produced without any real analysis.
pub const ANALYSIS_MOCK: &str = "mock";

// ── Dimension + weight (side image) ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub bbox: Vec<f64>,
    pub area_pixels: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceEstimate {
    pub distance_m: f64,
    pub method: String,
    pub pixels_per_meter: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoints {
    pub num_detected: f64,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub orientation: String,
    pub yaw_deg: f64,
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub foreshortening_factor: f64,
    #[serde(default)]
    pub is_valid: bool,
    pub confidence: f64,
}

/// The eight body measurements, in centimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDimensions {
    pub body_length_cm: f64,
    pub body_width_cm: f64,
    pub tube_girth_cm: f64,
    pub body_height_cm: f64,
    pub chest_width_cm: f64,
    pub abdominal_girth_cm: f64,
    pub chest_depth_cm: f64,
    pub chest_girth_cm: f64,
}

impl BodyDimensions {
    /// Label/value pairs in display order.
    pub fn entries(&self) -> [(&'static str, f64); 8] {
        [
            ("body_length_cm", self.body_length_cm),
            ("body_width_cm", self.body_width_cm),
            ("tube_girth_cm", self.tube_girth_cm),
            ("body_height_cm", self.body_height_cm),
            ("chest_width_cm", self.chest_width_cm),
            ("abdominal_girth_cm", self.abdominal_girth_cm),
            ("chest_depth_cm", self.chest_depth_cm),
            ("chest_girth_cm", self.chest_girth_cm),
        ]
    }
}

/// A per-dimension confidence. The service sends either a number or a
/// numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionConfidence {
    Score(f64),
    Text(String),
}

impl DimensionConfidence {
    /// Numeric value, or `None` if the string form does not parse.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Score(v) => Some(*v).filter(|v| v.is_finite()),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEstimate {
    pub predicted_kg: f64,
    pub range_kg: (f64, f64),
    /// Body condition score on the 1–9 scale.
    pub bcs: f64,
    pub breed: String,
    pub breed_factor: f64,
    #[serde(default)]
    pub method_weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeightResult {
    pub image_size: ImageSize,
    pub breed: String,
    pub segmentation: Segmentation,
    pub distance: DistanceEstimate,
    pub keypoints: Keypoints,
    pub pose: PoseEstimate,
    pub dimensions: BodyDimensions,
    #[serde(default)]
    pub dimension_confidence: BTreeMap<String, DimensionConfidence>,
    pub weight: WeightEstimate,
}

impl DimensionWeightResult {
    /// Mean of all parseable per-dimension confidences, or `None` if there are none.
    pub fn mean_dimension_confidence(&self) -> Option<f64> {
        let values: Vec<f64> = self
            .dimension_confidence
            .values()
            .filter_map(DimensionConfidence::value)
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// ── Skin disease (side image) ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinStatus {
    Healthy,
    Suspect,
    Diseased,
    Unknown,
}

impl SkinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Suspect => "suspect",
            Self::Diseased => "diseased",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinCondition {
    pub name: String,
    pub confidence: f64,
    pub severity: Severity,
    pub affected_area_pct: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinDiseaseResult {
    pub overall_status: SkinStatus,
    pub overall_confidence: f64,
    /// 0–100.
    pub skin_quality_score: f64,
    #[serde(default)]
    pub conditions: Vec<SkinCondition>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

// ── Age prediction (teeth image) ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgePredictionResult {
    pub predicted_age_months: f64,
    pub age_range_months: (f64, f64),
    /// e.g. "milk-teeth", "2-tooth", "full-mouth", "old".
    pub dentition_stage: String,
    /// 0–3.
    pub wear_grade: f64,
    pub tooth_count: f64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

// ── Combined response ──

/// Full response of the combined analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlFullAnalysisResult {
    pub success: bool,
    #[serde(default)]
    pub analyses_run: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_weight: Option<DimensionWeightResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_weight_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_disease: Option<SkinDiseaseResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_prediction: Option<AgePredictionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_prediction_error: Option<String>,
}

/// A response whose shape violates the endpoint contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("service reported success=false")]
    Unsuccessful,
    #[error("both `{0}` and `{0}_error` are present")]
    Conflicting(&'static str),
    #[error("no analysis ran and no sub-result is present")]
    NothingRan,
}

/// A sub-pipeline that failed while the rest of the request succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailure {
    pub analysis: &'static str,
    pub detail: String,
}

impl MlFullAnalysisResult {
    /// Check the response against the endpoint contract and normalize it.
    ///
    /// - Rejects `success: false` and sub-results reported alongside their `_error`.
    /// - Drops an `age_prediction` the service returned although no teeth image
    ///   was sent.
    /// - Fills an empty `analyses_run` from the sub-results actually present.
    pub fn validate(mut self, teeth_supplied: bool) -> Result<Self, ResponseError> {
        if !self.success {
            return Err(ResponseError::Unsuccessful);
        }
        if self.dimension_weight.is_some() && self.dimension_weight_error.is_some() {
            return Err(ResponseError::Conflicting(ANALYSIS_DIMENSION_WEIGHT));
        }
        if self.age_prediction.is_some() && self.age_prediction_error.is_some() {
            return Err(ResponseError::Conflicting(ANALYSIS_AGE_PREDICTION));
        }

        if !teeth_supplied && self.age_prediction.is_some() {
            tracing::warn!("discarding age prediction returned without a teeth image");
            self.age_prediction = None;
            self.analyses_run.retain(|a| a != ANALYSIS_AGE_PREDICTION);
        }

        if self.analyses_run.is_empty() {
            self.analyses_run = self.present_analyses();
            if self.analyses_run.is_empty() {
                return Err(ResponseError::NothingRan);
            }
        }

        Ok(self)
    }

    /// Labels of the sub-results present in this response, in pipeline order.
    pub fn present_analyses(&self) -> Vec<String> {
        let mut present = Vec::new();
        if self.dimension_weight.is_some() {
            present.push(ANALYSIS_DIMENSION_WEIGHT.to_string());
        }
        if self.skin_disease.is_some() {
            present.push(ANALYSIS_SKIN_DISEASE.to_string());
        }
        if self.age_prediction.is_some() {
            present.push(ANALYSIS_AGE_PREDICTION.to_string());
        }
        present
    }

    /// Sub-pipelines that reported an error instead of a result.
    pub fn partial_failures(&self) -> Vec<PartialFailure> {
        let mut failures = Vec::new();
        if let Some(detail) = &self.dimension_weight_error {
            failures.push(PartialFailure {
                analysis: ANALYSIS_DIMENSION_WEIGHT,
                detail: detail.clone(),
            });
        }
        if let Some(detail) = &self.age_prediction_error {
            failures.push(PartialFailure {
                analysis: ANALYSIS_AGE_PREDICTION,
                detail: detail.clone(),
            });
        }
        failures
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_response_parses() {
        let result = fixtures::full();
        assert!(result.success);
        assert_eq!(result.analyses_run.len(), 3);

        let dw = result.dimension_weight.as_ref().unwrap();
        assert_eq!(dw.image_size.width, 1920.0);
        assert_eq!(dw.weight.range_kg, (395.0, 446.0));
        assert_eq!(dw.weight.method_weights["regression"], 0.4);

        let skin = result.skin_disease.as_ref().unwrap();
        assert_eq!(skin.overall_status, SkinStatus::Healthy);
        assert!(skin.details.is_empty());

        let age = result.age_prediction.as_ref().unwrap();
        assert_eq!(age.dentition_stage, "2-tooth");
        assert_eq!(age.age_range_months, (20.0, 28.0));
    }

    #[test]
    fn whole_number_floats_parse() {
        let json = r#"{
            "predicted_age_months": 24.0,
            "age_range_months": [20.0, 28.0],
            "dentition_stage": "2-tooth",
            "wear_grade": 1.0,
            "tooth_count": 8.0,
            "confidence": 0.77
        }"#;
        let age: AgePredictionResult = serde_json::from_str(json).unwrap();
        assert_eq!(age.predicted_age_months, 24.0);
        assert_eq!(age.tooth_count, 8.0);

        let size: ImageSize = serde_json::from_str(r#"{"width": 1920.0, "height": 1080}"#).unwrap();
        assert_eq!(size.height, 1080.0);
        let kp: Keypoints =
            serde_json::from_str(r#"{"num_detected": 14.0, "method": "pose_model"}"#).unwrap();
        assert_eq!(kp.num_detected, 14.0);
    }

    #[test]
    fn dimension_confidence_accepts_numbers_and_strings() {
        let dw = fixtures::full().dimension_weight.unwrap();
        let mean = dw.mean_dimension_confidence().unwrap();
        assert!((mean - 0.8).abs() < 1e-9);
    }

    #[test]
    fn unparseable_dimension_confidence_is_skipped() {
        let conf: BTreeMap<String, DimensionConfidence> =
            serde_json::from_str(r#"{"a": "n/a", "b": 0.6}"#).unwrap();
        let values: Vec<f64> = conf.values().filter_map(DimensionConfidence::value).collect();
        assert_eq!(values, vec![0.6]);
    }

    #[test]
    fn validate_rejects_unsuccessful() {
        let json = r#"{"success": false, "analyses_run": []}"#;
        let result: MlFullAnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.validate(false), Err(ResponseError::Unsuccessful));
    }

    #[test]
    fn validate_rejects_result_alongside_error() {
        let mut result = fixtures::full();
        result.dimension_weight_error = Some("pose invalid".into());
        assert_eq!(
            result.validate(true),
            Err(ResponseError::Conflicting("dimension_weight"))
        );
    }

    #[test]
    fn validate_drops_age_without_teeth_image() {
        let result = fixtures::full().validate(false).unwrap();
        assert!(result.age_prediction.is_none());
        assert!(!result.analyses_run.iter().any(|a| a == "age_prediction"));
    }

    #[test]
    fn validate_fills_empty_analyses_run() {
        let mut result = fixtures::full();
        result.analyses_run.clear();
        let result = result.validate(true).unwrap();
        assert_eq!(
            result.analyses_run,
            vec!["dimension_weight", "skin_disease", "age_prediction"]
        );
    }

    #[test]
    fn validate_rejects_empty_response() {
        let json = r#"{"success": true, "analyses_run": [], "dimension_weight_error": "no cow"}"#;
        let result: MlFullAnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.validate(false), Err(ResponseError::NothingRan));
    }

    #[test]
    fn partial_failures_listed() {
        let json = r#"{
            "success": true,
            "analyses_run": ["skin_disease"],
            "dimension_weight_error": "segmentation failed",
            "age_prediction_error": "no incisors visible",
            "skin_disease": {
                "overall_status": "unknown",
                "overall_confidence": 0.4,
                "skin_quality_score": 0.0
            }
        }"#;
        let result: MlFullAnalysisResult = serde_json::from_str(json).unwrap();
        let failures = result.partial_failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].analysis, "dimension_weight");
        assert_eq!(failures[1].detail, "no incisors visible");
    }
}
