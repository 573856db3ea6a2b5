//! Core types and transforms for Livestoq scan assessments.

pub mod assessment;
pub mod breed;
pub mod builder;
pub mod ml;
pub mod mock;

pub use assessment::{
    CaptureSlot, CapturedImages, Confidence, Gender, HealthRisk, Prediction, PriceRange,
    ScanAssessment, Species,
};
pub use breed::Breed;
pub use builder::{build_assessment_at, build_assessment_from_ml, derive_health_risk, estimate_fair_price};
pub use ml::{MlFullAnalysisResult, PartialFailure, ResponseError};
pub use mock::{generate_mock_assessment, generate_mock_assessment_at};
