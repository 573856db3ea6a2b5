//! Caller-driven failover from live analysis to a mock assessment.

use async_trait::async_trait;
use chrono::Utc;
use livestoq_core::{CapturedImages, ScanAssessment, generate_mock_assessment_at};
use rand::Rng;
use tracing::{info, warn};

use crate::client::{AnalysisClient, AnalysisError};
use crate::upload::AnalysisRequest;

/// Anything that can turn a scan request into an assessment.
#[async_trait]
pub trait ScanAnalyzer: Send + Sync {
    async fn analyze_scan(
        &self,
        request: &AnalysisRequest,
        images: CapturedImages,
    ) -> Result<ScanAssessment, AnalysisError>;
}

#[async_trait]
impl ScanAnalyzer for AnalysisClient {
    async fn analyze_scan(
        &self,
        request: &AnalysisRequest,
        images: CapturedImages,
    ) -> Result<ScanAssessment, AnalysisError> {
        AnalysisClient::analyze_scan(self, request, images).await
    }
}

/// How a scan produced its assessment.
#[derive(Debug)]
pub enum ScanOutcome {
    Analyzed(ScanAssessment),
    /// Live analysis failed and the caller accepted a mock instead.
    Mocked {
        assessment: ScanAssessment,
        cause: AnalysisError,
    },
}

impl ScanOutcome {
    pub fn assessment(&self) -> &ScanAssessment {
        match self {
            Self::Analyzed(a) => a,
            Self::Mocked { assessment, .. } => assessment,
        }
    }

    pub fn into_assessment(self) -> ScanAssessment {
        match self {
            Self::Analyzed(a) => a,
            Self::Mocked { assessment, .. } => assessment,
        }
    }
}

/// Run live analysis; on failure ask `use_mock` whether to fall back.
///
/// The decision belongs to the caller (typically a user prompt). When it
/// declines, the original error is returned unchanged.
pub async fn scan_with_fallback<A, F, R>(
    analyzer: &A,
    request: &AnalysisRequest,
    images: CapturedImages,
    use_mock: F,
    rng: &mut R,
) -> Result<ScanOutcome, AnalysisError>
where
    A: ScanAnalyzer + ?Sized,
    F: FnOnce(&AnalysisError) -> bool,
    R: Rng + ?Sized,
{
    match analyzer.analyze_scan(request, images.clone()).await {
        Ok(assessment) => Ok(ScanOutcome::Analyzed(assessment)),
        Err(cause) => {
            warn!(error = %cause, "analysis failed");
            if !use_mock(&cause) {
                return Err(cause);
            }
            info!("falling back to mock assessment");
            let assessment = generate_mock_assessment_at(images, Utc::now(), rng);
            Ok(ScanOutcome::Mocked { assessment, cause })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livestoq_core::{CaptureSlot, HealthRisk, MlFullAnalysisResult, build_assessment_from_ml};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::upload::{ImageMime, ImageUpload};

    /// Analyzer that either fails with a server error or returns a fixed result.
    struct FakeAnalyzer {
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeAnalyzer {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ScanAnalyzer for FakeAnalyzer {
        async fn analyze_scan(
            &self,
            _request: &AnalysisRequest,
            images: CapturedImages,
        ) -> Result<ScanAssessment, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AnalysisError::RemoteAnalysis {
                    status: 502,
                    detail: "Failed to connect to ML service".into(),
                });
            }
            let result: MlFullAnalysisResult = serde_json::from_str(
                r#"{"success": true, "analyses_run": ["skin_disease"],
                    "skin_disease": {"overall_status": "healthy", "overall_confidence": 0.9,
                                     "skin_quality_score": 90.0}}"#,
            )
            .unwrap();
            Ok(build_assessment_from_ml(result, images).unwrap())
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(ImageUpload::new("side.jpg", ImageMime::Jpeg, vec![0xff, 0xd8]))
    }

    fn images() -> CapturedImages {
        let mut images = CapturedImages::new();
        images.insert(CaptureSlot::Side, "side.jpg".into());
        images
    }

    #[tokio::test]
    async fn success_skips_fallback() {
        let analyzer = FakeAnalyzer::new(false);
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = scan_with_fallback(
            &analyzer,
            &request(),
            images(),
            |_| panic!("should not be asked"),
            &mut rng,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, ScanOutcome::Analyzed(_)));
        assert!(!outcome.assessment().is_mock());
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn accepted_fallback_yields_mock() {
        let analyzer = FakeAnalyzer::new(true);
        let mut rng = StdRng::seed_from_u64(2);
        let outcome = scan_with_fallback(&analyzer, &request(), images(), |_| true, &mut rng)
            .await
            .unwrap();

        match &outcome {
            ScanOutcome::Mocked { assessment, cause } => {
                assert!(assessment.is_mock());
                assert_eq!(assessment.prediction.health_risk, HealthRisk::Medium);
                assert_eq!(assessment.images, images());
                assert!(matches!(cause, AnalysisError::RemoteAnalysis { status: 502, .. }));
            }
            other => panic!("expected mock, got {other:?}"),
        }
        // No internal retry.
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declined_fallback_returns_original_error() {
        let analyzer = FakeAnalyzer::new(true);
        let mut rng = StdRng::seed_from_u64(3);
        let result =
            scan_with_fallback(&analyzer, &request(), images(), |_| false, &mut rng).await;
        assert!(matches!(
            result,
            Err(AnalysisError::RemoteAnalysis { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn connectivity_error_offers_fallback() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = AnalysisClient::new(format!("http://{addr}"));

        let mut asked = false;
        let mut rng = StdRng::seed_from_u64(4);
        let result = scan_with_fallback(
            &client,
            &request(),
            images(),
            |e| {
                asked = matches!(e, AnalysisError::Connectivity(_));
                false
            },
            &mut rng,
        )
        .await;

        assert!(asked);
        assert!(matches!(result, Err(AnalysisError::Connectivity(_))));
    }
}
