//! Analysis ingestion: multipart upload to the external CV service, typed
//! response, and the caller-driven mock fallback.

pub mod client;
pub mod fallback;
pub mod upload;

pub use client::{AnalysisClient, AnalysisError};
pub use fallback::{ScanAnalyzer, ScanOutcome, scan_with_fallback};
pub use upload::{AnalysisRequest, ImageMime, ImageUpload};
