//! HTTP client for the combined analysis endpoint.

use std::time::Duration;

use livestoq_core::{CapturedImages, MlFullAnalysisResult, ScanAssessment, build_assessment_from_ml};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::upload::{AnalysisRequest, ImageUpload};

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The service could not be reached at all (connect, DNS, timeout,
    /// interrupted body).
    #[error("could not reach analysis service: {0}")]
    Connectivity(#[source] reqwest::Error),
    /// The service answered, but not with a usable analysis.
    #[error("analysis service returned {status}: {detail}")]
    RemoteAnalysis { status: u16, detail: String },
    #[error("could not build analysis request: {0}")]
    InvalidRequest(#[source] reqwest::Error),
}

/// Error body shape of the analysis service and its proxy.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
}

/// Client for `POST {base_url}/analyze/full`.
pub struct AnalysisClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl AnalysisClient {
    pub const ENDPOINT: &'static str = "/analyze/full";

    /// Create a client for the given service base URL.
    ///
    /// `base_url` should be like `http://localhost:8000` (a trailing slash is
    /// trimmed). No timeout is imposed unless [`with_timeout`](Self::with_timeout)
    /// is called.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    /// Fail requests that take longer than `timeout` with
    /// [`AnalysisError::Connectivity`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send the images for analysis and return the validated response.
    ///
    /// No retries: every failure is returned to the caller.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<MlFullAnalysisResult, AnalysisError> {
        let url = format!("{}{}", self.base_url, Self::ENDPOINT);
        let form = build_form(request).map_err(AnalysisError::InvalidRequest)?;

        info!(
            url = %url,
            breed = %request.breed,
            teeth = request.teeth.is_some(),
            "sending images for analysis"
        );
        let mut builder = self.client.post(&url).multipart(form);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let resp = builder.send().await.map_err(AnalysisError::Connectivity)?;

        let status = resp.status();
        let body = resp.text().await.map_err(AnalysisError::Connectivity)?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "analysis service error");
            return Err(AnalysisError::RemoteAnalysis {
                status: status.as_u16(),
                detail: error_detail(&body, status.as_u16()),
            });
        }

        let result: MlFullAnalysisResult =
            serde_json::from_str(&body).map_err(|e| AnalysisError::RemoteAnalysis {
                status: status.as_u16(),
                detail: format!("malformed response: {e}"),
            })?;

        let unsuccessful = !result.success;
        let result = result
            .validate(request.teeth.is_some())
            .map_err(|e| AnalysisError::RemoteAnalysis {
                status: status.as_u16(),
                detail: if unsuccessful {
                    error_detail_field(&body).unwrap_or_else(|| e.to_string())
                } else {
                    e.to_string()
                },
            })?;

        info!(analyses = ?result.analyses_run, "analysis complete");
        Ok(result)
    }

    /// Analyze and build the assessment in one step.
    ///
    /// A response that leaves nothing to report for `images` (an age-only
    /// result when no teeth image was captured) is a [`AnalysisError::RemoteAnalysis`].
    pub async fn analyze_scan(
        &self,
        request: &AnalysisRequest,
        images: CapturedImages,
    ) -> Result<ScanAssessment, AnalysisError> {
        let result = self.analyze(request).await?;
        build_assessment_from_ml(result, images).map_err(|e| AnalysisError::RemoteAnalysis {
            status: reqwest::StatusCode::OK.as_u16(),
            detail: e.to_string(),
        })
    }
}

fn build_form(request: &AnalysisRequest) -> Result<Form, reqwest::Error> {
    let mut form = Form::new()
        .part("side_image", image_part(&request.side)?)
        .text("breed", request.breed.as_str());
    if let Some(teeth) = &request.teeth {
        form = form.part("teeth_image", image_part(teeth)?);
    }
    Ok(form)
}

fn image_part(image: &ImageUpload) -> Result<Part, reqwest::Error> {
    Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(image.mime.as_str())
}

/// `details`, then `error`, from a JSON error body.
fn error_detail_field(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .details
        .filter(|d| !d.is_empty())
        .or(parsed.error.filter(|e| !e.is_empty()))
}

fn error_detail(body: &str, status: u16) -> String {
    error_detail_field(body)
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| format!("API error: {status}"))
}

#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one request with a canned response. The handle yields
    /// the raw request bytes.
    pub async fn one_shot(status: u16, body: &str) -> (String, JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return buf;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(header_end) = find(&buf, b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            match content_length {
                Some(len) if buf.len() >= header_end + 4 + len => return buf,
                None if buf.ends_with(b"--\r\n") || buf.ends_with(b"0\r\n\r\n") => return buf,
                _ => {}
            }
        }
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }
}
