//! HTTP client for the analysis backend
//!
//! The backend accepts an audio file as multipart form data on
//! POST /analyze and returns the full analysis JSON. Non-2xx responses
//! carry `{error}` and are surfaced as failures, never silently
//! swallowed. An OPTIONS preflight to the same endpoint serves as a
//! liveness probe.

use crate::error::{Error, Result};
use remix_common::analysis::{AnalysisError, AudioAnalysis};
use tracing::{debug, warn};

/// Client for the external analysis backend
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    base_url: String,
    http: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Probe backend liveness with an OPTIONS request
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/analyze", self.base_url);
        match self
            .http
            .request(reqwest::Method::OPTIONS, &url)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Analysis backend unavailable: {}", e);
                false
            }
        }
    }

    /// Submit an audio file for analysis
    pub async fn analyze(&self, file_name: &str, bytes: Vec<u8>) -> Result<AudioAnalysis> {
        let url = format!("{}/analyze", self.base_url);
        debug!("Submitting {} ({} bytes) to {}", file_name, bytes.len(), url);

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.http.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<AnalysisError>().await {
                Ok(body) => body.error,
                Err(_) => format!("analysis backend returned {status}"),
            };
            return Err(Error::Analysis(message));
        }

        Ok(response.json::<AudioAnalysis>().await?)
    }
}
