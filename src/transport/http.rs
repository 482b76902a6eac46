#![cfg(feature = "service-http")]

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};

use super::{DetectionService, ImagePayload};

/// Blocking HTTP client for the detection endpoint.
///
/// No retries: a failed request is reported to the caller as-is.
pub struct HttpDetectionService {
    url: String,
    agent: ureq::Agent,
}

impl HttpDetectionService {
    pub fn new(url: &str) -> Result<Self> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!("detection service url must be http(s): {}", url));
        }
        Ok(Self {
            url: url.to_string(),
            agent: ureq::AgentBuilder::new().build(),
        })
    }
}

impl DetectionService for HttpDetectionService {
    fn name(&self) -> &'static str {
        "http"
    }

    fn detect(&mut self, image: &ImagePayload) -> Result<Value> {
        let body = json!({
            "image": image.data_url,
            "filename": image.filename,
        });
        let response = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e| anyhow!("detection request to {} failed: {}", self.url, e))?;
        let text = response
            .into_string()
            .context("failed to read detection response body")?;
        serde_json::from_str(&text).map_err(|e| anyhow!("detection response is not JSON: {}", e))
    }
}
