// Path: crates/filter/src/http_runtime.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hearth_api::error::FilterError;
use hearth_api::filter_runtime::ContentFilterRuntime;

/// Built in the exact shape of the teacher's `HttpInferenceRuntime`:
/// a `reqwest::Client` with a fixed request timeout, a Bearer header when an
/// API key is configured (omitted for unauthenticated local endpoints such
/// as Ollama), JSON request/response DTOs, and a status-check-then-parse
/// flow. Unlike the teacher's adapter, errors are *returned*, not mapped to
/// a kernel-wide error type — `hearth-filter::pipeline` is the layer that
/// inverts them into a fail-open `FilterVerdict` (spec §4.8).
pub struct HttpContentFilterRuntime {
    client: reqwest::Client,
    endpoint_url: String,
    model_name: String,
    api_key: Option<String>,
}

impl HttpContentFilterRuntime {
    pub fn new(endpoint_url: String, model_name: String, api_key: Option<String>) -> Self {
        HttpContentFilterRuntime {
            client: reqwest::Client::new(),
            endpoint_url,
            model_name,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl ContentFilterRuntime for HttpContentFilterRuntime {
    async fn classify(&self, prompt: &str, timeout: Duration) -> Result<String, FilterError> {
        let request_body = GenerateRequest {
            model: &self.model_name,
            prompt,
            stream: false,
        };

        let mut request = self
            .client
            .post(&self.endpoint_url)
            .timeout(timeout)
            .json(&request_body);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FilterError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FilterError::Upstream(format!(
                "non-success status: {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FilterError::Upstream(format!("malformed response body: {e}")))?;
        Ok(parsed.response)
    }
}
