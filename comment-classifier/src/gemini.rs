use crate::remote::ScoringBackend;
use async_trait::async_trait;
use cleaner_core::{ClassifierError, GeminiConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PROVIDER: &str = "gemini";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
            .map(str::trim)
    }
}

/// A non-success response counts as quota exhaustion on 429 or when the body says so.
pub fn is_quota_error(status: u16, body: &str) -> bool {
    status == 429 || body.contains("quota") || body.contains("RESOURCE_EXHAUSTED")
}

/// `generateContent` client for the Gemini API, authenticated with a `key` query parameter.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: GEMINI_API_URL.to_string(),
            model: GEMINI_MODEL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new()
            .with_base_url(&config.base_url)
            .with_model(&config.model)
            .with_timeout(config.request_timeout())
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Upper bound for one `generateContent` round trip, body included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoringBackend for GeminiClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, ClassifierError> {
        if api_key.is_empty() {
            return Err(ClassifierError::MissingApiKey {
                provider: PROVIDER.to_string(),
            });
        }

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, "Gemini generateContent request");

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if is_quota_error(status.as_u16(), &body) {
                return Err(ClassifierError::QuotaExceeded {
                    provider: PROVIDER.to_string(),
                    status_code: Some(status.as_u16()),
                    details: body,
                });
            }
            return Err(ClassifierError::RequestFailed {
                provider: PROVIDER.to_string(),
                status_code: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| ClassifierError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
                details: e.to_string(),
            })?;

        parsed
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| ClassifierError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
                details: "response carried no candidate text".to_string(),
            })
    }
}
