//! Vision model client abstraction.
//!
//! `GeminiVisionClient` talks to the Generative Language API; tests use
//! `FakeVisionClient` with canned replies. One request per call: no retry,
//! no backoff. The API key travels in the `x-goog-api-key` header so it never
//! appears in a URL.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::data_uri::DecodedImage;

/// Vision backend errors
#[derive(Debug, Clone, Error)]
pub enum VisionError {
    #[error("GEMINI_API_KEY is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Model returned no text{}", .0.as_deref().map(|r| format!(" (finish reason: {})", r)).unwrap_or_default())]
    EmptyResponse(Option<String>),
}

/// Sends one prompt plus one image, returns the model's text.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn generate(&self, prompt: &str, image: &DecodedImage) -> Result<String, VisionError>;

    /// Model identifier, for logs
    fn model(&self) -> &str;
}

// ============================================================================
// Gemini
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
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

/// Gemini `generateContent` client
pub struct GeminiVisionClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiVisionClient {
    pub fn new(config: GeminiConfig) -> Result<Self, VisionError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("calcd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VisionError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.model
        )
    }

    fn build_request(
        &self,
        api_key: &str,
        body: &GenerateRequest<'_>,
    ) -> Result<reqwest::Request, VisionError> {
        self.http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(body)
            .build()
            .map_err(|e| VisionError::Http(format!("Failed to build request: {}", e.without_url())))
    }
}

#[async_trait]
impl VisionClient for GeminiVisionClient {
    async fn generate(&self, prompt: &str, image: &DecodedImage) -> Result<String, VisionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(VisionError::NotConfigured)?;

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime_type(),
                            data: BASE64.encode(&image.png),
                        },
                    },
                ],
            }],
        };

        debug!("POST {} ({} image bytes)", self.endpoint(), image.png.len());
        let request = self.build_request(api_key, &body)?;
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VisionError::Timeout(self.config.timeout_secs)
                } else {
                    VisionError::Http(format!("Request failed: {}", e.without_url()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VisionError::Status {
                status: status.as_u16(),
                body: text.chars().take(300).collect(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidJson(format!("Failed to parse response: {}", e)))?;

        reply_text(parsed)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Concatenate the text parts of the first candidate.
fn reply_text(response: GenerateResponse) -> Result<String, VisionError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(VisionError::EmptyResponse(None));
    };

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(VisionError::EmptyResponse(candidate.finish_reason))
    } else {
        Ok(text)
    }
}

// ============================================================================
// Fake (tests)
// ============================================================================

/// Fake vision client for testing
pub struct FakeVisionClient {
    responses: Mutex<Vec<Result<String, VisionError>>>,
    call_count: Mutex<usize>,
    last_prompt: Mutex<Option<String>>,
}

impl FakeVisionClient {
    /// Create a fake client with pre-defined responses
    pub fn new(responses: Vec<Result<String, VisionError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Always reply with the same text
    pub fn always_reply(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    /// Always fail with the same error
    pub fn always_error(error: VisionError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionClient for FakeVisionClient {
    async fn generate(&self, prompt: &str, _image: &DecodedImage) -> Result<String, VisionError> {
        *self.call_count.lock().unwrap() += 1;
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => Err(VisionError::EmptyResponse(None)),
            // Keep returning the last response
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }

    fn model(&self) -> &str {
        "fake"
    }
}
