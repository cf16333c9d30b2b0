use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use std::sync::Arc;

use crate::auth::{AuthError, TokenSource};
use crate::backoff::Retryable;
use crate::config::Config;

const USER_AGENT: &str = "image-classifier-api/1.0";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("429 rate limited by model service: {0}")]
    RateLimited(String),
    #[error("model service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model returned no candidates")]
    EmptyResponse,
    #[error("model response has no text parts (finish reason: {finish_reason})")]
    Blocked { finish_reason: String },
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl Retryable for ModelError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, ModelError::RateLimited(_))
    }
}

// ── Model abstraction ────────────────────────────────────────────────────────

/// Image bytes and MIME type handed to the model.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A multimodal model that answers a text prompt about one image.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn generate(&self, prompt: &str, image: &ImagePart) -> Result<String, ModelError>;
}

// ── Vertex AI wire format ────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// ── Vertex AI client ─────────────────────────────────────────────────────────

pub struct VertexClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenSource>,
}

impl VertexClient {
    pub fn new(config: &Config, tokens: Arc<dyn TokenSource>) -> Result<Self, ModelError> {
        let http = reqwest::ClientBuilder::new()
            .connect_timeout(std::time::Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            endpoint: config.generate_content_url(),
            tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ImageClassifier for VertexClient {
    async fn generate(&self, prompt: &str, image: &ImagePart) -> Result<String, ModelError> {
        let body = build_request(prompt, image);

        let token = self.tokens.token().await?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(ModelError::RateLimited(message));
            }
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        response_text(payload)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn build_request<'a>(prompt: &'a str, image: &'a ImagePart) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::Text { text: prompt },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: &image.mime_type,
                        data: base64::engine::general_purpose::STANDARD.encode(&image.data),
                    },
                },
            ],
        }],
    }
}

/// Concatenated text parts of the first candidate.
///
/// A candidate without any text part (safety or recitation blocks) is an error.
fn response_text(payload: GenerateContentResponse) -> Result<String, ModelError> {
    let candidate = payload
        .candidates
        .into_iter()
        .next()
        .ok_or(ModelError::EmptyResponse)?;

    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if texts.is_empty() {
        return Err(ModelError::Blocked {
            finish_reason: candidate
                .finish_reason
                .unwrap_or_else(|| "UNSPECIFIED".to_string()),
        });
    }
    Ok(texts.concat())
}

/// Prefer Google's `{"error": {"message": ...}}` envelope, fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
