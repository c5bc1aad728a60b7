//! Google Gemini service (Generative Language API, `v1beta`).
//!
//! - POST {endpoint}/v1beta/models/{model}:generateContent
//! - POST {endpoint}/v1beta/models/{model}:embedContent
//!
//! Authentication uses the `x-goog-api-key` header. Quota exhaustion arrives as
//! HTTP 429 with `error.status = "RESOURCE_EXHAUSTED"` and is classified in
//! [`crate::services::ensure_success`].

use std::time::Instant;

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind},
    services::{decode_error, ensure_success, timeout_of, validate_config},
};

/// Thin client for Gemini.
#[derive(Debug)]
pub struct GeminiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
    url_embed: String,
    model_path: String,
}

impl GeminiService {
    /// Creates a new [`GeminiService`]; requires an API key.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let base = validate_config(LlmProvider::Gemini, &cfg)?;

        let api_key = cfg.api_key.clone().ok_or_else(|| {
            ProviderError::new(LlmProvider::Gemini, ProviderErrorKind::MissingApiKey)
        })?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            header::HeaderValue::from_str(&api_key).map_err(|e| {
                decode_error(LlmProvider::Gemini, format!("invalid API key header: {e}"))
            })?,
        );

        let client = reqwest::Client::builder()
            .timeout(timeout_of(&cfg))
            .default_headers(headers)
            .build()?;

        let model = cfg.model.trim_start_matches("models/");
        let model_path = format!("models/{model}");

        Ok(Self {
            client,
            url_generate: format!("{base}/v1beta/{model_path}:generateContent"),
            url_embed: format!("{base}/v1beta/{model_path}:embedContent"),
            model_path,
            cfg,
        })
    }

    /// Single-shot content generation; concatenates the text parts of the first candidate.
    #[instrument(skip_all, fields(model = %self.cfg.model, prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: system.map(|s| Content {
                role: None,
                parts: vec![Part { text: s }],
            }),
            generation_config: GenerationConfig {
                temperature: self.cfg.temperature,
                top_p: self.cfg.top_p,
                max_output_tokens: self.cfg.max_tokens,
            },
        };

        debug!("POST {}", self.url_generate);
        let resp = self.client.post(&self.url_generate).json(&body).send().await?;
        let resp = ensure_success(LlmProvider::Gemini, &self.url_generate, resp).await?;

        let out: GenerateContentResponse = resp.json().await.map_err(|e| {
            decode_error(
                LlmProvider::Gemini,
                format!("serde error: {e}; expected `candidates[0].content.parts`"),
            )
        })?;

        let text = out
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::new(LlmProvider::Gemini, ProviderErrorKind::EmptyChoices))?;

        info!(
            latency_ms = started.elapsed().as_millis(),
            "gemini generation completed"
        );
        Ok(text)
    }

    /// Embeds a single text.
    #[instrument(skip_all, fields(model = %self.cfg.model, input_len = input.len()))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let body = EmbedContentRequest {
            model: &self.model_path,
            content: Content {
                role: None,
                parts: vec![Part { text: input }],
            },
        };

        debug!("POST {}", self.url_embed);
        let resp = self.client.post(&self.url_embed).json(&body).send().await?;
        let resp = ensure_success(LlmProvider::Gemini, &self.url_embed, resp).await?;

        let out: EmbedContentResponse = resp.json().await.map_err(|e| {
            decode_error(
                LlmProvider::Gemini,
                format!("serde error: {e}; expected `embedding.values`"),
            )
        })?;

        Ok(out.embedding.values)
    }
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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
    parts: Vec<PartOut>,
}

#[derive(Debug, Deserialize)]
struct PartOut {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}
