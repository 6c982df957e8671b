//! Narration synthesis: page script → MP3 bytes via a speech API.
//!
//! The pipeline only depends on the [`SpeechSynthesizer`] trait. The shipped
//! implementation, [`OpenAiSpeech`], talks to the OpenAI `/v1/audio/speech`
//! endpoint (or any compatible server set through
//! [`crate::config::VideoConfig::tts_endpoint`]); tests and library users can
//! inject their own through [`crate::config::VideoConfigBuilder::synthesizer`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 and 5xx responses are transient. [`narrate_page`] retries them
//! with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`); 4xx errors
//! such as a bad API key fail immediately.

use crate::config::VideoConfig;
use crate::prompts::narration_instructions;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Failure of a single synthesis request.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The endpoint answered with a non-success status.
    #[error("speech API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never got a response.
    #[error("speech request failed: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("speech request timed out after {0}s")]
    Timeout(u64),

    /// The endpoint answered 200 with no audio.
    #[error("speech API returned an empty body")]
    EmptyAudio,

    /// Writing the audio file failed.
    #[error("failed to write narration audio: {0}")]
    Io(#[from] std::io::Error),
}

impl SpeechError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SpeechError::Http { status, .. } => *status == 429 || *status >= 500,
            SpeechError::Network(_) | SpeechError::Timeout(_) | SpeechError::EmptyAudio => true,
            SpeechError::Io(_) => false,
        }
    }
}

/// Something that turns text into MP3 audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return the encoded MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError>;
}

/// JSON body of an OpenAI speech request.
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    response_format: &'static str,
}

/// OpenAI-compatible speech client.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    voice: String,
    instructions: Option<String>,
    timeout_secs: u64,
}

impl OpenAiSpeech {
    /// Build a client from the conversion config and an already-resolved key.
    pub fn from_config(config: &VideoConfig, api_key: String) -> Result<Self, SpeechError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| SpeechError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.tts_endpoint.clone(),
            api_key,
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            instructions: narration_instructions(config.tts_instructions.as_deref())
                .map(str::to_string),
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn request_body<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.model,
            voice: &self.voice,
            input: text,
            instructions: self.instructions.as_deref(),
            response_format: "mp3",
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SpeechError::Timeout(self.timeout_secs)
                } else {
                    SpeechError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Http {
                status: status.as_u16(),
                body: truncate(&body, 300),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(bytes.to_vec())
    }
}

/// Synthesize narration for one page and write it to `audio_path`.
///
/// Retries transient failures; returns the last error once retries are
/// exhausted or a permanent error is hit. The caller decides what a failure
/// means (the pipeline turns it into a silent page).
pub async fn narrate_page(
    synthesizer: &Arc<dyn SpeechSynthesizer>,
    page_num: usize,
    text: &str,
    audio_path: &Path,
    config: &VideoConfig,
) -> Result<(), SpeechError> {
    let mut attempt = 0u32;
    loop {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Page {}: narration retry {}/{} after {}ms",
                page_num, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match synthesizer.synthesize(text).await {
            Ok(audio) => {
                tokio::fs::write(audio_path, &audio).await?;
                debug!(
                    "Page {}: narration written to {} ({} bytes)",
                    page_num,
                    audio_path.display(),
                    audio.len()
                );
                return Ok(());
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
