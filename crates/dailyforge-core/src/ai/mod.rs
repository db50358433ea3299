//! Generative AI collaborators.
//!
//! Each backend implements one narrow async trait. [`Assistant`] wraps the
//! three of them with per-call timeouts and turns every failure into
//! fallback content, so callers never see an [`AiError`].

pub mod gemini;
pub mod openrouter;
pub mod wav;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AiError;
use crate::storage::AiConfig;

pub use gemini::{GeminiImage, GeminiSpeech};
pub use openrouter::OpenRouter;

/// Chat-completion style text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, persona: &str, prompt: &str) -> Result<String, AiError>;
}

/// Prompt-to-image generation. Returns encoded image bytes.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, AiError>;
}

/// Text-to-speech. Returns a playable WAV file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub text: Duration,
    pub image: Duration,
    pub speech: Duration,
}

impl Timeouts {
    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            text: Duration::from_secs(config.text_timeout_secs),
            image: Duration::from_secs(config.image_timeout_secs),
            speech: Duration::from_secs(config.speech_timeout_secs),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_config(&AiConfig::default())
    }
}

/// Run `fut` under `limit`, mapping expiry to [`AiError::Timeout`].
async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, AiError>>,
) -> Result<T, AiError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AiError::Timeout {
            secs: limit.as_secs(),
        }),
    }
}

/// The three collaborators behind one failure-absorbing facade.
#[derive(Clone)]
pub struct Assistant {
    text: Arc<dyn TextGenerator>,
    image: Arc<dyn ImageGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    timeouts: Timeouts,
    persona: String,
    fallback: String,
}

impl Assistant {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        image: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        timeouts: Timeouts,
        persona: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            text,
            image,
            speech,
            timeouts,
            persona: persona.into(),
            fallback: fallback.into(),
        }
    }

    /// Generated text, or the fixed apology on failure or timeout.
    /// `persona` of `None` uses the default persona.
    pub async fn text(&self, persona: Option<&str>, prompt: &str) -> String {
        let persona = persona.unwrap_or(&self.persona);
        match bounded(self.timeouts.text, self.text.generate(persona, prompt)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("AI text response was empty, using fallback");
                self.fallback.clone()
            }
            Err(e) => {
                warn!(error = %e, "AI text generation failed, using fallback");
                self.fallback.clone()
            }
        }
    }

    pub async fn image(&self, prompt: &str) -> Option<Vec<u8>> {
        match bounded(self.timeouts.image, self.image.generate_image(prompt)).await {
            Ok(bytes) => {
                debug!(bytes = bytes.len(), "image generated");
                Some(bytes)
            }
            Err(e) => {
                warn!(error = %e, "image generation failed, omitting image");
                None
            }
        }
    }

    pub async fn speech(&self, text: &str) -> Option<Vec<u8>> {
        match bounded(self.timeouts.speech, self.speech.synthesize(text)).await {
            Ok(wav) => {
                debug!(bytes = wav.len(), "speech synthesized");
                Some(wav)
            }
            Err(e) => {
                warn!(error = %e, "speech synthesis failed, omitting audio");
                None
            }
        }
    }
}
