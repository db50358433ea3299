//! Google Generative Language API: Imagen image generation and Gemini TTS.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::wav::{pcm_to_wav, sample_rate_from_mime};
use super::{ImageGenerator, SpeechSynthesizer};
use crate::error::AiError;

const IMAGE_SERVICE: &str = "imagen";
const SPEECH_SERVICE: &str = "gemini-tts";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `{base}/models/{model}:{method}`; the API key goes in a header, never the URL.
fn model_url(base_url: &str, model: &str, method: &str) -> Result<Url, AiError> {
    Ok(Url::parse(&format!(
        "{}/models/{model}:{method}",
        base_url.trim_end_matches('/')
    ))?)
}

async fn check_status(service: &'static str, resp: Response) -> Result<Response, AiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AiError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

pub struct GeminiImage {
    http_client: Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiImage {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, AiError> {
        Ok(Self {
            http_client: Client::new(),
            endpoint: model_url(base_url, model, "predict")?,
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[async_trait]
impl ImageGenerator for GeminiImage {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, AiError> {
        let body = json!({
            "instances": { "prompt": prompt },
            "parameters": { "sampleCount": 1 },
        });
        let resp = self
            .http_client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = check_status(IMAGE_SERVICE, resp).await?;

        let predict: PredictResponse = resp.json().await?;
        let encoded = predict
            .predictions
            .into_iter()
            .next()
            .and_then(|p| p.bytes_base64_encoded)
            .ok_or(AiError::MissingField {
                service: IMAGE_SERVICE,
                field: "predictions[0].bytesBase64Encoded",
            })?;
        let bytes = STANDARD.decode(encoded)?;
        debug!(bytes = bytes.len(), "image decoded");
        Ok(bytes)
    }
}

pub struct GeminiSpeech {
    http_client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    voice: String,
}

impl GeminiSpeech {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        voice: impl Into<String>,
    ) -> Result<Self, AiError> {
        Ok(Self {
            http_client: Client::new(),
            endpoint: model_url(base_url, model, "generateContent")?,
            api_key: api_key.to_string(),
            model: model.to_string(),
            voice: voice.into(),
        })
    }
}

/// `candidates[0].content.parts[0].inlineData` as `(data, mimeType)`.
fn inline_audio(resp: &Value) -> Option<(&str, &str)> {
    let inline = resp
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("inlineData")?;
    Some((
        inline.get("data")?.as_str()?,
        inline.get("mimeType")?.as_str()?,
    ))
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AiError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.voice }
                    }
                }
            },
            "model": self.model,
        });
        let resp = self
            .http_client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = check_status(SPEECH_SERVICE, resp).await?;

        let payload: Value = resp.json().await?;
        let (data, mime) = inline_audio(&payload).ok_or(AiError::MissingField {
            service: SPEECH_SERVICE,
            field: "candidates[0].content.parts[0].inlineData",
        })?;
        let pcm = STANDARD.decode(data)?;
        let rate = sample_rate_from_mime(mime);
        debug!(bytes = pcm.len(), rate, "speech PCM received");
        Ok(pcm_to_wav(&pcm, rate, 1, 16))
    }
}
