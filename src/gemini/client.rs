use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use tracing::debug;

use super::error::GeminiError;
use super::types::{GenerateContentRequest, GenerateContentResponse};
use super::{SpeechAudio, SpeechSynthesizer};
use crate::config::BatchConfig;

pub const API_URL: &str = "https://generativelanguage.googleapis.com";

/// Descriptor used when the response names no MIME type.
const FALLBACK_MIME_TYPE: &str = "audio/wav";

pub struct GeminiClient {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
    voice: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn from_config(config: &BatchConfig) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            api_key: config.api_key.clone(),
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    pub async fn generate(
        &self,
        req: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "rate limited".to_string());
            return Err(GeminiError::RateLimited { message });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(GeminiError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GeminiError::InvalidResponse(e.to_string()))?;
        Ok(body)
    }
}

/// Concatenate every audio part; the last part's MIME type wins.
fn collect_audio(response: &GenerateContentResponse) -> Result<SpeechAudio, GeminiError> {
    let mut audio = SpeechAudio {
        data: Vec::new(),
        mime_type: FALLBACK_MIME_TYPE.to_string(),
    };
    for part in response.audio_parts() {
        let bytes = STANDARD
            .decode(&part.data)
            .map_err(|e| GeminiError::InvalidResponse(format!("bad base64 audio: {e}")))?;
        audio.data.extend_from_slice(&bytes);
        if !part.mime_type.is_empty() {
            audio.mime_type = part.mime_type.clone();
        }
    }
    Ok(audio)
}

impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, GeminiError> {
        let req = GenerateContentRequest::speech(text, &self.voice, self.temperature);
        let response = self.generate(&req).await?;
        let audio = collect_audio(&response)?;
        debug!(
            model = %self.model,
            bytes = audio.data.len(),
            mime_type = %audio.mime_type,
            "speech generated"
        );
        Ok(audio)
    }
}
