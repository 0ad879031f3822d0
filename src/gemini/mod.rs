pub mod client;
pub mod error;
pub mod types;

pub use client::GeminiClient;
pub use error::GeminiError;

/// Raw audio plus the descriptor that says how to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Turns text into audio. One call, one request.
pub trait SpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, GeminiError>;
}

impl<T: SpeechSynthesizer> SpeechSynthesizer for &T {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, GeminiError> {
        (**self).synthesize(text).await
    }
}
