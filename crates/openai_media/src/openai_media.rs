//! Image description and audio transcription against OpenAI-compatible
//! endpoints, with one usage report per call.

mod audio;
#[cfg(test)]
mod capture_log;
mod config;
mod error;
mod image;
mod response;
mod transport;

use std::sync::Arc;

use anyhow::Result;
use usage_reporter::{LogUsageReporter, UsageReporter};

pub use crate::{
    audio::{AUDIO_FALLBACK, AudioFile, AudioTranscriber},
    config::{DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL, DEFAULT_MAX_TOKENS, OpenAiConfig},
    error::{MediaError, MediaErrorKind, TransportError},
    image::{IMAGE_FALLBACK, ImageDescriber, ImageInput},
    transport::{
        DEFAULT_TIMEOUT, FilePart, HttpTransport, MultipartForm, ReqwestTransport, RequestBody,
        TransportRequest, TransportResponse,
    },
};

/// Both operations wired to one transport, one reporter and one API key.
pub struct OpenAiMedia {
    api_key: String,
    images: ImageDescriber,
    audio: AudioTranscriber,
}

impl OpenAiMedia {
    pub fn new(
        config: &OpenAiConfig,
        transport: Arc<dyn HttpTransport>,
        reporter: Arc<dyn UsageReporter>,
    ) -> Self {
        Self {
            api_key: config.api_key.clone(),
            images: ImageDescriber::from_config(transport.clone(), reporter.clone(), config),
            audio: AudioTranscriber::from_config(transport, reporter, config),
        }
    }

    /// Production wiring: reqwest with the configured timeout, usage lines
    /// written through `log`.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.timeout)?);
        Ok(Self::new(config, transport, Arc::new(LogUsageReporter)))
    }

    pub async fn describe_image(&self, image: &ImageInput) -> Result<String, MediaError> {
        self.images.describe(image, &self.api_key).await
    }

    pub async fn transcribe_audio(&self, audio: &AudioFile) -> Result<String, MediaError> {
        self.audio.transcribe(audio, &self.api_key).await
    }
}
