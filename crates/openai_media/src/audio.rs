use std::{path::Path, sync::Arc};

use bytes::Bytes;
use serde_json::Value;
use usage_reporter::{ApiType, UsageEvent, UsageReporter};

use crate::{
    config::{DEFAULT_API_BASE, OpenAiConfig},
    error::MediaError,
    response::{decode_json, missing_payload},
    transport::{
        FilePart, HttpTransport, MultipartForm, RequestBody, TransportRequest, TransportResponse,
    },
};

pub const AUDIO_FALLBACK: &str = "Error processing audio.";

const TRANSCRIPTION_MODEL: &str = "whisper-1";
const AUDIO_MIME: &str = "audio/wav";

/// A named audio clip. Cloning shares the underlying buffer.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub name: String,
    pub bytes: Bytes,
}

impl AudioFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        Ok(Self {
            name,
            bytes: bytes.into(),
        })
    }
}

pub struct AudioTranscriber {
    transport: Arc<dyn HttpTransport>,
    reporter: Arc<dyn UsageReporter>,
    endpoint: String,
}

impl AudioTranscriber {
    pub fn new(transport: Arc<dyn HttpTransport>, reporter: Arc<dyn UsageReporter>) -> Self {
        Self {
            transport,
            reporter,
            endpoint: format!("{}/audio/transcriptions", DEFAULT_API_BASE),
        }
    }

    pub fn from_config(
        transport: Arc<dyn HttpTransport>,
        reporter: Arc<dyn UsageReporter>,
        config: &OpenAiConfig,
    ) -> Self {
        Self::new(transport, reporter).with_endpoint(config.audio_endpoint.clone())
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn form(&self, audio: &AudioFile) -> MultipartForm {
        MultipartForm::new()
            .text("model", TRANSCRIPTION_MODEL)
            .file(FilePart {
                field: "file".into(),
                file_name: audio.name.clone(),
                mime: AUDIO_MIME.into(),
                bytes: audio.bytes.clone(),
            })
    }

    /// Transcribes `audio`. The endpoint reports no token usage, so the usage
    /// event always carries 0 tokens.
    pub async fn transcribe(&self, audio: &AudioFile, api_key: &str) -> Result<String, MediaError> {
        match self.send(audio, api_key).await {
            Ok(text) => {
                self.reporter
                    .report(UsageEvent::success(ApiType::AudioProcessing, 0));
                Ok(text)
            }
            Err(err) => {
                self.reporter
                    .report(UsageEvent::failure(ApiType::AudioProcessing));
                log::error!("Failed to process audio with OpenAI: {}", err);
                Err(err)
            }
        }
    }

    /// Like [`transcribe`](Self::transcribe), but any failure becomes
    /// [`AUDIO_FALLBACK`].
    pub async fn transcribe_or_fallback(&self, audio: &AudioFile, api_key: &str) -> String {
        self.transcribe(audio, api_key)
            .await
            .unwrap_or_else(|_| AUDIO_FALLBACK.to_string())
    }

    async fn send(&self, audio: &AudioFile, api_key: &str) -> Result<String, MediaError> {
        log::debug!(
            "Transcribing audio file: {} ({} bytes)",
            audio.name,
            audio.bytes.len()
        );

        let response = self
            .transport
            .post(TransportRequest {
                url: self.endpoint.clone(),
                bearer_token: api_key.to_string(),
                body: RequestBody::Multipart(self.form(audio)),
            })
            .await?;

        parse_transcription(&response)
    }
}

fn parse_transcription(response: &TransportResponse) -> Result<String, MediaError> {
    let body = decode_json(response)?;

    match body.get("text").and_then(Value::as_str) {
        Some(text) => Ok(text.to_string()),
        None => Err(missing_payload(
            response,
            &body,
            MediaError::MalformedResponse("missing `text`".into()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use log::Level;
    use serde_json::json;
    use tempfile::NamedTempFile;
    use usage_reporter::{LogUsageReporter, MemoryUsageReporter};

    use super::*;
    use crate::{capture_log, error::MediaErrorKind, transport::mock::ScriptedTransport};

    fn transcriber(
        transport: Arc<ScriptedTransport>,
    ) -> (AudioTranscriber, Arc<MemoryUsageReporter>) {
        let reporter = Arc::new(MemoryUsageReporter::new());
        (AudioTranscriber::new(transport, reporter.clone()), reporter)
    }

    fn clip() -> AudioFile {
        AudioFile::new("clip.wav", b"RIFF....WAVE".to_vec())
    }

    #[test]
    fn form_carries_model_and_wav_file() {
        let (transcriber, _) = transcriber(Arc::new(ScriptedTransport::json(json!({}))));

        let form = transcriber.form(&clip());

        assert_eq!(form.field("model"), Some("whisper-1"));
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].field, "file");
        assert_eq!(form.files[0].file_name, "clip.wav");
        assert_eq!(form.files[0].mime, "audio/wav");
        assert_eq!(&form.files[0].bytes[..], b"RIFF....WAVE");
    }

    #[test]
    fn form_does_not_copy_the_clip() {
        let (transcriber, _) = transcriber(Arc::new(ScriptedTransport::json(json!({}))));
        let audio = AudioFile::new("long.wav", vec![0u8; 1 << 20]);

        let form = transcriber.form(&audio);

        assert_eq!(form.files[0].bytes.as_ptr(), audio.bytes.as_ptr());
        assert_eq!(form.files[0].bytes.len(), 1 << 20);
    }

    #[tokio::test]
    async fn returns_text_and_reports_zero_tokens() {
        let transport = Arc::new(ScriptedTransport::json(json!({"text": "hello world"})));
        let (transcriber, reporter) = transcriber(transport.clone());

        let result = transcriber.transcribe(&clip(), "sk-test").await.unwrap();

        assert_eq!(result, "hello world");
        assert_eq!(
            reporter.lines(),
            vec!["USAGE_LOG | type=audio_processing | tokens=0 | success=True"]
        );

        let request = transport.last_request();
        assert_eq!(request.url, "https://api.openai.com/v1/audio/transcriptions");
        assert_eq!(request.bearer_token, "sk-test");
        assert!(matches!(request.body, RequestBody::Multipart(_)));
    }

    #[tokio::test]
    async fn missing_text_is_malformed() {
        let transport = Arc::new(ScriptedTransport::json(json!({"segments": []})));
        let (transcriber, reporter) = transcriber(transport);

        let err = transcriber.transcribe(&clip(), "sk-test").await.unwrap_err();

        assert_eq!(err.kind(), MediaErrorKind::MalformedResponse);
        assert_eq!(
            reporter.events(),
            vec![UsageEvent::failure(ApiType::AudioProcessing)]
        );
    }

    #[tokio::test]
    async fn failure_logs_error_detail() {
        let logs = capture_log::install();
        let transport = Arc::new(ScriptedTransport::json(json!({"language": "en"})));
        let transcriber = AudioTranscriber::new(transport, Arc::new(LogUsageReporter));

        transcriber.transcribe(&clip(), "sk-test").await.unwrap_err();

        assert!(logs.contains(
            Level::Error,
            "openai_media::audio",
            "Failed to process audio with OpenAI: Malformed response: missing `text`"
        ));
        assert!(logs.contains(
            Level::Info,
            "usage",
            "USAGE_LOG | type=audio_processing | tokens=0 | success=False"
        ));
    }

    #[tokio::test]
    async fn unauthorized_status_is_api_error() {
        let transport = Arc::new(ScriptedTransport::status(
            401,
            json!({"error": {"message": "Invalid API key"}}),
        ));
        let (transcriber, reporter) = transcriber(transport);

        let err = transcriber.transcribe(&clip(), "sk-bad").await.unwrap_err();

        assert_eq!(err.kind(), MediaErrorKind::Api);
        assert!(err.to_string().contains("Invalid API key"));
        assert_eq!(reporter.events().len(), 1);
    }

    #[tokio::test]
    async fn fallback_collapses_failures_to_sentinel() {
        let transport = Arc::new(ScriptedTransport::failing());
        let (transcriber, reporter) = transcriber(transport);

        let result = transcriber.transcribe_or_fallback(&clip(), "sk-test").await;

        assert_eq!(result, AUDIO_FALLBACK);
        assert_eq!(
            reporter.lines(),
            vec!["USAGE_LOG | type=audio_processing | tokens=0 | success=False"]
        );
    }

    #[tokio::test]
    async fn reads_clip_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"RIFF").unwrap();

        let audio = AudioFile::from_path(file.path()).await.unwrap();

        assert_eq!(&audio.bytes[..], b"RIFF");
        assert_eq!(
            audio.name,
            file.path().file_name().unwrap().to_str().unwrap()
        );
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = AudioFile::from_path("/nonexistent/clip_12345.wav").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn config_sets_endpoint() {
        let transport = Arc::new(ScriptedTransport::json(json!({"text": "ok"})));
        let config = OpenAiConfig::new("sk-config").with_api_base("http://localhost:9000/v1");

        let transcriber = AudioTranscriber::from_config(
            transport.clone(),
            Arc::new(MemoryUsageReporter::new()),
            &config,
        );
        transcriber.transcribe(&clip(), &config.api_key).await.unwrap();

        assert_eq!(
            transport.last_request().url,
            "http://localhost:9000/v1/audio/transcriptions"
        );
    }
}
