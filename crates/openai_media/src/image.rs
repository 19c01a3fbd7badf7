use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use usage_reporter::{ApiType, UsageEvent, UsageReporter};

use crate::{
    config::{DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL, DEFAULT_MAX_TOKENS, OpenAiConfig},
    error::MediaError,
    response::{decode_json, missing_payload},
    transport::{HttpTransport, RequestBody, TransportRequest, TransportResponse},
};

pub const IMAGE_FALLBACK: &str = "Error processing image.";

const DESCRIBE_PROMPT: &str = "First, provide a title for the image, then explain everything that \
    you see. Be very thorough in your analysis as a user will need to understand the image \
    without seeing it. If it is possible to transcribe the image to text directly, then do so. \
    The more detail you provide, the better the user will understand the image.";

/// Image payload for [`ImageDescriber::describe`].
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Binary image data, base64-encoded before sending.
    Raw(Vec<u8>),
    /// Base64 text, embedded as-is.
    Base64(String),
}

impl ImageInput {
    pub fn to_base64(&self) -> String {
        match self {
            ImageInput::Raw(bytes) => STANDARD.encode(bytes),
            ImageInput::Base64(text) => text.clone(),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.to_base64())
    }
}

pub struct ImageDescriber {
    transport: Arc<dyn HttpTransport>,
    reporter: Arc<dyn UsageReporter>,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl ImageDescriber {
    pub fn new(transport: Arc<dyn HttpTransport>, reporter: Arc<dyn UsageReporter>) -> Self {
        Self {
            transport,
            reporter,
            endpoint: format!("{}/chat/completions", DEFAULT_API_BASE),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn from_config(
        transport: Arc<dyn HttpTransport>,
        reporter: Arc<dyn UsageReporter>,
        config: &OpenAiConfig,
    ) -> Self {
        Self::new(transport, reporter)
            .with_endpoint(config.image_endpoint.clone())
            .with_model(config.image_model.clone())
            .with_max_tokens(config.max_tokens)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn request_body(&self, image: &ImageInput) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": DESCRIBE_PROMPT},
                        {"type": "image_url", "image_url": {"url": image.data_url()}}
                    ]
                }
            ],
            "max_tokens": self.max_tokens
        })
    }

    /// Asks the model to title and describe `image`. Exactly one usage event
    /// is reported per call.
    pub async fn describe(&self, image: &ImageInput, api_key: &str) -> Result<String, MediaError> {
        match self.send(image, api_key).await {
            Ok((content, tokens)) => {
                self.reporter
                    .report(UsageEvent::success(ApiType::ImageProcessing, tokens));
                Ok(content)
            }
            Err(err) => {
                self.reporter
                    .report(UsageEvent::failure(ApiType::ImageProcessing));
                log::error!("Failed to process frame with OpenAI: {}", err);
                Err(err)
            }
        }
    }

    /// Like [`describe`](Self::describe), but any failure becomes
    /// [`IMAGE_FALLBACK`].
    pub async fn describe_or_fallback(&self, image: &ImageInput, api_key: &str) -> String {
        self.describe(image, api_key)
            .await
            .unwrap_or_else(|_| IMAGE_FALLBACK.to_string())
    }

    async fn send(&self, image: &ImageInput, api_key: &str) -> Result<(String, u64), MediaError> {
        let response = self
            .transport
            .post(TransportRequest {
                url: self.endpoint.clone(),
                bearer_token: api_key.to_string(),
                body: RequestBody::Json(self.request_body(image)),
            })
            .await?;

        parse_completion(&response)
    }
}

fn parse_completion(response: &TransportResponse) -> Result<(String, u64), MediaError> {
    let body = decode_json(response)?;

    let has_choices = body
        .get("choices")
        .and_then(Value::as_array)
        .is_some_and(|choices| !choices.is_empty());

    if !has_choices {
        return Err(missing_payload(
            response,
            &body,
            MediaError::UnexpectedShape("`choices` is missing or empty".into()),
        ));
    }

    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| {
            MediaError::MalformedResponse("missing `choices[0].message.content`".into())
        })?
        .to_string();

    let tokens = body
        .get("usage")
        .and_then(|usage| usage.get("total_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    Ok((content, tokens))
}
