use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    Body, Client,
    multipart::{Form, Part},
};
use serde_json::Value;

use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Multipart(MultipartForm),
}

/// A single authenticated POST.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub bearer_token: String,
    pub body: RequestBody,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }
}

fn into_form(form: MultipartForm) -> Result<Form, TransportError> {
    let mut multipart = Form::new();

    for (name, value) in form.fields {
        multipart = multipart.text(name, value);
    }

    for file in form.files {
        let len = file.bytes.len() as u64;
        let part = Part::stream_with_length(Body::from(file.bytes), len)
            .file_name(file.file_name)
            .mime_str(&file.mime)
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
        multipart = multipart.part(file.field, part);
    }

    Ok(multipart)
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let builder = self
            .client
            .post(&request.url)
            .header("Authorization", format!("Bearer {}", request.bearer_token));

        let builder = match request.body {
            RequestBody::Json(body) => builder
                .header("Content-Type", "application/json")
                .json(&body),
            RequestBody::Multipart(form) => builder.multipart(into_form(form)?),
        };

        log::debug!("POST {}", request.url);

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}
