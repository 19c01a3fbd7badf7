use thiserror::Error;

/// Failure raised by an [`HttpTransport`](crate::HttpTransport) before any
/// response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Transport error: {0}")]
    Transport(#[source] TransportError),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unexpected API response structure: {0}")]
    UnexpectedShape(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    Transport,
    MalformedResponse,
    UnexpectedShape,
    Api,
    InvalidRequest,
}

impl MediaError {
    pub fn kind(&self) -> MediaErrorKind {
        match self {
            MediaError::Transport(_) => MediaErrorKind::Transport,
            MediaError::MalformedResponse(_) => MediaErrorKind::MalformedResponse,
            MediaError::UnexpectedShape(_) => MediaErrorKind::UnexpectedShape,
            MediaError::Api { .. } => MediaErrorKind::Api,
            MediaError::InvalidRequest(_) => MediaErrorKind::InvalidRequest,
        }
    }
}

impl From<TransportError> for MediaError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidRequest(detail) => MediaError::InvalidRequest(detail),
            err => MediaError::Transport(err),
        }
    }
}
