use serde_json::Value;

use crate::{error::MediaError, transport::TransportResponse};

/// Decodes a response body as JSON. A non-JSON body on an error status is
/// reported as an API error carrying the raw body.
pub(crate) fn decode_json(response: &TransportResponse) -> Result<Value, MediaError> {
    serde_json::from_slice(&response.body).map_err(|err| {
        if response.is_success() {
            MediaError::MalformedResponse(format!("response is not valid JSON: {}", err))
        } else {
            MediaError::Api {
                status: response.status,
                message: response.text(),
            }
        }
    })
}

/// Builds the error for a response that lacks the expected payload. Error
/// statuses surface the provider's `error.message`; anything else falls back
/// to `otherwise`.
pub(crate) fn missing_payload(
    response: &TransportResponse,
    body: &Value,
    otherwise: MediaError,
) -> MediaError {
    if response.is_success() {
        return otherwise;
    }

    let message = body
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| response.text());

    MediaError::Api {
        status: response.status,
        message,
    }
}
