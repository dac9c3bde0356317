//! Response envelope of the Bitmovin REST API.
//!
//! Success: `{ "status": "SUCCESS", "data": { "result": { "id", .. } } }`
//! Failure: `{ "status": "ERROR", "data": { "code", "message", "developerMessage" } }`

use crate::ports::ApiError;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Envelope {
    pub status: Option<String>,
    #[serde(default)]
    pub data: EnvelopeData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EnvelopeData {
    pub result: Option<Value>,
    pub code: Option<i64>,
    pub message: Option<String>,
    pub developer_message: Option<String>,
}

impl Envelope {
    fn is_error(&self) -> bool {
        self.status.as_deref() == Some("ERROR")
    }

    fn error_message(&self) -> String {
        let data = &self.data;
        match (&data.message, &data.developer_message) {
            (Some(message), Some(detail)) if message != detail => format!("{message} ({detail})"),
            (Some(message), _) => message.clone(),
            (None, Some(detail)) => detail.clone(),
            (None, None) => "no error message".to_string(),
        }
    }
}

/// Turn an HTTP status and body into the `result` object, or an [`ApiError`].
pub(super) fn parse_response(status: StatusCode, body: &str) -> Result<Option<Value>, ApiError> {
    let envelope = serde_json::from_str::<Envelope>(body).ok();

    if !status.is_success() {
        let message = envelope
            .as_ref()
            .map(Envelope::error_message)
            .unwrap_or_else(|| match body.trim() {
                "" => format!("HTTP {status}"),
                text => text.chars().take(200).collect(),
            });
        return Err(classify(status, envelope.and_then(|e| e.data.code), message));
    }

    match envelope {
        Some(envelope) if envelope.is_error() => Err(ApiError::Validation {
            code: envelope.data.code,
            message: envelope.error_message(),
        }),
        Some(envelope) => Ok(envelope.data.result),
        None => Err(ApiError::Resource {
            status: Some(status.as_u16()),
            message: "malformed response body".to_string(),
        }),
    }
}

/// Auth, throttling, timeouts and server faults are resource errors; any
/// other client error means the request itself is wrong.
fn classify(status: StatusCode, code: Option<i64>, message: String) -> ApiError {
    let resource = status.is_server_error()
        || matches!(
            status,
            StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::REQUEST_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS
        );

    if resource {
        ApiError::Resource {
            status: Some(status.as_u16()),
            message,
        }
    } else {
        ApiError::Validation { code, message }
    }
}

/// Pull the generated id out of a `result` object.
pub(super) fn result_id(result: Option<Value>) -> Result<String, ApiError> {
    result
        .as_ref()
        .and_then(|value| value.get("id"))
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ApiError::resource("response did not contain a resource id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_yields_result() {
        let body = r#"{"requestId":"r1","status":"SUCCESS","data":{"result":{"id":"abc"}}}"#;
        let result = parse_response(StatusCode::OK, body).unwrap();
        assert_eq!(result_id(result).unwrap(), "abc");
    }

    #[test]
    fn test_bad_request_is_validation_error() {
        let body = r#"{"requestId":"r2","status":"ERROR","data":{"code":1001,"message":"Invalid stream","developerMessage":"Stream s-9 does not exist"}}"#;
        let err = parse_response(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert_eq!(
            err,
            ApiError::Validation {
                code: Some(1001),
                message: "Invalid stream (Stream s-9 does not exist)".to_string(),
            }
        );
    }

    #[test]
    fn test_auth_and_server_faults_are_resource_errors() {
        let body = r#"{"status":"ERROR","data":{"code":2001,"message":"Unauthorized"}}"#;
        let err = parse_response(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(err.is_retryable());

        let err = parse_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(
            err,
            ApiError::Resource {
                status: Some(502),
                message: "<html>bad gateway</html>".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_error_body_keeps_http_status() {
        let err = parse_response(StatusCode::NOT_FOUND, "").unwrap_err();
        assert_eq!(
            err,
            ApiError::Validation {
                code: None,
                message: "HTTP 404 Not Found".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_id_is_resource_error() {
        let body = r#"{"status":"SUCCESS","data":{"result":{}}}"#;
        let result = parse_response(StatusCode::CREATED, body).unwrap();
        assert!(result_id(result).unwrap_err().is_retryable());
    }
}
