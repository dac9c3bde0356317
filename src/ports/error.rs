use thiserror::Error;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Auth, connectivity or remote-side fault. Retrying the same request may succeed.
    #[error("resource error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Resource {
        status: Option<u16>,
        message: String,
    },
    /// Malformed request or dangling reference. Will fail again until the request is fixed.
    #[error("validation error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Validation { code: Option<i64>, message: String },
}

impl ApiError {
    pub fn resource(message: impl Into<String>) -> Self {
        ApiError::Resource {
            status: None,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            code: None,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Resource { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status_and_code() {
        let err = ApiError::Resource {
            status: Some(503),
            message: "service unavailable".into(),
        };
        assert_eq!(err.to_string(), "resource error (HTTP 503): service unavailable");

        let err = ApiError::Validation {
            code: Some(1001),
            message: "stream not found".into(),
        };
        assert_eq!(err.to_string(), "validation error 1001: stream not found");
        assert!(!err.is_retryable());
        assert!(ApiError::resource("timeout").is_retryable());
    }
}
