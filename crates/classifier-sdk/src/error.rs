use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failure classes surfaced by [`crate::RequestExecutor`] and the API client.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("server error: {status}")]
    ServerError { status: StatusCode, body: String },
    #[error("request rejected ({status}): {detail}")]
    ClientError {
        status: StatusCode,
        detail: ErrorDetail,
    },
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<ApiError> },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Transient failures the executor resolves internally by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_) | ApiError::NetworkUnreachable(_) | ApiError::ServerError { .. }
        )
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::MalformedResponse(err.to_string())
        } else {
            ApiError::NetworkUnreachable(err.to_string())
        }
    }

    /// The status code carried by the error, looking through exhausted retries.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::ServerError { status, .. } | ApiError::ClientError { status, .. } => {
                Some(*status)
            }
            ApiError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    pub fn user_message(&self) -> UserMessage {
        match self {
            ApiError::Timeout(_) => UserMessage::new(
                MessageKind::TryAgain,
                "The server took too long to answer. Please try again.",
            ),
            ApiError::NetworkUnreachable(_) => UserMessage::new(
                MessageKind::CheckConnection,
                "Could not reach the classifier service. Check your connection.",
            ),
            ApiError::ServerError { status, .. } => UserMessage::new(
                MessageKind::TryAgain,
                format!("The classifier service failed ({status}). Please try again."),
            ),
            ApiError::ClientError { detail, .. } => {
                let mut text = format!("Invalid input: {}", detail.message);
                if let Some(suggestion) = &detail.suggestion {
                    text.push_str(". ");
                    text.push_str(suggestion);
                }
                UserMessage::new(MessageKind::InvalidInput, text)
            }
            ApiError::RetriesExhausted { last, .. } => match last.as_ref() {
                ApiError::Timeout(_) | ApiError::NetworkUnreachable(_) => UserMessage::new(
                    MessageKind::CheckConnection,
                    "The classifier service is unreachable. Check your connection and try again.",
                ),
                _ => UserMessage::new(
                    MessageKind::TryAgain,
                    "The classifier service is not responding. Please try again later.",
                ),
            },
            ApiError::MalformedResponse(_) => UserMessage::new(
                MessageKind::TryAgain,
                "The classifier service sent an unexpected answer. Please try again.",
            ),
        }
    }
}

/// Human readable explanation carried by a 4xx response.
///
/// The backend answers either `{"detail": "..."}`, `{"detail": {"error": ..,
/// "suggestion": ..}}` or a plain text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Deserialize)]
struct RawErrorBody {
    detail: RawDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDetail {
    Text(String),
    Structured {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        suggestion: Option<String>,
    },
    Other(serde_json::Value),
}

impl ErrorDetail {
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim();
        match serde_json::from_str::<RawErrorBody>(trimmed) {
            Ok(RawErrorBody {
                detail: RawDetail::Text(message),
            }) => Self {
                message,
                suggestion: None,
            },
            Ok(RawErrorBody {
                detail: RawDetail::Structured { error, suggestion },
            }) => Self {
                message: error.unwrap_or_else(|| "request rejected".to_string()),
                suggestion,
            },
            Ok(RawErrorBody {
                detail: RawDetail::Other(value),
            }) => Self {
                message: value.to_string(),
                suggestion: None,
            },
            Err(_) if trimmed.is_empty() => Self {
                message: "request rejected".to_string(),
                suggestion: None,
            },
            Err(_) => Self {
                message: trimmed.to_string(),
                suggestion: None,
            },
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

/// Which remedy the user is pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    TryAgain,
    CheckConnection,
    InvalidInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl UserMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
