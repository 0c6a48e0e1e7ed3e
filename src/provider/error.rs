//! Categorized completion failures.
use super::ProviderKind;
use crate::util::truncate_string;
use serde::Serialize;
use thiserror::Error;

const BODY_PREVIEW_BYTES: usize = 300;

/// Category reported to the caller for every failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Auth,
    Permission,
    RateLimit,
    MalformedRequest,
    Overload,
    Unknown,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::Permission => write!(f, "permission"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::MalformedRequest => write!(f, "malformed_request"),
            Self::Overload => write!(f, "overload"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("{provider}: authentication rejected: {message}")]
    Authentication {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: permission denied: {message}")]
    PermissionDenied {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: rate limited: {message}")]
    RateLimited {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: malformed request: {message}")]
    MalformedRequest {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: overloaded: {message}")]
    Overloaded {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: {message}")]
    Other {
        provider: ProviderKind,
        message: String,
    },
}

impl CompletionError {
    pub fn new(code: ErrorCode, provider: ProviderKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            ErrorCode::Auth => Self::Authentication { provider, message },
            ErrorCode::Permission => Self::PermissionDenied { provider, message },
            ErrorCode::RateLimit => Self::RateLimited { provider, message },
            ErrorCode::MalformedRequest => Self::MalformedRequest { provider, message },
            ErrorCode::Overload => Self::Overloaded { provider, message },
            ErrorCode::Unknown => Self::Other { provider, message },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { .. } => ErrorCode::Auth,
            Self::PermissionDenied { .. } => ErrorCode::Permission,
            Self::RateLimited { .. } => ErrorCode::RateLimit,
            Self::MalformedRequest { .. } => ErrorCode::MalformedRequest,
            Self::Overloaded { .. } => ErrorCode::Overload,
            Self::Other { .. } => ErrorCode::Unknown,
        }
    }

    /// Only overload clears up on its own; everything else needs the caller.
    pub fn is_retryable(&self) -> bool {
        self.code() == ErrorCode::Overload
    }
}

/// Map a non-success HTTP status and body to a category.
pub fn classify_status(status: u16, body: &str) -> ErrorCode {
    match status {
        401 => ErrorCode::Auth,
        403 => ErrorCode::Permission,
        _ if body.to_ascii_lowercase().contains("overloaded") => ErrorCode::Overload,
        429 => ErrorCode::RateLimit,
        400 | 404 | 413 | 422 => ErrorCode::MalformedRequest,
        500 | 502 | 503 | 504 | 529 => ErrorCode::Overload,
        _ => ErrorCode::Unknown,
    }
}

pub fn parse_http_error(provider: ProviderKind, status: u16, body: &str) -> CompletionError {
    let code = classify_status(status, body);
    let preview = truncate_string(body.trim(), BODY_PREVIEW_BYTES);
    CompletionError::new(code, provider, format!("HTTP {status}: {preview}"))
}
