//! Provider contract (C3): the per-platform send primitive and the
//! closed failure taxonomy every provider must classify its errors into.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A closed set of abstract failure reasons. Retryability and operator
/// triage both derive from this, never from provider-specific error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    Unknown,
    NetworkError,
    ServiceUnavailable,
    RateLimited,
    InvalidToken,
    InvalidPayload,
    Unauthorized,
    PlatformNotSupported,
}

impl FailureCategory {
    /// Whether a failure in this category is worth retrying.
    pub fn retryable(self) -> bool {
        match self {
            FailureCategory::NetworkError
            | FailureCategory::ServiceUnavailable
            | FailureCategory::RateLimited
            | FailureCategory::Unknown => true,
            FailureCategory::InvalidToken
            | FailureCategory::InvalidPayload
            | FailureCategory::Unauthorized
            | FailureCategory::PlatformNotSupported => false,
        }
    }

    /// Textual name persisted in `last_error_category`.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureCategory::Unknown => "Unknown",
            FailureCategory::NetworkError => "NetworkError",
            FailureCategory::ServiceUnavailable => "ServiceUnavailable",
            FailureCategory::RateLimited => "RateLimited",
            FailureCategory::InvalidToken => "InvalidToken",
            FailureCategory::InvalidPayload => "InvalidPayload",
            FailureCategory::Unauthorized => "Unauthorized",
            FailureCategory::PlatformNotSupported => "PlatformNotSupported",
        }
    }

    /// Map a backend HTTP status code per the mapping table both real
    /// providers share.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => FailureCategory::InvalidPayload,
            401 => FailureCategory::Unauthorized,
            404 => FailureCategory::InvalidToken,
            429 => FailureCategory::RateLimited,
            500 | 503 => FailureCategory::ServiceUnavailable,
            _ => FailureCategory::Unknown,
        }
    }
}

/// Everything a provider needs to deliver one notification.
#[derive(Debug, Clone)]
pub struct SendRequest<'a> {
    pub device_token: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub data: &'a HashMap<String, String>,
}

/// A classified, non-panicking outcome of a send attempt.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    Ok,
    Fail {
        message: String,
        code: Option<u16>,
        category: FailureCategory,
    },
}

impl SendOutcome {
    pub fn fail(message: impl Into<String>, category: FailureCategory) -> Self {
        SendOutcome::Fail {
            message: message.into(),
            code: None,
            category,
        }
    }

    pub fn fail_with_code(message: impl Into<String>, code: u16, category: FailureCategory) -> Self {
        SendOutcome::Fail {
            message: message.into(),
            code: Some(code),
            category,
        }
    }

    /// Whether the dispatcher should schedule a retry for this outcome.
    pub fn retryable(&self) -> bool {
        match self {
            SendOutcome::Ok => false,
            SendOutcome::Fail { category, .. } => category.retryable(),
        }
    }
}

/// Per-platform send primitive. Implementations own ALL network I/O,
/// authentication, and serialization into the backend's native payload.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable name, used only for logging.
    fn name(&self) -> &str;

    async fn send(&self, request: SendRequest<'_>, cancel: &CancellationToken) -> SendOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_categories_match_spec_table() {
        for c in [
            FailureCategory::NetworkError,
            FailureCategory::ServiceUnavailable,
            FailureCategory::RateLimited,
            FailureCategory::Unknown,
        ] {
            assert!(c.retryable(), "{c:?} should be retryable");
        }
        for c in [
            FailureCategory::InvalidToken,
            FailureCategory::InvalidPayload,
            FailureCategory::Unauthorized,
            FailureCategory::PlatformNotSupported,
        ] {
            assert!(!c.retryable(), "{c:?} should not be retryable");
        }
    }

    #[test]
    fn status_code_mapping_matches_spec() {
        assert_eq!(FailureCategory::from_status(400), FailureCategory::InvalidPayload);
        assert_eq!(FailureCategory::from_status(401), FailureCategory::Unauthorized);
        assert_eq!(FailureCategory::from_status(404), FailureCategory::InvalidToken);
        assert_eq!(FailureCategory::from_status(429), FailureCategory::RateLimited);
        assert_eq!(FailureCategory::from_status(500), FailureCategory::ServiceUnavailable);
        assert_eq!(FailureCategory::from_status(503), FailureCategory::ServiceUnavailable);
        assert_eq!(FailureCategory::from_status(418), FailureCategory::Unknown);
    }
}
