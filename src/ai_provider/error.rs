use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Unconfigured,
    InvalidRequest,
    Authentication,
    Authorization,
    RateLimited,
    Timeout,
    BackendTransient,
    EmptyResponse,
    MalformedResponse,
    SchemaMismatch,
    Internal,
}

impl ProviderErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderErrorKind::Unconfigured => "unconfigured",
            ProviderErrorKind::InvalidRequest => "invalid_request",
            ProviderErrorKind::Authentication => "authentication",
            ProviderErrorKind::Authorization => "authorization",
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::BackendTransient => "backend_transient",
            ProviderErrorKind::EmptyResponse => "empty_response",
            ProviderErrorKind::MalformedResponse => "malformed_response",
            ProviderErrorKind::SchemaMismatch => "schema_mismatch",
            ProviderErrorKind::Internal => "internal",
        }
    }
}

/// Failure of a single structured provider call. Callers recover from every
/// kind by falling back, so this never reaches an HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub provider_id: Option<String>,
    pub provider_http_status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_id: None,
            provider_http_status: None,
        }
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    pub fn with_provider_http_status(mut self, status: u16) -> Self {
        self.provider_http_status = Some(status);
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.provider_id, self.provider_http_status) {
            (Some(provider_id), Some(status)) => write!(
                f,
                "{} (provider={}, http_status={})",
                self.message, provider_id, status
            ),
            (Some(provider_id), None) => write!(f, "{} (provider={})", self.message, provider_id),
            (None, Some(status)) => write!(f, "{} (http_status={})", self.message, status),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

pub fn unconfigured(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::Unconfigured, message)
}

pub fn invalid_request(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::InvalidRequest, message)
}

pub fn malformed_response(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::MalformedResponse, message)
}

pub fn schema_mismatch(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::SchemaMismatch, message)
}

pub fn internal_error(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::Internal, message)
}
