use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceErrorKind {
    Unauthorized,
    NotFound,
    Validation,
    Conflict,
    PremiumRequired,
    Internal,
}

impl ServiceErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ServiceErrorKind::Unauthorized => "UNAUTHORIZED",
            ServiceErrorKind::NotFound => "NOT_FOUND",
            ServiceErrorKind::Validation => "VALIDATION",
            ServiceErrorKind::Conflict => "CONFLICT",
            ServiceErrorKind::PremiumRequired => "PREMIUM_REQUIRED",
            ServiceErrorKind::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is(&self, kind: ServiceErrorKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => not_found(err.to_string()),
            StoreError::UniqueViolation { .. } | StoreError::InvalidTransition { .. } => {
                conflict(err.to_string())
            }
            StoreError::Backend(_) => internal_error(err.to_string()),
        }
    }
}

pub fn unauthorized(message: impl Into<String>) -> ServiceError {
    ServiceError::new(ServiceErrorKind::Unauthorized, message)
}

pub fn not_found(message: impl Into<String>) -> ServiceError {
    ServiceError::new(ServiceErrorKind::NotFound, message)
}

pub fn validation(message: impl Into<String>) -> ServiceError {
    ServiceError::new(ServiceErrorKind::Validation, message)
}

pub fn conflict(message: impl Into<String>) -> ServiceError {
    ServiceError::new(ServiceErrorKind::Conflict, message)
}

pub fn premium_required(message: impl Into<String>) -> ServiceError {
    ServiceError::new(ServiceErrorKind::PremiumRequired, message)
}

pub fn internal_error(message: impl Into<String>) -> ServiceError {
    ServiceError::new(ServiceErrorKind::Internal, message)
}
