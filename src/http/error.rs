use axum::{
    Json,
    extract::{
        Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::error::{ServiceError, ServiceErrorKind, validation};

pub fn status_for(kind: ServiceErrorKind) -> StatusCode {
    match kind {
        ServiceErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ServiceErrorKind::NotFound => StatusCode::NOT_FOUND,
        ServiceErrorKind::Validation => StatusCode::BAD_REQUEST,
        ServiceErrorKind::Conflict => StatusCode::CONFLICT,
        ServiceErrorKind::PremiumRequired => StatusCode::FORBIDDEN,
        ServiceErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"error": message, "code": code}` with the given status.
pub fn json_error(status: StatusCode, message: &str, code: &str) -> Response {
    (status, Json(json!({"error": message, "code": code}))).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);
        if self.kind == ServiceErrorKind::Internal {
            tracing::error!(target: "http", error = %self.message, "request_failed_internal");
            return json_error(status, "Internal server error", self.kind.code());
        }
        tracing::debug!(
            target: "http",
            code = self.kind.code(),
            error = %self.message,
            "request_rejected"
        );
        json_error(status, &self.message, self.kind.code())
    }
}

/// Unwraps a JSON body, turning extractor rejections into validation errors.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| validation(format!("Invalid JSON body: {}", rejection.body_text())))
}

/// Unwraps query parameters, turning extractor rejections into validation
/// errors.
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ServiceError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| {
            validation(format!("Invalid query string: {}", rejection.body_text()))
        })
}

pub fn parse_path_id(raw: &str) -> Result<u64, ServiceError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| validation("Valid ID is required"))
}

/// Reads a required integer id field from a request body.
pub fn body_id(value: Option<&Value>, field: &str) -> Result<u64, ServiceError> {
    let value = value.ok_or_else(|| validation(format!("{field} is required")))?;
    let parsed = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed
        .filter(|id| *id > 0)
        .ok_or_else(|| validation(format!("{field} must be a valid integer")))
}
