use std::{sync::OnceLock, time::Duration};

use reqwest::Client;

use crate::ai_provider::error::{ProviderError, ProviderErrorKind};

/// Shared connection pool for every adapter instance.
pub fn shared_client() -> Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT
        .get_or_init(|| {
            Client::builder()
                .pool_idle_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new())
        })
        .clone()
}

pub fn map_http_error(status: u16, provider_id: &str, body: &str) -> ProviderError {
    let normalized_body = body.chars().take(240).collect::<String>();

    let mut err = match status {
        401 => ProviderError::new(ProviderErrorKind::Authentication, "authentication failed"),
        403 => ProviderError::new(ProviderErrorKind::Authorization, "authorization failed"),
        408 | 429 => ProviderError::new(
            ProviderErrorKind::RateLimited,
            format!("provider returned status {}", status),
        ),
        400..=499 => ProviderError::new(
            ProviderErrorKind::InvalidRequest,
            format!("provider returned status {}", status),
        ),
        _ => ProviderError::new(
            ProviderErrorKind::BackendTransient,
            format!("provider returned status {}", status),
        ),
    };

    err = err
        .with_provider_id(provider_id.to_string())
        .with_provider_http_status(status);

    if !normalized_body.is_empty() {
        err.message = format!("{}: {}", err.message, normalized_body);
    }

    err
}

pub fn map_transport_error(err: reqwest::Error, provider_id: &str, label: &str) -> ProviderError {
    let kind = if err.is_timeout() {
        ProviderErrorKind::Timeout
    } else {
        ProviderErrorKind::BackendTransient
    };
    ProviderError::new(kind, format!("{label} request failed: {err}"))
        .with_provider_id(provider_id.to_string())
}

/// Removes a surrounding markdown fence (```json ... ```) if the model wrapped
/// its JSON in one.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.find('\n') {
        Some(idx) if !body[..idx].trim().contains(['{', '[']) => body[idx + 1..].trim(),
        _ => body.trim(),
    }
}
