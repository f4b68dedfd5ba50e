pub mod adapters;
pub mod credentials;
pub mod error;
pub mod provider;
pub mod types;

use std::sync::Arc;

pub use error::{ProviderError, ProviderErrorKind};
pub use provider::{ConfiguredProvider, NullProvider, StructuredProvider};
pub use types::{AiProviderConfig, CredentialRef, ProviderDialect, StructuredRequest};

/// Picks the provider for the configured section: a [`ConfiguredProvider`]
/// when the section exists and its credential resolves, otherwise
/// [`NullProvider`].
pub fn provider_from_config(
    config: Option<&AiProviderConfig>,
) -> Result<Arc<dyn StructuredProvider>, ProviderError> {
    let Some(config) = config else {
        tracing::info!(target: "ai_provider", "ai_provider_not_configured");
        return Ok(Arc::new(NullProvider));
    };
    if !credentials::credential_available(&config.credential) {
        tracing::warn!(
            target: "ai_provider",
            provider_id = %config.id,
            "ai_provider_credential_missing_using_fallback"
        );
        return Ok(Arc::new(NullProvider));
    }

    let provider = ConfiguredProvider::new(config.clone())?;
    tracing::info!(
        target: "ai_provider",
        provider_id = %config.id,
        dialect = ?config.dialect,
        model = %config.model,
        "ai_provider_configured"
    );
    Ok(Arc::new(provider))
}
