use std::env;

use async_trait::async_trait;

use crate::ai_provider::{
    error::{ProviderError, ProviderErrorKind, invalid_request},
    types::{AiProviderConfig, CredentialRef, ResolvedCredential},
};

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        provider: &AiProviderConfig,
    ) -> Result<ResolvedCredential, ProviderError>;
}

#[derive(Default)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        provider: &AiProviderConfig,
    ) -> Result<ResolvedCredential, ProviderError> {
        match reference {
            CredentialRef::Env { var } => {
                let token = env::var(var)
                    .ok()
                    .filter(|token| !token.trim().is_empty())
                    .ok_or_else(|| {
                        ProviderError::new(
                            ProviderErrorKind::Authentication,
                            format!(
                                "missing credential environment variable {} for provider {}",
                                var, provider.id
                            ),
                        )
                        .with_provider_id(provider.id.clone())
                    })?;
                Ok(ResolvedCredential {
                    secret: Some(token),
                })
            }
            CredentialRef::InlineToken { token } => {
                if token.trim().is_empty() {
                    return Err(invalid_request("inline credential token cannot be empty"));
                }
                Ok(ResolvedCredential {
                    secret: Some(token.clone()),
                })
            }
            CredentialRef::None => Ok(ResolvedCredential::none()),
        }
    }
}

/// True when `reference` can produce a secret right now. Used at startup to
/// decide between a configured provider and the null provider.
pub fn credential_available(reference: &CredentialRef) -> bool {
    match reference {
        CredentialRef::Env { var } => env::var(var).is_ok_and(|token| !token.trim().is_empty()),
        CredentialRef::InlineToken { token } => !token.trim().is_empty(),
        CredentialRef::None => true,
    }
}
