use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::{ServiceError, unauthorized},
    store::RecordStore,
    types::User,
};

/// Resolves the caller behind a bearer token.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self, bearer_token: &str) -> Result<Option<User>, ServiceError>;
}

/// Looks tokens up in the store's session table. The user record is read on
/// every call so subscription changes apply to the next request.
pub struct SessionTokenIdentity {
    store: Arc<dyn RecordStore>,
}

impl SessionTokenIdentity {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityProvider for SessionTokenIdentity {
    async fn current_user(&self, bearer_token: &str) -> Result<Option<User>, ServiceError> {
        let token = bearer_token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self.store.find_user_by_token(token).await?)
    }
}

/// Extracts the token from an `Authorization` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn require_user(
    identity: &dyn IdentityProvider,
    header_value: Option<&str>,
) -> Result<User, ServiceError> {
    let token = header_value
        .and_then(bearer_token)
        .ok_or_else(|| unauthorized("Authentication required"))?;
    identity
        .current_user(token)
        .await?
        .ok_or_else(|| unauthorized("Authentication required"))
}
