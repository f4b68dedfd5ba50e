use std::sync::Arc;

use serde::Serialize;

use crate::{
    error::{ServiceError, not_found},
    store::RecordStore,
    types::{User, now_rfc3339},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub is_premium: bool,
    pub premium_since: Option<String>,
}

impl From<&User> for SubscriptionStatus {
    fn from(user: &User) -> Self {
        Self {
            is_premium: user.is_premium,
            premium_since: user.premium_since.clone(),
        }
    }
}

/// Lifetime subscription. Activation is one-way and never touches
/// per-evaluation unlock flags.
pub struct SubscriptionService {
    store: Arc<dyn RecordStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn status(&self, user: &User) -> Result<SubscriptionStatus, ServiceError> {
        let user = self
            .store
            .get_user(&user.id)
            .await?
            .ok_or_else(|| not_found("User not found"))?;
        Ok(SubscriptionStatus::from(&user))
    }

    pub async fn activate(&self, user: &User) -> Result<SubscriptionStatus, ServiceError> {
        let updated = self
            .store
            .activate_subscription(&user.id, &now_rfc3339())
            .await?;
        if !user.is_premium {
            tracing::info!(target: "subscription", user_id = %user.id, "subscription_activated");
        }
        Ok(SubscriptionStatus::from(&updated))
    }
}
