//! Startup wiring shared by the binary and the integration tests.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    ai_provider::provider_from_config,
    config::{Config, IdentityConfig, StoreConfig},
    http::AppState,
    store::{RecordStore, TableStore},
    types::{User, now_rfc3339},
};

pub fn open_store(config: &StoreConfig) -> Result<Arc<TableStore>> {
    let store = match config {
        StoreConfig::Memory => TableStore::in_memory(),
        StoreConfig::File { path } => TableStore::open_file(path.clone())
            .with_context(|| format!("failed to open store at {}", path.display()))?,
    };
    Ok(Arc::new(store))
}

/// Creates configured users and their tokens. A user already present in a
/// durable store keeps its subscription; configuration can grant premium but
/// never revoke it.
pub async fn seed_identities(store: &dyn RecordStore, identity: &IdentityConfig) -> Result<()> {
    for seed in &identity.users {
        let existing = store
            .get_user(&seed.id)
            .await
            .with_context(|| format!("failed to read user '{}'", seed.id))?;
        let (is_premium, premium_since) = match existing {
            Some(user) if user.is_premium => (true, user.premium_since),
            _ if seed.is_premium => (true, Some(now_rfc3339())),
            _ => (false, None),
        };

        store
            .upsert_user(User {
                id: seed.id.clone(),
                name: seed.name.clone(),
                email: seed.email.clone(),
                is_premium,
                premium_since,
            })
            .await
            .with_context(|| format!("failed to seed user '{}'", seed.id))?;
        for token in &seed.tokens {
            store
                .put_session(token, &seed.id)
                .await
                .with_context(|| format!("failed to register session for '{}'", seed.id))?;
        }
        tracing::info!(
            target: "identity",
            user_id = %seed.id,
            tokens = seed.tokens.len(),
            is_premium,
            "identity_seeded"
        );
    }
    Ok(())
}

/// Opens the store, seeds identities and picks the AI provider.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let store = open_store(&config.store)?;
    tracing::info!(target: "store", durable = store.is_durable(), "store_ready");
    seed_identities(store.as_ref(), &config.identity).await?;

    let provider = provider_from_config(config.ai_provider.as_ref())
        .context("failed to construct ai provider")?;

    Ok(Arc::new(AppState::new(
        store,
        provider,
        config.limits.clone(),
    )))
}
