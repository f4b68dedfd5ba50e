use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::Instrument;

use crate::ai_provider::{
    adapters::{ProviderAdapter, adapter_for, http_common::strip_code_fences},
    credentials::{CredentialProvider, EnvCredentialProvider},
    error::{
        ProviderError, ProviderErrorKind, invalid_request, malformed_response, schema_mismatch,
        unconfigured,
    },
    types::{AdapterContext, AiProviderConfig, StructuredRequest},
};

/// Source of schema-conforming JSON answers.
#[async_trait]
pub trait StructuredProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// One attempt, no retry. The returned value has already been validated
    /// against `request.schema`.
    async fn generate_json(&self, request: StructuredRequest) -> Result<Value, ProviderError>;
}

/// Installed when no provider or credential is configured; every call fails
/// with [`ProviderErrorKind::Unconfigured`] so callers take their fallback path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProvider;

#[async_trait]
impl StructuredProvider for NullProvider {
    fn provider_id(&self) -> &str {
        "none"
    }

    async fn generate_json(&self, _request: StructuredRequest) -> Result<Value, ProviderError> {
        Err(unconfigured("no AI provider configured"))
    }
}

pub struct ConfiguredProvider {
    config: AiProviderConfig,
    endpoint: String,
    adapter: Arc<dyn ProviderAdapter>,
    credentials: Arc<dyn CredentialProvider>,
}

impl ConfiguredProvider {
    pub fn new(config: AiProviderConfig) -> Result<Self, ProviderError> {
        let adapter = adapter_for(config.dialect);
        Self::with_parts(config, adapter, Arc::new(EnvCredentialProvider))
    }

    pub fn with_parts(
        config: AiProviderConfig,
        adapter: Arc<dyn ProviderAdapter>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ProviderError> {
        if adapter.dialect() != config.dialect {
            return Err(invalid_request(format!(
                "adapter dialect {:?} does not match provider {} dialect {:?}",
                adapter.dialect(),
                config.id,
                config.dialect
            )));
        }
        let endpoint = config
            .endpoint
            .clone()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .or_else(|| config.dialect.default_endpoint().map(str::to_string))
            .ok_or_else(|| {
                invalid_request(format!("provider {} requires an endpoint", config.id))
                    .with_provider_id(config.id.clone())
            })?;

        Ok(Self {
            config,
            endpoint,
            adapter,
            credentials,
        })
    }

    pub fn config(&self) -> &AiProviderConfig {
        &self.config
    }
}

#[async_trait]
impl StructuredProvider for ConfiguredProvider {
    fn provider_id(&self) -> &str {
        &self.config.id
    }

    async fn generate_json(&self, request: StructuredRequest) -> Result<Value, ProviderError> {
        let span = tracing::info_span!(
            target: "ai_provider",
            "provider_request",
            request_id = %request.request_id,
            provider_id = %self.config.id,
            dialect = ?self.config.dialect,
            model = %self.config.model
        );

        async {
            let started_at = Instant::now();
            let credential = self
                .credentials
                .resolve(&self.config.credential, &self.config)
                .await?;
            let ctx = AdapterContext {
                provider_id: self.config.id.clone(),
                endpoint: self.endpoint.clone(),
                model: self.config.model.clone(),
                credential,
                timeout: self.config.request_timeout(),
                request_id: request.request_id.clone(),
            };

            let raw = self.adapter.invoke(ctx, &request).await?;
            let value = parse_structured_output(&raw, &request.schema)
                .map_err(|err| err.with_provider_id(self.config.id.clone()))?;

            tracing::debug!(
                target: "ai_provider",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "provider_request_completed"
            );
            Ok(value)
        }
        .instrument(span)
        .await
    }
}

/// Parses raw model text into JSON and checks it against `schema`.
pub fn parse_structured_output(raw: &str, schema: &Value) -> Result<Value, ProviderError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ProviderError::new(
            ProviderErrorKind::EmptyResponse,
            "provider returned an empty body",
        ));
    }

    let value: Value = serde_json::from_str(text)
        .map_err(|err| malformed_response(format!("provider output is not JSON: {err}")))?;

    let compiled = JSONSchema::compile(schema)
        .map_err(|err| invalid_request(format!("output schema does not compile: {err}")))?;
    if let Err(errors) = compiled.validate(&value) {
        let messages = errors.map(|error| error.to_string()).collect::<Vec<_>>();
        return Err(schema_mismatch(format!(
            "provider output failed schema validation: {}",
            messages.join("; ")
        )));
    }

    Ok(value)
}
