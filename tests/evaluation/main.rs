mod client;
mod feedback;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;

use codecritic::{
    ai_provider::{
        CredentialRef, ProviderError, ProviderErrorKind, StructuredProvider, StructuredRequest,
        adapters::ProviderAdapter,
        credentials::CredentialProvider,
        types::{AdapterContext, AiProviderConfig, ProviderDialect, ResolvedCredential},
    },
    evaluation::{EvaluationInput, FeedbackInput},
};

/// Answers every request with the same value or error and counts calls.
pub struct ScriptedProvider {
    answer: Result<Value, ProviderErrorKind>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn answering(value: Value) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(value),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(kind: ProviderErrorKind) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(kind),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuredProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn generate_json(&self, _request: StructuredRequest) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(value) => Ok(value.clone()),
            Err(kind) => Err(ProviderError::new(*kind, "scripted failure")),
        }
    }
}

/// Adapter returning a fixed raw model text, so the provider's own parsing
/// and schema validation run.
pub struct RawTextAdapter {
    pub raw: Result<String, ProviderErrorKind>,
}

#[async_trait]
impl ProviderAdapter for RawTextAdapter {
    fn dialect(&self) -> ProviderDialect {
        ProviderDialect::OpenAiCompatible
    }

    async fn invoke(
        &self,
        _ctx: AdapterContext,
        _req: &StructuredRequest,
    ) -> Result<String, ProviderError> {
        match &self.raw {
            Ok(raw) => Ok(raw.clone()),
            Err(kind) => Err(ProviderError::new(*kind, "adapter failure")),
        }
    }
}

#[derive(Default)]
pub struct StaticCredentialProvider;

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn resolve(
        &self,
        _reference: &CredentialRef,
        _provider: &AiProviderConfig,
    ) -> Result<ResolvedCredential, ProviderError> {
        Ok(ResolvedCredential {
            secret: Some("test-key".to_string()),
        })
    }
}

pub fn provider_config(endpoint: &str) -> AiProviderConfig {
    AiProviderConfig {
        id: "test-provider".to_string(),
        dialect: ProviderDialect::OpenAiCompatible,
        endpoint: Some(endpoint.to_string()),
        model: "gpt-test".to_string(),
        credential: CredentialRef::None,
        request_timeout_ms: 2_000,
    }
}

pub fn python_input(code: &str) -> EvaluationInput {
    EvaluationInput {
        code: code.to_string(),
        language: Some("python".to_string()),
        title: "Greeting".to_string(),
        description: None,
    }
}

pub fn feedback_input(code: &str, score: u8) -> FeedbackInput {
    FeedbackInput {
        code: code.to_string(),
        language: Some("javascript".to_string()),
        title: "Sum helper".to_string(),
        description: Some("Adds two numbers".to_string()),
        score,
        strengths: vec![
            "Good variable and function naming conventions".to_string(),
            "Clear and maintainable code style".to_string(),
        ],
        improvements: vec!["Add unit tests to verify functionality".to_string()],
    }
}
