use std::sync::Arc;

use async_trait::async_trait;

use crate::ai_provider::{
    error::ProviderError,
    types::{AdapterContext, ProviderDialect, StructuredRequest},
};

pub mod gemini;
pub mod http_common;
pub mod openai_compatible;

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn dialect(&self) -> ProviderDialect;

    /// Sends one request and returns the raw text the model produced.
    async fn invoke(
        &self,
        ctx: AdapterContext,
        req: &StructuredRequest,
    ) -> Result<String, ProviderError>;
}

pub fn adapter_for(dialect: ProviderDialect) -> Arc<dyn ProviderAdapter> {
    match dialect {
        ProviderDialect::OpenAiCompatible => {
            Arc::new(openai_compatible::OpenAiCompatibleAdapter::default())
        }
        ProviderDialect::Gemini => Arc::new(gemini::GeminiAdapter::default()),
    }
}
