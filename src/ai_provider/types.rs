use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderDialect {
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    #[serde(rename = "gemini")]
    Gemini,
}

impl ProviderDialect {
    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            ProviderDialect::OpenAiCompatible => None,
            ProviderDialect::Gemini => Some("https://generativelanguage.googleapis.com/v1beta"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    InlineToken { token: String },
    None,
}

/// Secret resolved from a [`CredentialRef`]. Adapters decide which header
/// carries it.
#[derive(Clone, Default)]
pub struct ResolvedCredential {
    pub secret: Option<String>,
}

impl ResolvedCredential {
    pub fn none() -> Self {
        Self { secret: None }
    }
}

impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_provider_id() -> String {
    "default".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProviderConfig {
    #[serde(default = "default_provider_id")]
    pub id: String,
    pub dialect: ProviderDialect,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub model: String,
    pub credential: CredentialRef,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl AiProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// One prompt whose answer must be a JSON object conforming to `schema`.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub request_id: String,
    pub prompt: String,
    pub schema: Value,
}

#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub provider_id: String,
    pub endpoint: String,
    pub model: String,
    pub credential: ResolvedCredential,
    pub timeout: Duration,
    pub request_id: String,
}
