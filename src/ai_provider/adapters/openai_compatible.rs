use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::ai_provider::{
    adapters::{ProviderAdapter, http_common},
    error::{ProviderError, ProviderErrorKind, malformed_response},
    types::{AdapterContext, ProviderDialect, StructuredRequest},
};

const SYSTEM_PROMPT: &str = "You are an expert code reviewer. Reply with a single JSON object and nothing else.";

/// Chat-completions adapter for OpenAI and compatible gateways.
#[derive(Clone)]
pub struct OpenAiCompatibleAdapter {
    client: Client,
}

impl Default for OpenAiCompatibleAdapter {
    fn default() -> Self {
        Self {
            client: http_common::shared_client(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn dialect(&self) -> ProviderDialect {
        ProviderDialect::OpenAiCompatible
    }

    async fn invoke(
        &self,
        ctx: AdapterContext,
        req: &StructuredRequest,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", ctx.endpoint.trim_end_matches('/'));
        let body = json!({
            "model": ctx.model,
            "messages": [
                {
                    "role": "system",
                    "content": format!(
                        "{SYSTEM_PROMPT} The object must match this JSON schema: {}",
                        req.schema
                    ),
                },
                {"role": "user", "content": req.prompt},
            ],
            "response_format": {"type": "json_object"},
            "stream": false,
        });

        let mut req_builder = self
            .client
            .post(url)
            .timeout(ctx.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", ctx.request_id.as_str())
            .json(&body);
        if let Some(secret) = &ctx.credential.secret {
            req_builder = req_builder.header(header::AUTHORIZATION, format!("Bearer {secret}"));
        }

        let response = req_builder
            .send()
            .await
            .map_err(|err| {
                http_common::map_transport_error(err, &ctx.provider_id, "openai-compatible")
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(http_common::map_http_error(status, &ctx.provider_id, &body));
        }

        let payload = response.json::<Value>().await.map_err(|err| {
            malformed_response(format!("invalid openai-compatible response body: {err}"))
                .with_provider_id(ctx.provider_id.clone())
        })?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ProviderError::new(
                ProviderErrorKind::EmptyResponse,
                "openai-compatible response carried no message content",
            )
            .with_provider_id(ctx.provider_id.clone()));
        }

        Ok(content.to_string())
    }
}
