use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Map, Value, json};

use crate::ai_provider::{
    adapters::{ProviderAdapter, http_common},
    error::{ProviderError, ProviderErrorKind, malformed_response},
    types::{AdapterContext, ProviderDialect, StructuredRequest},
};

/// Google Gemini `generateContent` adapter using JSON response mode.
#[derive(Clone)]
pub struct GeminiAdapter {
    client: Client,
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self {
            client: http_common::shared_client(),
        }
    }
}

/// Gemini accepts an OpenAPI subset: upper-case type names and no
/// `additionalProperties` / `$schema`.
pub fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut converted = Map::new();
            for (key, value) in map {
                match key.as_str() {
                    "$schema" | "additionalProperties" => {}
                    "type" => {
                        let upper = value
                            .as_str()
                            .map(|kind| Value::String(kind.to_ascii_uppercase()))
                            .unwrap_or_else(|| value.clone());
                        converted.insert(key.clone(), upper);
                    }
                    _ => {
                        converted.insert(key.clone(), to_gemini_schema(value));
                    }
                }
            }
            Value::Object(converted)
        }
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn dialect(&self) -> ProviderDialect {
        ProviderDialect::Gemini
    }

    async fn invoke(
        &self,
        ctx: AdapterContext,
        req: &StructuredRequest,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            ctx.endpoint.trim_end_matches('/'),
            ctx.model
        );
        let body = json!({
            "contents": [
                {"role": "user", "parts": [{"text": req.prompt}]}
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": to_gemini_schema(&req.schema),
            },
        });

        let mut req_builder = self
            .client
            .post(url)
            .timeout(ctx.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", ctx.request_id.as_str())
            .json(&body);
        if let Some(secret) = &ctx.credential.secret {
            req_builder = req_builder.header("x-goog-api-key", secret.as_str());
        }

        let response = req_builder
            .send()
            .await
            .map_err(|err| http_common::map_transport_error(err, &ctx.provider_id, "gemini"))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(http_common::map_http_error(status, &ctx.provider_id, &body));
        }

        let payload = response.json::<Value>().await.map_err(|err| {
            malformed_response(format!("invalid gemini response body: {err}"))
                .with_provider_id(ctx.provider_id.clone())
        })?;

        let text = payload
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::new(
                ProviderErrorKind::EmptyResponse,
                "gemini response carried no candidate text",
            )
            .with_provider_id(ctx.provider_id.clone()));
        }

        Ok(text)
    }
}
