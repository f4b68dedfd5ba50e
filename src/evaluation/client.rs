use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::{
    ai_provider::{
        ProviderError, ProviderErrorKind, StructuredProvider, StructuredRequest,
        error::malformed_response,
    },
    evaluation::{
        heuristic::{EntropySelection, SelectionSource, heuristic_evaluate},
        prompts::{evaluation_prompt, evaluation_schema},
        types::{EvaluationInput, EvaluationResult, EvaluationSource},
    },
};

/// Scores code with the provider and falls back to the heuristic on any
/// provider failure. `evaluate` never fails.
pub struct AiEvaluationClient {
    provider: Arc<dyn StructuredProvider>,
    selection: Arc<dyn SelectionSource>,
}

impl AiEvaluationClient {
    pub fn new(provider: Arc<dyn StructuredProvider>) -> Self {
        Self::with_selection(provider, Arc::new(EntropySelection))
    }

    pub fn with_selection(
        provider: Arc<dyn StructuredProvider>,
        selection: Arc<dyn SelectionSource>,
    ) -> Self {
        Self {
            provider,
            selection,
        }
    }

    pub async fn evaluate(&self, input: &EvaluationInput) -> EvaluationResult {
        let request = StructuredRequest {
            request_id: Uuid::now_v7().to_string(),
            prompt: evaluation_prompt(input),
            schema: evaluation_schema(),
        };
        let request_id = request.request_id.clone();

        let outcome = match self.provider.generate_json(request).await {
            Ok(value) => normalize_provider_output(&value),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(result) => {
                tracing::info!(
                    target: "evaluation",
                    request_id = %request_id,
                    provider_id = %self.provider.provider_id(),
                    source = result.source.as_str(),
                    score = result.score,
                    "evaluation_scored"
                );
                result
            }
            Err(err) => {
                log_fallback(&request_id, self.provider.provider_id(), &err);
                let result =
                    heuristic_evaluate(&input.code, input.language.as_deref(), &*self.selection);
                tracing::info!(
                    target: "evaluation",
                    request_id = %request_id,
                    source = result.source.as_str(),
                    score = result.score,
                    "evaluation_scored"
                );
                result
            }
        }
    }
}

fn log_fallback(request_id: &str, provider_id: &str, err: &ProviderError) {
    if err.kind == ProviderErrorKind::Unconfigured {
        tracing::debug!(
            target: "evaluation",
            request_id = %request_id,
            "evaluation_using_heuristic_no_provider"
        );
        return;
    }
    tracing::warn!(
        target: "evaluation",
        request_id = %request_id,
        provider_id = %provider_id,
        error_kind = err.kind.as_str(),
        error = %err,
        "evaluation_provider_failed_using_heuristic"
    );
}

/// Rounds then clamps a provider score into `0..=100`.
pub fn normalize_score(raw: f64) -> Option<u8> {
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

fn string_list(value: &Value, field: &str) -> Result<Vec<String>, ProviderError> {
    let entries = value
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| malformed_response(format!("`{field}` is not an array")))?;
    let list = entries
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if list.is_empty() {
        return Err(malformed_response(format!("`{field}` has no usable entries")));
    }
    Ok(list)
}

pub fn normalize_provider_output(value: &Value) -> Result<EvaluationResult, ProviderError> {
    let score = value
        .get("score")
        .and_then(Value::as_f64)
        .and_then(normalize_score)
        .ok_or_else(|| malformed_response("`score` is not a finite number"))?;

    Ok(EvaluationResult {
        score,
        strengths: string_list(value, "strengths")?,
        improvements: string_list(value, "improvements")?,
        narrative: None,
        source: EvaluationSource::Provider,
    })
}
