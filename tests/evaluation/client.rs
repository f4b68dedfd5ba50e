use std::sync::Arc;

use serde_json::json;

use codecritic::{
    ai_provider::{ConfiguredProvider, NullProvider, ProviderErrorKind, StructuredProvider},
    evaluation::{AiEvaluationClient, EvaluationSource, SeededSelection},
};

use crate::{
    RawTextAdapter, ScriptedProvider, StaticCredentialProvider, provider_config, python_input,
};

fn client(provider: Arc<dyn StructuredProvider>) -> AiEvaluationClient {
    AiEvaluationClient::with_selection(provider, Arc::new(SeededSelection::new(11)))
}

fn raw_provider(raw: Result<&str, ProviderErrorKind>) -> Arc<dyn StructuredProvider> {
    let adapter = RawTextAdapter {
        raw: raw.map(str::to_string),
    };
    Arc::new(
        ConfiguredProvider::with_parts(
            provider_config("http://provider.invalid/v1"),
            Arc::new(adapter),
            Arc::new(StaticCredentialProvider),
        )
        .expect("provider should build"),
    )
}

#[tokio::test]
async fn given_out_of_range_scores_when_evaluated_then_scores_are_clamped() {
    for (raw, expected) in [(142.0, 100), (-5.0, 0), (87.6, 88), (49.5, 50)] {
        let provider = ScriptedProvider::answering(json!({
            "score": raw,
            "strengths": ["Readable"],
            "improvements": ["Add tests"]
        }));
        let result = client(provider).evaluate(&python_input("print('hi')")).await;
        assert_eq!(result.score, expected, "raw score {raw}");
        assert_eq!(result.source, EvaluationSource::Provider);
        assert_eq!(result.narrative, None);
    }
}

#[tokio::test]
async fn given_provider_lists_when_evaluated_then_entries_are_trimmed_and_blanks_dropped() {
    let provider = ScriptedProvider::answering(json!({
        "score": 77,
        "strengths": ["  Clear naming  ", ""],
        "improvements": ["Handle errors", "   "]
    }));
    let result = client(provider).evaluate(&python_input("print('hi')")).await;
    assert_eq!(result.strengths, vec!["Clear naming".to_string()]);
    assert_eq!(result.improvements, vec!["Handle errors".to_string()]);
}

#[tokio::test]
async fn given_each_provider_failure_when_evaluated_then_heuristic_is_used() {
    for kind in [
        ProviderErrorKind::Unconfigured,
        ProviderErrorKind::BackendTransient,
        ProviderErrorKind::Timeout,
        ProviderErrorKind::RateLimited,
        ProviderErrorKind::EmptyResponse,
        ProviderErrorKind::MalformedResponse,
        ProviderErrorKind::SchemaMismatch,
    ] {
        let provider = ScriptedProvider::failing(kind);
        let result = client(provider.clone())
            .evaluate(&python_input("print('hi')"))
            .await;
        assert_eq!(result.source, EvaluationSource::Heuristic, "kind {kind:?}");
        assert!((40..=95).contains(&result.score));
        assert_eq!(provider.call_count(), 1, "one attempt, no retry");
    }
}

#[tokio::test]
async fn given_empty_strengths_when_evaluated_then_heuristic_is_used() {
    let provider = ScriptedProvider::answering(json!({
        "score": 90,
        "strengths": [],
        "improvements": ["Add tests"]
    }));
    let result = client(provider).evaluate(&python_input("print('hi')")).await;
    assert_eq!(result.source, EvaluationSource::Heuristic);
}

#[tokio::test]
async fn given_no_provider_when_cold_python_task_evaluated_then_heuristic_scores_it() {
    let result = client(Arc::new(NullProvider))
        .evaluate(&python_input("print('hi')"))
        .await;
    assert_eq!(result.source, EvaluationSource::Heuristic);
    assert!((40..=95).contains(&result.score));
    assert_eq!(result.strengths.len(), 4);
    assert_eq!(result.improvements.len(), 3);
}

#[tokio::test]
async fn given_raw_model_text_when_parsing_fails_then_heuristic_is_used() {
    let cases = [
        Ok("not json at all"),
        Ok(""),
        Ok(r#"{"score": 80, "strengths": ["Readable"]}"#),
        Ok(r#"{"score": "eighty", "strengths": ["a"], "improvements": ["b"]}"#),
        Err(ProviderErrorKind::BackendTransient),
    ];
    for raw in cases {
        let result = client(raw_provider(raw))
            .evaluate(&python_input("print('hi')"))
            .await;
        assert_eq!(result.source, EvaluationSource::Heuristic, "raw {raw:?}");
    }
}

#[tokio::test]
async fn given_fenced_schema_valid_text_when_evaluated_then_provider_result_is_used() {
    let raw = "```json\n{\"score\": 83.2, \"strengths\": [\"Readable\"], \"improvements\": [\"Add tests\"]}\n```";
    let result = client(raw_provider(Ok(raw)))
        .evaluate(&python_input("print('hi')"))
        .await;
    assert_eq!(result.source, EvaluationSource::Provider);
    assert_eq!(result.score, 83);
}

#[tokio::test]
async fn given_unreachable_endpoint_when_evaluated_then_transport_error_falls_back() {
    let provider = ConfiguredProvider::new(provider_config("http://127.0.0.1:1/v1"))
        .expect("provider should build");
    let result = client(Arc::new(provider))
        .evaluate(&python_input("print('hi')"))
        .await;
    assert_eq!(result.source, EvaluationSource::Heuristic);
}
