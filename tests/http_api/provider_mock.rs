use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use reqwest::Method;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use codecritic::ai_provider::{
    AiProviderConfig, ConfiguredProvider, CredentialRef, ProviderDialect,
};

use crate::{ALICE, TestApp};

#[derive(Default)]
struct MockState {
    fail: bool,
    calls: AtomicUsize,
    auth_headers: Mutex<Vec<String>>,
}

impl MockState {
    fn record(&self, headers: &HeaderMap, name: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.auth_headers.lock().expect("mock lock").push(value);
    }
}

fn answer_for(request_schema: Option<&Value>) -> Value {
    let wants_narrative = request_schema
        .and_then(|schema| schema.pointer("/properties/detailedFeedback"))
        .is_some();
    if wants_narrative {
        json!({ "detailedFeedback": "  A thorough narrative from the mock.  " })
    } else {
        json!({
            "score": 142,
            "strengths": [" Clear naming ", "Small functions", "Good tests", "Readable flow"],
            "improvements": ["Add docs", "Handle errors", "Split modules"]
        })
    }
}

async fn chat_completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    state.record(&headers, "authorization");
    if state.fail {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let system = body
        .pointer("/messages/0/content")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let schema = system
        .contains("detailedFeedback")
        .then(|| json!({ "properties": { "detailedFeedback": {} } }));
    let content = answer_for(schema.as_ref()).to_string();
    Ok(Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })))
}

async fn generate_content(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    state.record(&headers, "x-goog-api-key");
    if state.fail {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let text = answer_for(body.pointer("/generationConfig/responseSchema")).to_string();
    Ok(Json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })))
}

async fn spawn_mock(fail: bool) -> (String, Arc<MockState>) {
    let state = Arc::new(MockState {
        fail,
        ..MockState::default()
    });
    let router = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1beta/models/{*rest}", post(generate_content))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
    let addr = listener.local_addr().expect("mock addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    (format!("http://{addr}"), state)
}

fn provider(dialect: ProviderDialect, endpoint: String) -> Arc<ConfiguredProvider> {
    let config = AiProviderConfig {
        id: "mock".to_string(),
        dialect,
        endpoint: Some(endpoint),
        model: "mock-model".to_string(),
        credential: CredentialRef::InlineToken {
            token: "secret-key".to_string(),
        },
        request_timeout_ms: 5_000,
    };
    Arc::new(ConfiguredProvider::new(config).expect("provider should build"))
}

async fn evaluate_new_task(app: &TestApp) -> Value {
    let (status, task) = app
        .json(
            Method::POST,
            "/api/tasks",
            Some(ALICE),
            Some(json!({ "title": "Mocked", "codeContent": "def f():\n    return 1" })),
        )
        .await;
    assert_eq!(status, 201, "{task}");
    let (status, evaluation) = app
        .json(
            Method::POST,
            "/api/ai/evaluate",
            Some(ALICE),
            Some(json!({ "taskId": task["id"] })),
        )
        .await;
    assert_eq!(status, 201, "{evaluation}");
    evaluation
}

#[tokio::test]
async fn given_openai_compatible_provider_when_score_out_of_range_then_clamped_and_trimmed() {
    let (endpoint, mock) = spawn_mock(false).await;
    let app = TestApp::spawn(provider(
        ProviderDialect::OpenAiCompatible,
        format!("{endpoint}/v1"),
    ))
    .await;

    let evaluation = evaluate_new_task(&app).await;

    assert_eq!(evaluation["score"], 100);
    assert_eq!(evaluation["strengths"][0], "Clear naming");
    assert_eq!(evaluation["improvements"].as_array().map(Vec::len), Some(3));
    assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *mock.auth_headers.lock().expect("mock lock"),
        vec!["Bearer secret-key".to_string()]
    );
}

#[tokio::test]
async fn given_failing_provider_when_evaluating_then_heuristic_result_is_stored() {
    let (endpoint, mock) = spawn_mock(true).await;
    let app = TestApp::spawn(provider(
        ProviderDialect::OpenAiCompatible,
        format!("{endpoint}/v1"),
    ))
    .await;

    let evaluation = evaluate_new_task(&app).await;

    let score = evaluation["score"].as_u64().expect("score");
    assert!((40..=95).contains(&score));
    assert_eq!(evaluation["strengths"].as_array().map(Vec::len), Some(4));
    assert_eq!(evaluation["improvements"].as_array().map(Vec::len), Some(3));
    assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn given_gemini_provider_when_evaluating_and_generating_then_both_calls_use_api_key() {
    let (endpoint, mock) = spawn_mock(false).await;
    let app = TestApp::spawn(provider(ProviderDialect::Gemini, format!("{endpoint}/v1beta"))).await;

    let evaluation = evaluate_new_task(&app).await;
    assert_eq!(evaluation["score"], 100);

    let (status, _) = app
        .json(Method::POST, "/api/subscription/activate", Some(ALICE), None)
        .await;
    assert_eq!(status, 200);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/ai/feedback",
            Some(ALICE),
            Some(json!({ "evaluationId": evaluation["id"] })),
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["detailedFeedback"], "A thorough narrative from the mock.");
    assert_eq!(body["alreadyGenerated"], false);

    assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
    assert!(
        mock.auth_headers
            .lock()
            .expect("mock lock")
            .iter()
            .all(|value| value == "secret-key")
    );
}
