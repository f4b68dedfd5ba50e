use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    error::ServiceError,
    http::{
        AppState,
        auth::CurrentUser,
        error::{body_id, json_body, json_error, parse_path_id, query_params},
    },
    service::{
        evaluations::ListEvaluationsQuery,
        payments::{CreatePaymentRequest, UpdatePaymentRequest},
        tasks::{CreateTaskRequest, ListTasksQuery, UpdateTaskRequest},
    },
};

type ApiResult = Result<Response, ServiceError>;

fn ok<T: serde::Serialize>(status: StatusCode, body: T) -> ApiResult {
    Ok((status, Json(body)).into_response())
}

pub(crate) async fn handle_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not found", "NOT_FOUND")
}

/// GET /health
pub(crate) async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}

/// POST /api/tasks
pub(crate) async fn handle_create_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult {
    let task = state.services.tasks.create(&user, json_body(payload)?).await?;
    ok(StatusCode::CREATED, task)
}

/// GET /api/tasks
pub(crate) async fn handle_list_tasks(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> ApiResult {
    let tasks = state.services.tasks.list(&user, &query_params(query)?).await?;
    ok(StatusCode::OK, tasks)
}

/// GET /api/tasks/{id}
pub(crate) async fn handle_get_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult {
    let detail = state.services.tasks.get(&user, parse_path_id(&id)?).await?;
    ok(StatusCode::OK, detail)
}

/// PUT /api/tasks/{id}
pub(crate) async fn handle_update_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult {
    let task_id = parse_path_id(&id)?;
    let task = state
        .services
        .tasks
        .update(&user, task_id, json_body(payload)?)
        .await?;
    ok(StatusCode::OK, task)
}

/// DELETE /api/tasks/{id}
pub(crate) async fn handle_delete_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult {
    let task = state
        .services
        .tasks
        .delete(&user, parse_path_id(&id)?)
        .await?;
    ok(
        StatusCode::OK,
        json!({"message": "Task deleted successfully", "task": task}),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluateRequest {
    task_id: Option<Value>,
}

/// POST /api/ai/evaluate
pub(crate) async fn handle_evaluate(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_body(payload)?;
    let task_id = body_id(request.task_id.as_ref(), "taskId")?;
    let evaluation = state
        .services
        .orchestrator
        .request_evaluation(&user, task_id)
        .await?;
    ok(StatusCode::CREATED, evaluation)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedbackRequest {
    evaluation_id: Option<Value>,
}

/// POST /api/ai/feedback
pub(crate) async fn handle_feedback(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_body(payload)?;
    let evaluation_id = body_id(request.evaluation_id.as_ref(), "evaluationId")?;
    let outcome = state
        .services
        .feedback
        .request_detailed_feedback(&user, evaluation_id)
        .await?;
    ok(StatusCode::OK, outcome)
}

/// GET /api/evaluations
pub(crate) async fn handle_list_evaluations(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<ListEvaluationsQuery>, QueryRejection>,
) -> ApiResult {
    let evaluations = state
        .services
        .evaluations
        .list(&user, &query_params(query)?)
        .await?;
    ok(StatusCode::OK, evaluations)
}

/// GET /api/evaluations/{id}
pub(crate) async fn handle_get_evaluation(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult {
    let evaluation = state
        .services
        .evaluations
        .get(&user, parse_path_id(&id)?)
        .await?;
    ok(StatusCode::OK, evaluation)
}

/// POST /api/payments
pub(crate) async fn handle_create_payment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> ApiResult {
    let payment = state
        .services
        .payments
        .create(&user, json_body(payload)?)
        .await?;
    ok(StatusCode::CREATED, payment)
}

/// GET /api/payments/{id}
pub(crate) async fn handle_get_payment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult {
    let payment = state
        .services
        .payments
        .get(&user, parse_path_id(&id)?)
        .await?;
    ok(StatusCode::OK, payment)
}

/// PATCH /api/payments/{id}
pub(crate) async fn handle_update_payment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePaymentRequest>, JsonRejection>,
) -> ApiResult {
    let payment_id = parse_path_id(&id)?;
    let payment = state
        .services
        .payments
        .update(&user, payment_id, json_body(payload)?)
        .await?;
    ok(StatusCode::OK, payment)
}

/// GET /api/subscription/status
pub(crate) async fn handle_subscription_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult {
    let status = state.services.subscription.status(&user).await?;
    ok(StatusCode::OK, status)
}

/// POST /api/subscription/activate
pub(crate) async fn handle_activate_subscription(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult {
    let status = state.services.subscription.activate(&user).await?;
    ok(StatusCode::OK, status)
}
