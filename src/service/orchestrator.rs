use std::sync::Arc;

use crate::{
    error::{ServiceError, conflict, not_found},
    evaluation::{AiEvaluationClient, EvaluationInput},
    service::entitlement::{EntitlementResolver, EvaluationView},
    store::{RecordStore, StoreError},
    types::{NewEvaluation, Task, TaskId, TaskStatus, User},
};

/// Drives a task from `pending` to `completed` (or `failed`) and enforces
/// one evaluation per task.
pub struct EvaluationStateMachine {
    store: Arc<dyn RecordStore>,
    client: Arc<AiEvaluationClient>,
}

impl EvaluationStateMachine {
    pub fn new(store: Arc<dyn RecordStore>, client: Arc<AiEvaluationClient>) -> Self {
        Self { store, client }
    }

    pub async fn request_evaluation(
        &self,
        user: &User,
        task_id: TaskId,
    ) -> Result<EvaluationView, ServiceError> {
        let task = self
            .store
            .get_task(&user.id, task_id)
            .await?
            .ok_or_else(|| not_found("Task not found"))?;

        if self
            .store
            .find_evaluation_by_task(&user.id, task_id)
            .await?
            .is_some()
        {
            return Err(conflict("Evaluation already exists for this task"));
        }

        self.mark_evaluating(&task).await;

        let input = EvaluationInput {
            code: task.code_content.clone(),
            language: task.language.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
        };
        // The heuristic narrative is a diagnostic only; scoring never stores one.
        let result = self.client.evaluate(&input).await;

        let inserted = self
            .store
            .insert_evaluation(NewEvaluation {
                task_id,
                owner_id: user.id.clone(),
                score: result.score,
                strengths: result.strengths,
                improvements: result.improvements,
            })
            .await;
        let evaluation = match inserted {
            Ok(evaluation) => evaluation,
            Err(err @ StoreError::UniqueViolation { .. }) => {
                tracing::info!(
                    target: "orchestrator",
                    task_id = task_id,
                    error = %err,
                    "evaluation_lost_insert_race"
                );
                return Err(conflict("Evaluation already exists for this task"));
            }
            Err(err) => return Err(self.fail(&task, err.into()).await),
        };

        if let Err(err) = self
            .store
            .set_task_status(&user.id, task_id, TaskStatus::Completed)
            .await
        {
            return Err(self.fail(&task, err.into()).await);
        }

        tracing::info!(
            target: "orchestrator",
            task_id = task_id,
            evaluation_id = evaluation.id,
            score = result.score,
            source = result.source.as_str(),
            "task_evaluation_completed"
        );
        Ok(EntitlementResolver::view(user, evaluation))
    }

    async fn mark_evaluating(&self, task: &Task) {
        if !task.status.can_transition_to(TaskStatus::Evaluating) {
            return;
        }
        match self
            .store
            .set_task_status(&task.owner_id, task.id, TaskStatus::Evaluating)
            .await
        {
            Ok(_) => {}
            // Another request moved the task on since it was read.
            Err(err @ StoreError::InvalidTransition { .. }) => tracing::info!(
                target: "orchestrator",
                task_id = task.id,
                error = %err,
                "task_mark_evaluating_skipped"
            ),
            Err(err) => tracing::warn!(
                target: "orchestrator",
                task_id = task.id,
                error = %err,
                "task_mark_evaluating_failed"
            ),
        }
    }

    /// Best-effort `failed` write; always hands back the original error.
    async fn fail(&self, task: &Task, err: ServiceError) -> ServiceError {
        tracing::error!(
            target: "orchestrator",
            task_id = task.id,
            error = %err,
            "task_evaluation_failed"
        );
        if let Err(status_err) = self
            .store
            .set_task_status(&task.owner_id, task.id, TaskStatus::Failed)
            .await
        {
            tracing::warn!(
                target: "orchestrator",
                task_id = task.id,
                error = %status_err,
                "task_mark_failed_failed"
            );
        }
        err
    }
}
