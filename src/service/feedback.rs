use std::sync::Arc;

use serde::Serialize;

use crate::{
    error::{ServiceError, not_found, premium_required},
    evaluation::{DetailedFeedbackGenerator, FeedbackInput},
    service::entitlement::EntitlementResolver,
    store::RecordStore,
    types::{EvaluationId, User},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackOutcome {
    pub detailed_feedback: String,
    pub already_generated: bool,
}

/// Generates the narrative for an evaluation at most once per evaluation.
pub struct FeedbackService {
    store: Arc<dyn RecordStore>,
    generator: Arc<DetailedFeedbackGenerator>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn RecordStore>, generator: Arc<DetailedFeedbackGenerator>) -> Self {
        Self { store, generator }
    }

    pub async fn request_detailed_feedback(
        &self,
        user: &User,
        evaluation_id: EvaluationId,
    ) -> Result<FeedbackOutcome, ServiceError> {
        let evaluation = self
            .store
            .get_evaluation(&user.id, evaluation_id)
            .await?
            .ok_or_else(|| not_found("Evaluation not found"))?;

        if !EntitlementResolver::can_view_detailed_feedback(user, &evaluation) {
            return Err(premium_required(
                "Premium subscription required to generate detailed feedback",
            ));
        }

        if let Some(existing) = evaluation.detailed_feedback {
            return Ok(FeedbackOutcome {
                detailed_feedback: existing,
                already_generated: true,
            });
        }

        let task = self
            .store
            .get_task(&user.id, evaluation.task_id)
            .await?
            .ok_or_else(|| not_found("Task not found"))?;

        let generated = self
            .generator
            .generate_detailed_feedback(&FeedbackInput {
                code: task.code_content,
                language: task.language,
                title: task.title,
                description: task.description,
                score: evaluation.score.unwrap_or(0),
                strengths: evaluation.strengths.unwrap_or_default(),
                improvements: evaluation.improvements.unwrap_or_default(),
            })
            .await;

        let write = self
            .store
            .set_detailed_feedback_if_absent(&user.id, evaluation_id, &generated)
            .await?;
        // The store keeps the first write; a concurrent request may have won.
        let already_generated = !write.written;
        let detailed_feedback = write.evaluation.detailed_feedback.unwrap_or(generated);
        tracing::info!(
            target: "feedback",
            evaluation_id = evaluation_id,
            already_generated = already_generated,
            "detailed_feedback_stored"
        );
        Ok(FeedbackOutcome {
            detailed_feedback,
            already_generated,
        })
    }
}
