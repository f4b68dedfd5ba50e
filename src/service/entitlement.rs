use serde::Serialize;

use crate::types::{Evaluation, EvaluationId, TaskId, User, UserId};

/// Client-facing evaluation. The only constructor is
/// [`EntitlementResolver::view`], so a narrative can reach a response only
/// after the entitlement check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationView {
    id: EvaluationId,
    task_id: TaskId,
    user_id: UserId,
    score: Option<u8>,
    strengths: Option<Vec<String>>,
    improvements: Option<Vec<String>>,
    detailed_feedback: Option<String>,
    is_premium_unlocked: bool,
    created_at: String,
}

impl EvaluationView {
    pub fn id(&self) -> EvaluationId {
        self.id
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn score(&self) -> Option<u8> {
        self.score
    }

    pub fn strengths(&self) -> &[String] {
        self.strengths.as_deref().unwrap_or_default()
    }

    pub fn improvements(&self) -> &[String] {
        self.improvements.as_deref().unwrap_or_default()
    }

    pub fn detailed_feedback(&self) -> Option<&str> {
        self.detailed_feedback.as_deref()
    }

    pub fn is_premium_unlocked(&self) -> bool {
        self.is_premium_unlocked
    }
}

pub struct EntitlementResolver;

impl EntitlementResolver {
    pub fn can_view_detailed_feedback(user: &User, evaluation: &Evaluation) -> bool {
        user.is_premium || evaluation.is_premium_unlocked
    }

    pub fn view(user: &User, evaluation: Evaluation) -> EvaluationView {
        let entitled = Self::can_view_detailed_feedback(user, &evaluation);
        if !entitled && evaluation.detailed_feedback.is_some() {
            tracing::debug!(
                target: "entitlement",
                evaluation_id = evaluation.id,
                "detailed_feedback_redacted"
            );
        }
        EvaluationView {
            id: evaluation.id,
            task_id: evaluation.task_id,
            user_id: evaluation.owner_id,
            score: evaluation.score,
            strengths: evaluation.strengths,
            improvements: evaluation.improvements,
            detailed_feedback: evaluation.detailed_feedback.filter(|_| entitled),
            is_premium_unlocked: evaluation.is_premium_unlocked,
            created_at: evaluation.created_at,
        }
    }

    pub fn view_all(user: &User, evaluations: Vec<Evaluation>) -> Vec<EvaluationView> {
        evaluations
            .into_iter()
            .map(|evaluation| Self::view(user, evaluation))
            .collect()
    }
}
