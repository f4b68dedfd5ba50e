use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub type UserId = String;
pub type TaskId = u64;
pub type EvaluationId = u64;
pub type PaymentId = u64;

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Evaluating,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Evaluating,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Evaluating => "evaluating",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == raw.trim())
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// `pending -> completed` and `failed -> completed` are legal because the
    /// intermediate `evaluating` write is best effort.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            TaskStatus::Pending | TaskStatus::Failed => true,
            TaskStatus::Evaluating => {
                matches!(next, TaskStatus::Completed | TaskStatus::Failed)
            }
            TaskStatus::Completed => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub code_content: String,
    pub language: Option<String>,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub code_content: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub code_content: Option<String>,
    pub language: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.code_content.is_none()
            && self.language.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub limit: usize,
    pub offset: usize,
}

/// Stored evaluation record. Client-facing output goes through
/// [`crate::service::entitlement::EvaluationView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: EvaluationId,
    pub task_id: TaskId,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    pub score: Option<u8>,
    pub strengths: Option<Vec<String>>,
    pub improvements: Option<Vec<String>>,
    pub detailed_feedback: Option<String>,
    pub is_premium_unlocked: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvaluation {
    pub task_id: TaskId,
    pub owner_id: UserId,
    pub score: u8,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationFilter {
    pub task_id: Option<TaskId>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (
                PaymentStatus::Pending,
                PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Refunded
            ) | (PaymentStatus::Completed, PaymentStatus::Refunded)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    pub evaluation_id: EvaluationId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub external_payment_ref: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub owner_id: UserId,
    pub evaluation_id: EvaluationId,
    pub amount: Decimal,
    pub currency: String,
    pub external_payment_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub premium_since: Option<String>,
}
