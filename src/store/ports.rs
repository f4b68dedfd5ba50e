use async_trait::async_trait;

use crate::{
    store::error::StoreError,
    types::{
        Evaluation, EvaluationFilter, EvaluationId, NewEvaluation, NewPayment, NewTask, Payment,
        PaymentId, PaymentStatus, Task, TaskFilter, TaskId, TaskPatch, TaskStatus, User,
    },
};

/// Result of a payment update. `unlocked_evaluation` is set when the update
/// moved the payment to `completed` and the referenced evaluation was unlocked
/// in the same write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub payment: Payment,
    pub unlocked_evaluation: Option<Evaluation>,
}

/// Result of a set-if-absent narrative write. `written` is true only for the
/// call that stored the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeWrite {
    pub evaluation: Evaluation,
    pub written: bool,
}

/// Persistent record store.
///
/// Every task, evaluation and payment query takes the owning user id and only
/// matches records owned by that user; a record owned by someone else behaves
/// exactly like a missing one.
///
/// Implementations must enforce uniqueness of `Evaluation.task_id` on insert
/// and return [`StoreError::UniqueViolation`] on a duplicate.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // users and sessions

    async fn upsert_user(&self, user: User) -> Result<User, StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    async fn put_session(&self, token: &str, user_id: &str) -> Result<(), StoreError>;

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// Sets `is_premium` and, on first activation, `premium_since`.
    async fn activate_subscription(&self, user_id: &str, since: &str)
    -> Result<User, StoreError>;

    // tasks

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError>;

    async fn get_task(&self, owner_id: &str, task_id: TaskId) -> Result<Option<Task>, StoreError>;

    async fn list_tasks(&self, owner_id: &str, filter: &TaskFilter)
    -> Result<Vec<Task>, StoreError>;

    async fn update_task(
        &self,
        owner_id: &str,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Task, StoreError>;

    /// Compare-and-set on the current status: fails with
    /// [`StoreError::InvalidTransition`] unless the stored status may move to
    /// `status`.
    async fn set_task_status(
        &self,
        owner_id: &str,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, StoreError>;

    /// Deletes the task together with its evaluation and the payments
    /// referencing that evaluation.
    async fn delete_task(&self, owner_id: &str, task_id: TaskId) -> Result<Task, StoreError>;

    // evaluations

    async fn insert_evaluation(&self, evaluation: NewEvaluation)
    -> Result<Evaluation, StoreError>;

    async fn get_evaluation(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
    ) -> Result<Option<Evaluation>, StoreError>;

    async fn find_evaluation_by_task(
        &self,
        owner_id: &str,
        task_id: TaskId,
    ) -> Result<Option<Evaluation>, StoreError>;

    async fn list_evaluations(
        &self,
        owner_id: &str,
        filter: &EvaluationFilter,
    ) -> Result<Vec<Evaluation>, StoreError>;

    /// Writes the narrative only when none is stored yet and returns the
    /// record as stored after the call.
    async fn set_detailed_feedback_if_absent(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
        detailed_feedback: &str,
    ) -> Result<NarrativeWrite, StoreError>;

    async fn set_premium_unlocked(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
    ) -> Result<Evaluation, StoreError>;

    // payments

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StoreError>;

    async fn get_payment(
        &self,
        owner_id: &str,
        payment_id: PaymentId,
    ) -> Result<Option<Payment>, StoreError>;

    /// Applies a status and/or external reference change. The transition is
    /// checked against the stored status under the same write
    /// ([`StoreError::InvalidTransition`]); repeating the stored status is a
    /// no-op. Moving to `completed` also unlocks the referenced evaluation in
    /// the same write.
    async fn update_payment(
        &self,
        owner_id: &str,
        payment_id: PaymentId,
        status: Option<PaymentStatus>,
        external_payment_ref: Option<String>,
    ) -> Result<PaymentUpdate, StoreError>;
}
