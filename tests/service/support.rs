use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Barrier;

use codecritic::{
    ai_provider::{NullProvider, ProviderError, StructuredProvider, StructuredRequest},
    evaluation::SeededSelection,
    service::{EvaluationView, Services, TaskLimits, tasks::CreateTaskRequest},
    store::{NarrativeWrite, PaymentUpdate, RecordStore, StoreError, TableStore},
    types::{
        Evaluation, EvaluationFilter, EvaluationId, NewEvaluation, NewPayment, NewTask, Payment,
        PaymentId, PaymentStatus, Task, TaskFilter, TaskId, TaskPatch, TaskStatus, User,
    },
};

/// Holds the next two callers until both have arrived, so their reads see
/// the same state. Idle until armed.
pub struct RaceGate {
    barrier: Barrier,
    remaining: AtomicUsize,
}

impl Default for RaceGate {
    fn default() -> Self {
        Self {
            barrier: Barrier::new(2),
            remaining: AtomicUsize::new(0),
        }
    }
}

impl RaceGate {
    pub fn arm(&self) {
        self.remaining.store(2, Ordering::SeqCst);
    }

    async fn pass(&self) {
        let armed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if armed {
            self.barrier.wait().await;
        }
    }
}

/// [`TableStore`] wrapper with switchable faults.
#[derive(Default)]
pub struct FaultyStore {
    inner: TableStore,
    pub fail_insert_evaluation: AtomicBool,
    pub fail_completed_status: AtomicBool,
    pub fail_unlock: AtomicBool,
    /// Number of upcoming evaluation reads that report the unlock flag as
    /// unset.
    pub stale_unlock_reads: AtomicUsize,
    pub unlock_calls: AtomicUsize,
    /// Applied after the evaluation-by-task lookup.
    pub evaluation_lookup_gate: RaceGate,
    /// Applied after the payment lookup.
    pub payment_lookup_gate: RaceGate,
}

fn injected(what: &str) -> StoreError {
    StoreError::Backend(format!("injected {what} failure"))
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn upsert_user(&self, user: User) -> Result<User, StoreError> {
        self.inner.upsert_user(user).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        self.inner.get_user(user_id).await
    }

    async fn put_session(&self, token: &str, user_id: &str) -> Result<(), StoreError> {
        self.inner.put_session(token, user_id).await
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_token(token).await
    }

    async fn activate_subscription(&self, user_id: &str, since: &str) -> Result<User, StoreError> {
        self.inner.activate_subscription(user_id, since).await
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.inner.insert_task(task).await
    }

    async fn get_task(&self, owner_id: &str, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        self.inner.get_task(owner_id, task_id).await
    }

    async fn list_tasks(
        &self,
        owner_id: &str,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, StoreError> {
        self.inner.list_tasks(owner_id, filter).await
    }

    async fn update_task(
        &self,
        owner_id: &str,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Task, StoreError> {
        self.inner.update_task(owner_id, task_id, patch).await
    }

    async fn set_task_status(
        &self,
        owner_id: &str,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, StoreError> {
        if status == TaskStatus::Completed && self.fail_completed_status.load(Ordering::SeqCst) {
            return Err(injected("status"));
        }
        self.inner.set_task_status(owner_id, task_id, status).await
    }

    async fn delete_task(&self, owner_id: &str, task_id: TaskId) -> Result<Task, StoreError> {
        self.inner.delete_task(owner_id, task_id).await
    }

    async fn insert_evaluation(&self, evaluation: NewEvaluation) -> Result<Evaluation, StoreError> {
        if self.fail_insert_evaluation.load(Ordering::SeqCst) {
            return Err(injected("insert"));
        }
        self.inner.insert_evaluation(evaluation).await
    }

    async fn get_evaluation(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
    ) -> Result<Option<Evaluation>, StoreError> {
        let evaluation = self.inner.get_evaluation(owner_id, evaluation_id).await?;
        let stale = self
            .stale_unlock_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        Ok(evaluation.map(|mut evaluation| {
            if stale {
                evaluation.is_premium_unlocked = false;
            }
            evaluation
        }))
    }

    async fn find_evaluation_by_task(
        &self,
        owner_id: &str,
        task_id: TaskId,
    ) -> Result<Option<Evaluation>, StoreError> {
        let found = self.inner.find_evaluation_by_task(owner_id, task_id).await;
        self.evaluation_lookup_gate.pass().await;
        found
    }

    async fn list_evaluations(
        &self,
        owner_id: &str,
        filter: &EvaluationFilter,
    ) -> Result<Vec<Evaluation>, StoreError> {
        self.inner.list_evaluations(owner_id, filter).await
    }

    async fn set_detailed_feedback_if_absent(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
        detailed_feedback: &str,
    ) -> Result<NarrativeWrite, StoreError> {
        self.inner
            .set_detailed_feedback_if_absent(owner_id, evaluation_id, detailed_feedback)
            .await
    }

    async fn set_premium_unlocked(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
    ) -> Result<Evaluation, StoreError> {
        self.unlock_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_unlock.load(Ordering::SeqCst) {
            return Err(injected("unlock"));
        }
        self.inner.set_premium_unlocked(owner_id, evaluation_id).await
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StoreError> {
        self.inner.insert_payment(payment).await
    }

    async fn get_payment(
        &self,
        owner_id: &str,
        payment_id: PaymentId,
    ) -> Result<Option<Payment>, StoreError> {
        let found = self.inner.get_payment(owner_id, payment_id).await;
        self.payment_lookup_gate.pass().await;
        found
    }

    async fn update_payment(
        &self,
        owner_id: &str,
        payment_id: PaymentId,
        status: Option<PaymentStatus>,
        external_payment_ref: Option<String>,
    ) -> Result<PaymentUpdate, StoreError> {
        self.inner
            .update_payment(owner_id, payment_id, status, external_payment_ref)
            .await
    }
}

/// Provider that always answers with the same JSON value.
pub struct FixedProvider {
    pub answer: Value,
    pub calls: AtomicUsize,
}

impl FixedProvider {
    pub fn new(answer: Value) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl StructuredProvider for FixedProvider {
    fn provider_id(&self) -> &str {
        "fixed"
    }

    async fn generate_json(&self, _request: StructuredRequest) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

pub struct Harness {
    pub store: Arc<FaultyStore>,
    pub services: Services,
}

impl Harness {
    pub fn offline() -> Self {
        Self::with_provider(Arc::new(NullProvider))
    }

    pub fn with_provider(provider: Arc<dyn StructuredProvider>) -> Self {
        let store = Arc::new(FaultyStore::default());
        let services = Services::with_selection(
            store.clone(),
            provider,
            TaskLimits::default(),
            Arc::new(SeededSelection::new(42)),
        );
        Self { store, services }
    }

    pub async fn user(&self, id: &str) -> User {
        self.store
            .upsert_user(User {
                id: id.to_string(),
                name: id.to_string(),
                email: format!("{id}@example.com"),
                is_premium: false,
                premium_since: None,
            })
            .await
            .expect("user should be stored")
    }

    /// Current user record, as an authenticated request would see it.
    pub async fn reload(&self, user: &User) -> User {
        self.store
            .get_user(&user.id)
            .await
            .expect("user read")
            .expect("user exists")
    }

    pub async fn task(&self, user: &User, code: &str, language: &str) -> Task {
        let request: CreateTaskRequest = serde_json::from_value(json!({
            "title": "Greeting",
            "codeContent": code,
            "language": language
        }))
        .expect("request should deserialize");
        self.services
            .tasks
            .create(user, request)
            .await
            .expect("task should be created")
    }

    pub async fn evaluated_task(&self, user: &User) -> (Task, EvaluationView) {
        let task = self.task(user, "print('hi')", "python").await;
        let view = self
            .services
            .orchestrator
            .request_evaluation(user, task.id)
            .await
            .expect("evaluation should succeed");
        (task, view)
    }
}
