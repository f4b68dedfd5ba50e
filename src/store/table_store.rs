use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    store::{
        error::StoreError,
        ports::{NarrativeWrite, PaymentUpdate, RecordStore},
        snapshot::TableSnapshot,
        tables::Tables,
    },
    types::{
        Evaluation, EvaluationFilter, EvaluationId, NewEvaluation, NewPayment, NewTask, Payment,
        PaymentId, PaymentStatus, Task, TaskFilter, TaskId, TaskPatch, TaskStatus, User,
    },
};

/// [`RecordStore`] over in-process tables guarded by a single lock.
///
/// In file mode every mutation is applied to a staged copy, written to the
/// snapshot file and only then published, so a failed write leaves both the
/// file and the visible tables untouched.
pub struct TableStore {
    tables: RwLock<Tables>,
    snapshot: Option<TableSnapshot>,
}

impl Default for TableStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TableStore {
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            snapshot: None,
        }
    }

    /// Opens the snapshot at `path`, starting empty when the file does not
    /// exist yet.
    pub fn open_file(path: PathBuf) -> Result<Self, StoreError> {
        let snapshot = TableSnapshot::new(path);
        let tables = snapshot.load()?.unwrap_or_default();
        tracing::info!(
            target: "store",
            path = %snapshot.path().display(),
            "store_snapshot_opened"
        );
        Ok(Self {
            tables: RwLock::new(tables),
            snapshot: Some(snapshot),
        })
    }

    pub fn is_durable(&self) -> bool {
        self.snapshot.is_some()
    }

    async fn read<T>(&self, op: impl FnOnce(&Tables) -> T + Send) -> T {
        let guard = self.tables.read().await;
        op(&guard)
    }

    async fn mutate<T: Send>(
        &self,
        op: impl FnOnce(&mut Tables) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let mut guard = self.tables.write().await;
        let Some(snapshot) = &self.snapshot else {
            return op(&mut guard);
        };

        let mut staged = guard.clone();
        let output = op(&mut staged)?;
        snapshot.save(&staged).inspect_err(|err| {
            tracing::error!(
                target: "store",
                path = %snapshot.path().display(),
                error = %err,
                "store_snapshot_save_failed"
            );
        })?;
        *guard = staged;
        Ok(output)
    }
}

#[async_trait]
impl RecordStore for TableStore {
    async fn upsert_user(&self, user: User) -> Result<User, StoreError> {
        self.mutate(|tables| Ok(tables.upsert_user(user))).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read(|tables| tables.get_user(user_id)).await)
    }

    async fn put_session(&self, token: &str, user_id: &str) -> Result<(), StoreError> {
        self.mutate(|tables| tables.put_session(token, user_id))
            .await
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read(|tables| tables.find_user_by_token(token)).await)
    }

    async fn activate_subscription(
        &self,
        user_id: &str,
        since: &str,
    ) -> Result<User, StoreError> {
        self.mutate(|tables| tables.activate_subscription(user_id, since))
            .await
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.mutate(|tables| Ok(tables.insert_task(task))).await
    }

    async fn get_task(&self, owner_id: &str, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.read(|tables| tables.get_task(owner_id, task_id)).await)
    }

    async fn list_tasks(
        &self,
        owner_id: &str,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, StoreError> {
        Ok(self.read(|tables| tables.list_tasks(owner_id, filter)).await)
    }

    async fn update_task(
        &self,
        owner_id: &str,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Task, StoreError> {
        self.mutate(|tables| tables.update_task(owner_id, task_id, patch))
            .await
    }

    async fn set_task_status(
        &self,
        owner_id: &str,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, StoreError> {
        self.mutate(|tables| tables.set_task_status(owner_id, task_id, status))
            .await
    }

    async fn delete_task(&self, owner_id: &str, task_id: TaskId) -> Result<Task, StoreError> {
        self.mutate(|tables| tables.delete_task(owner_id, task_id))
            .await
    }

    async fn insert_evaluation(
        &self,
        evaluation: NewEvaluation,
    ) -> Result<Evaluation, StoreError> {
        self.mutate(|tables| tables.insert_evaluation(evaluation))
            .await
    }

    async fn get_evaluation(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
    ) -> Result<Option<Evaluation>, StoreError> {
        Ok(self
            .read(|tables| tables.get_evaluation(owner_id, evaluation_id))
            .await)
    }

    async fn find_evaluation_by_task(
        &self,
        owner_id: &str,
        task_id: TaskId,
    ) -> Result<Option<Evaluation>, StoreError> {
        Ok(self
            .read(|tables| tables.find_evaluation_by_task(owner_id, task_id))
            .await)
    }

    async fn list_evaluations(
        &self,
        owner_id: &str,
        filter: &EvaluationFilter,
    ) -> Result<Vec<Evaluation>, StoreError> {
        Ok(self
            .read(|tables| tables.list_evaluations(owner_id, filter))
            .await)
    }

    async fn set_detailed_feedback_if_absent(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
        detailed_feedback: &str,
    ) -> Result<NarrativeWrite, StoreError> {
        self.mutate(|tables| {
            tables.set_detailed_feedback_if_absent(owner_id, evaluation_id, detailed_feedback)
        })
        .await
    }

    async fn set_premium_unlocked(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
    ) -> Result<Evaluation, StoreError> {
        self.mutate(|tables| tables.set_premium_unlocked(owner_id, evaluation_id))
            .await
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StoreError> {
        self.mutate(|tables| tables.insert_payment(payment)).await
    }

    async fn get_payment(
        &self,
        owner_id: &str,
        payment_id: PaymentId,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .read(|tables| tables.get_payment(owner_id, payment_id))
            .await)
    }

    async fn update_payment(
        &self,
        owner_id: &str,
        payment_id: PaymentId,
        status: Option<PaymentStatus>,
        external_payment_ref: Option<String>,
    ) -> Result<PaymentUpdate, StoreError> {
        self.mutate(|tables| {
            tables.update_payment(owner_id, payment_id, status, external_payment_ref)
        })
        .await
    }
}
