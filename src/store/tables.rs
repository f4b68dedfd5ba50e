use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    store::{
        error::StoreError,
        ports::{NarrativeWrite, PaymentUpdate},
    },
    types::{
        Evaluation, EvaluationFilter, EvaluationId, NewEvaluation, NewPayment, NewTask, Payment,
        PaymentId, PaymentStatus, Task, TaskFilter, TaskId, TaskPatch, TaskStatus, User, UserId,
        now_rfc3339,
    },
};

const TASKS: &str = "tasks";
const EVALUATIONS: &str = "evaluations";
const PAYMENTS: &str = "payments";
const USERS: &str = "users";

/// Row storage shared by the in-memory and file-backed stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    users: BTreeMap<UserId, User>,
    #[serde(default)]
    sessions: BTreeMap<String, UserId>,
    #[serde(default)]
    tasks: BTreeMap<TaskId, Task>,
    #[serde(default)]
    evaluations: BTreeMap<EvaluationId, Evaluation>,
    #[serde(default)]
    payments: BTreeMap<PaymentId, Payment>,
    #[serde(default)]
    next_task_id: TaskId,
    #[serde(default)]
    next_evaluation_id: EvaluationId,
    #[serde(default)]
    next_payment_id: PaymentId,
}

fn next_id(counter: &mut u64) -> u64 {
    *counter = counter.saturating_add(1);
    *counter
}

fn page<T: Clone>(rows: Vec<&T>, offset: usize, limit: usize) -> Vec<T> {
    rows.into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect()
}

impl Tables {
    pub(crate) fn upsert_user(&mut self, user: User) -> User {
        self.users.insert(user.id.clone(), user.clone());
        user
    }

    pub(crate) fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).cloned()
    }

    pub(crate) fn put_session(&mut self, token: &str, user_id: &str) -> Result<(), StoreError> {
        if !self.users.contains_key(user_id) {
            return Err(StoreError::not_found(USERS, user_id));
        }
        self.sessions
            .insert(token.to_string(), user_id.to_string());
        Ok(())
    }

    pub(crate) fn find_user_by_token(&self, token: &str) -> Option<User> {
        self.sessions
            .get(token)
            .and_then(|user_id| self.users.get(user_id))
            .cloned()
    }

    pub(crate) fn activate_subscription(
        &mut self,
        user_id: &str,
        since: &str,
    ) -> Result<User, StoreError> {
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::not_found(USERS, user_id))?;
        if !user.is_premium {
            user.is_premium = true;
            user.premium_since = Some(since.to_string());
        }
        Ok(user.clone())
    }

    pub(crate) fn insert_task(&mut self, new_task: NewTask) -> Task {
        let id = next_id(&mut self.next_task_id);
        let now = now_rfc3339();
        let task = Task {
            id,
            owner_id: new_task.owner_id,
            title: new_task.title,
            description: new_task.description,
            code_content: new_task.code_content,
            language: new_task.language,
            status: TaskStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        };
        self.tasks.insert(id, task.clone());
        task
    }

    pub(crate) fn get_task(&self, owner_id: &str, task_id: TaskId) -> Option<Task> {
        self.tasks
            .get(&task_id)
            .filter(|task| task.owner_id == owner_id)
            .cloned()
    }

    fn owned_task_mut(&mut self, owner_id: &str, task_id: TaskId) -> Result<&mut Task, StoreError> {
        self.tasks
            .get_mut(&task_id)
            .filter(|task| task.owner_id == owner_id)
            .ok_or_else(|| StoreError::not_found(TASKS, task_id))
    }

    pub(crate) fn list_tasks(&self, owner_id: &str, filter: &TaskFilter) -> Vec<Task> {
        let needle = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
            .map(str::to_lowercase);

        let rows = self
            .tasks
            .values()
            .rev()
            .filter(|task| task.owner_id == owner_id)
            .filter(|task| filter.status.is_none_or(|status| task.status == status))
            .filter(|task| {
                needle
                    .as_deref()
                    .is_none_or(|needle| task.title.to_lowercase().contains(needle))
            })
            .collect::<Vec<_>>();
        page(rows, filter.offset, filter.limit)
    }

    pub(crate) fn update_task(
        &mut self,
        owner_id: &str,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Task, StoreError> {
        let task = self.owned_task_mut(owner_id, task_id)?;
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = description.clone();
        }
        if let Some(code_content) = &patch.code_content {
            task.code_content = code_content.clone();
        }
        if let Some(language) = &patch.language {
            task.language = language.clone();
        }
        task.updated_at = now_rfc3339();
        Ok(task.clone())
    }

    pub(crate) fn set_task_status(
        &mut self,
        owner_id: &str,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, StoreError> {
        let task = self.owned_task_mut(owner_id, task_id)?;
        if !task.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                table: TASKS,
                key: task_id.to_string(),
                from: task.status.as_str(),
                to: status.as_str(),
            });
        }
        if task.status != status {
            task.status = status;
            task.updated_at = now_rfc3339();
        }
        Ok(task.clone())
    }

    pub(crate) fn delete_task(
        &mut self,
        owner_id: &str,
        task_id: TaskId,
    ) -> Result<Task, StoreError> {
        self.owned_task_mut(owner_id, task_id)?;
        let removed_evaluations = self
            .evaluations
            .values()
            .filter(|evaluation| evaluation.task_id == task_id)
            .map(|evaluation| evaluation.id)
            .collect::<Vec<_>>();
        self.payments
            .retain(|_, payment| !removed_evaluations.contains(&payment.evaluation_id));
        self.evaluations
            .retain(|_, evaluation| evaluation.task_id != task_id);
        self.tasks
            .remove(&task_id)
            .ok_or_else(|| StoreError::not_found(TASKS, task_id))
    }

    pub(crate) fn insert_evaluation(
        &mut self,
        new_evaluation: NewEvaluation,
    ) -> Result<Evaluation, StoreError> {
        if self
            .evaluations
            .values()
            .any(|evaluation| evaluation.task_id == new_evaluation.task_id)
        {
            return Err(StoreError::UniqueViolation {
                table: EVALUATIONS,
                key: format!("task_id={}", new_evaluation.task_id),
            });
        }
        self.get_task(&new_evaluation.owner_id, new_evaluation.task_id)
            .ok_or_else(|| StoreError::not_found(TASKS, new_evaluation.task_id))?;

        let id = next_id(&mut self.next_evaluation_id);
        let evaluation = Evaluation {
            id,
            task_id: new_evaluation.task_id,
            owner_id: new_evaluation.owner_id,
            score: Some(new_evaluation.score),
            strengths: Some(new_evaluation.strengths),
            improvements: Some(new_evaluation.improvements),
            detailed_feedback: None,
            is_premium_unlocked: false,
            created_at: now_rfc3339(),
        };
        self.evaluations.insert(id, evaluation.clone());
        Ok(evaluation)
    }

    pub(crate) fn get_evaluation(
        &self,
        owner_id: &str,
        evaluation_id: EvaluationId,
    ) -> Option<Evaluation> {
        self.evaluations
            .get(&evaluation_id)
            .filter(|evaluation| evaluation.owner_id == owner_id)
            .cloned()
    }

    fn owned_evaluation_mut(
        &mut self,
        owner_id: &str,
        evaluation_id: EvaluationId,
    ) -> Result<&mut Evaluation, StoreError> {
        self.evaluations
            .get_mut(&evaluation_id)
            .filter(|evaluation| evaluation.owner_id == owner_id)
            .ok_or_else(|| StoreError::not_found(EVALUATIONS, evaluation_id))
    }

    pub(crate) fn find_evaluation_by_task(
        &self,
        owner_id: &str,
        task_id: TaskId,
    ) -> Option<Evaluation> {
        self.evaluations
            .values()
            .find(|evaluation| evaluation.task_id == task_id && evaluation.owner_id == owner_id)
            .cloned()
    }

    pub(crate) fn list_evaluations(
        &self,
        owner_id: &str,
        filter: &EvaluationFilter,
    ) -> Vec<Evaluation> {
        let rows = self
            .evaluations
            .values()
            .rev()
            .filter(|evaluation| evaluation.owner_id == owner_id)
            .filter(|evaluation| filter.task_id.is_none_or(|task_id| evaluation.task_id == task_id))
            .collect::<Vec<_>>();
        page(rows, filter.offset, filter.limit)
    }

    pub(crate) fn set_detailed_feedback_if_absent(
        &mut self,
        owner_id: &str,
        evaluation_id: EvaluationId,
        detailed_feedback: &str,
    ) -> Result<NarrativeWrite, StoreError> {
        let evaluation = self.owned_evaluation_mut(owner_id, evaluation_id)?;
        let written = evaluation.detailed_feedback.is_none();
        if written {
            evaluation.detailed_feedback = Some(detailed_feedback.to_string());
        }
        Ok(NarrativeWrite {
            evaluation: evaluation.clone(),
            written,
        })
    }

    pub(crate) fn set_premium_unlocked(
        &mut self,
        owner_id: &str,
        evaluation_id: EvaluationId,
    ) -> Result<Evaluation, StoreError> {
        let evaluation = self.owned_evaluation_mut(owner_id, evaluation_id)?;
        evaluation.is_premium_unlocked = true;
        Ok(evaluation.clone())
    }

    pub(crate) fn insert_payment(
        &mut self,
        new_payment: NewPayment,
    ) -> Result<Payment, StoreError> {
        self.get_evaluation(&new_payment.owner_id, new_payment.evaluation_id)
            .ok_or_else(|| StoreError::not_found(EVALUATIONS, new_payment.evaluation_id))?;

        let id = next_id(&mut self.next_payment_id);
        let payment = Payment {
            id,
            owner_id: new_payment.owner_id,
            evaluation_id: new_payment.evaluation_id,
            amount: new_payment.amount,
            currency: new_payment.currency,
            status: PaymentStatus::Pending,
            external_payment_ref: new_payment.external_payment_ref,
            created_at: now_rfc3339(),
        };
        self.payments.insert(id, payment.clone());
        Ok(payment)
    }

    pub(crate) fn get_payment(&self, owner_id: &str, payment_id: PaymentId) -> Option<Payment> {
        self.payments
            .get(&payment_id)
            .filter(|payment| payment.owner_id == owner_id)
            .cloned()
    }

    pub(crate) fn update_payment(
        &mut self,
        owner_id: &str,
        payment_id: PaymentId,
        status: Option<PaymentStatus>,
        external_payment_ref: Option<String>,
    ) -> Result<PaymentUpdate, StoreError> {
        let current = self
            .get_payment(owner_id, payment_id)
            .ok_or_else(|| StoreError::not_found(PAYMENTS, payment_id))?;
        let evaluation_id = current.evaluation_id;

        if let Some(next) = status
            && !current.status.can_transition_to(next)
        {
            return Err(StoreError::InvalidTransition {
                table: PAYMENTS,
                key: payment_id.to_string(),
                from: current.status.as_str(),
                to: next.as_str(),
            });
        }
        let status = status.filter(|next| *next != current.status);

        let unlocked_evaluation = if status == Some(PaymentStatus::Completed) {
            Some(self.set_premium_unlocked(owner_id, evaluation_id)?)
        } else {
            None
        };

        let payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| StoreError::not_found(PAYMENTS, payment_id))?;
        if let Some(status) = status {
            payment.status = status;
        }
        if let Some(external_payment_ref) = external_payment_ref {
            payment.external_payment_ref = Some(external_payment_ref);
        }

        Ok(PaymentUpdate {
            payment: payment.clone(),
            unlocked_evaluation,
        })
    }
}
