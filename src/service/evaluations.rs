use std::sync::Arc;

use serde::Deserialize;

use crate::{
    error::{ServiceError, not_found, validation},
    service::{
        entitlement::{EntitlementResolver, EvaluationView},
        tasks::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT, parse_paging},
    },
    store::RecordStore,
    types::{EvaluationFilter, EvaluationId, User},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEvaluationsQuery {
    pub task_id: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Read paths for evaluations; every result passes through the resolver.
pub struct EvaluationQueries {
    store: Arc<dyn RecordStore>,
}

impl EvaluationQueries {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn get(
        &self,
        user: &User,
        evaluation_id: EvaluationId,
    ) -> Result<EvaluationView, ServiceError> {
        let evaluation = self
            .store
            .get_evaluation(&user.id, evaluation_id)
            .await?
            .ok_or_else(|| not_found("Evaluation not found"))?;
        Ok(EntitlementResolver::view(user, evaluation))
    }

    pub async fn list(
        &self,
        user: &User,
        query: &ListEvaluationsQuery,
    ) -> Result<Vec<EvaluationView>, ServiceError> {
        let task_id = match query.task_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                raw.parse()
                    .map_err(|_| validation("taskId must be a valid integer"))?,
            ),
            _ => None,
        };
        let filter = EvaluationFilter {
            task_id,
            limit: parse_paging(query.limit.as_deref(), DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT),
            offset: parse_paging(query.offset.as_deref(), 0, usize::MAX),
        };
        let evaluations = self.store.list_evaluations(&user.id, &filter).await?;
        Ok(EntitlementResolver::view_all(user, evaluations))
    }
}
