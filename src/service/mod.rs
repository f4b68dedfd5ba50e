pub mod entitlement;
pub mod evaluations;
pub mod feedback;
pub mod orchestrator;
pub mod payments;
pub mod subscription;
pub mod tasks;

use std::sync::Arc;

use crate::{
    ai_provider::StructuredProvider,
    evaluation::{AiEvaluationClient, DetailedFeedbackGenerator, EntropySelection, SelectionSource},
    store::RecordStore,
};

pub use entitlement::{EntitlementResolver, EvaluationView};
pub use evaluations::EvaluationQueries;
pub use feedback::{FeedbackOutcome, FeedbackService};
pub use orchestrator::EvaluationStateMachine;
pub use payments::PaymentService;
pub use subscription::{SubscriptionService, SubscriptionStatus};
pub use tasks::{TaskLimits, TaskService};

/// Every service wired over one store and one provider.
pub struct Services {
    pub tasks: TaskService,
    pub evaluations: EvaluationQueries,
    pub orchestrator: EvaluationStateMachine,
    pub feedback: FeedbackService,
    pub payments: PaymentService,
    pub subscription: SubscriptionService,
}

impl Services {
    pub fn new(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn StructuredProvider>,
        limits: TaskLimits,
    ) -> Self {
        Self::with_selection(store, provider, limits, Arc::new(EntropySelection))
    }

    pub fn with_selection(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn StructuredProvider>,
        limits: TaskLimits,
        selection: Arc<dyn SelectionSource>,
    ) -> Self {
        let client = Arc::new(AiEvaluationClient::with_selection(
            provider.clone(),
            selection,
        ));
        let generator = Arc::new(DetailedFeedbackGenerator::new(provider));
        Self {
            tasks: TaskService::new(store.clone(), limits),
            evaluations: EvaluationQueries::new(store.clone()),
            orchestrator: EvaluationStateMachine::new(store.clone(), client),
            feedback: FeedbackService::new(store.clone(), generator),
            payments: PaymentService::new(store.clone()),
            subscription: SubscriptionService::new(store),
        }
    }
}
