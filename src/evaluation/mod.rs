pub mod client;
pub mod feedback;
pub mod heuristic;
pub mod prompts;
pub mod types;

pub use client::AiEvaluationClient;
pub use feedback::DetailedFeedbackGenerator;
pub use heuristic::{EntropySelection, SeededSelection, SelectionSource, heuristic_evaluate};
pub use types::{EvaluationInput, EvaluationResult, EvaluationSource, FeedbackInput};
