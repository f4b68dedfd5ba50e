use serde::{Deserialize, Serialize};

/// What the evaluator sees of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationInput {
    pub code: String,
    pub language: Option<String>,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSource {
    Provider,
    Heuristic,
}

impl EvaluationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationSource::Provider => "provider",
            EvaluationSource::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Always within `0..=100`.
    pub score: u8,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    /// Only the heuristic fills this; it is never persisted.
    pub narrative: Option<String>,
    pub source: EvaluationSource,
}

/// Grounding for the long-form narrative: the task plus the stored scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackInput {
    pub code: String,
    pub language: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub score: u8,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}
