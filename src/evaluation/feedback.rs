use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::{
    ai_provider::{ProviderErrorKind, StructuredProvider, StructuredRequest},
    evaluation::{
        heuristic::CodeSignals,
        prompts::{feedback_prompt, feedback_schema},
        types::FeedbackInput,
    },
};

/// Produces the long-form narrative for an evaluation. Never fails: a missing
/// provider, a provider error, or a blank answer all yield the synthesized
/// narrative.
pub struct DetailedFeedbackGenerator {
    provider: Arc<dyn StructuredProvider>,
}

impl DetailedFeedbackGenerator {
    pub fn new(provider: Arc<dyn StructuredProvider>) -> Self {
        Self { provider }
    }

    pub async fn generate_detailed_feedback(&self, input: &FeedbackInput) -> String {
        let request = StructuredRequest {
            request_id: Uuid::now_v7().to_string(),
            prompt: feedback_prompt(input),
            schema: feedback_schema(),
        };
        let request_id = request.request_id.clone();

        match self.provider.generate_json(request).await {
            Ok(value) => {
                let narrative = value
                    .get("detailedFeedback")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|narrative| !narrative.is_empty());
                if let Some(narrative) = narrative {
                    tracing::info!(
                        target: "evaluation",
                        request_id = %request_id,
                        provider_id = %self.provider.provider_id(),
                        chars = narrative.chars().count(),
                        "detailed_feedback_generated"
                    );
                    return narrative.to_string();
                }
                tracing::warn!(
                    target: "evaluation",
                    request_id = %request_id,
                    provider_id = %self.provider.provider_id(),
                    "detailed_feedback_blank_using_synthesis"
                );
            }
            Err(err) if err.kind == ProviderErrorKind::Unconfigured => {
                tracing::debug!(
                    target: "evaluation",
                    request_id = %request_id,
                    "detailed_feedback_using_synthesis_no_provider"
                );
            }
            Err(err) => {
                tracing::warn!(
                    target: "evaluation",
                    request_id = %request_id,
                    provider_id = %self.provider.provider_id(),
                    error_kind = err.kind.as_str(),
                    error = %err,
                    "detailed_feedback_provider_failed_using_synthesis"
                );
            }
        }

        synthesize_feedback(input)
    }
}

/// Deterministic five-paragraph narrative built from the stored scoring.
pub fn synthesize_feedback(input: &FeedbackInput) -> String {
    let signals = CodeSignals::detect(&input.code);
    let score = input.score;
    let strength = |idx: usize, fallback: &'static str| {
        input
            .strengths
            .get(idx)
            .map(String::as_str)
            .unwrap_or(fallback)
    };
    let improvement = |idx: usize, fallback: &'static str| {
        input
            .improvements
            .get(idx)
            .map(String::as_str)
            .unwrap_or(fallback)
    };

    let fundamentals = match score {
        80.. => "strong",
        70..=79 => "good",
        _ => "reasonable",
    };
    let documentation = if signals.has_comments {
        "the inclusion of comments demonstrates good documentation practices, which significantly improves code maintainability for future developers"
    } else {
        "adding comments would greatly improve code readability and help other developers (including your future self) understand the logic and decision-making process"
    };
    let robustness = if signals.has_error_handling {
        "The error handling shows attention to robustness and production-ready thinking, which is essential for reliable applications"
    } else {
        "Implementing comprehensive error handling would make the code more robust and production-ready"
    };
    let outlook = if score >= 80 {
        "this code is production-quality and shows professional-level understanding"
    } else {
        "with the suggested improvements, this code would reach production-quality standards"
    };

    let overall = format!(
        "Your {} implementation demonstrates {fundamentals} programming fundamentals with a score of {score}/100. {}. {}.",
        input.language.as_deref().unwrap_or("code"),
        strength(0, "The code shows understanding of core concepts"),
        strength(1, "The implementation follows logical patterns"),
    );
    let structure =
        format!("Looking at the code structure in detail, {documentation}. {robustness}.");
    let improvements = format!(
        "{}. This would improve readability and make the code easier to test and maintain. {}. \
         Specifically, validating data types, ranges, and edge cases before processing ensures your code handles real-world scenarios gracefully. {}.",
        improvement(0, "Consider refactoring complex logic into smaller functions"),
        improvement(1, "Adding input validation would prevent unexpected behavior"),
        improvement(2, "Consider performance optimizations for larger datasets"),
    );
    let perspective = format!(
        "From a broader perspective, {outlook}. Consider researching design patterns specific to {}, \
         practicing test-driven development to catch edge cases early, and reviewing code from open-source projects \
         to see how experienced developers structure similar functionality. These practices will accelerate your growth as a developer.",
        input.language.as_deref().unwrap_or("your language"),
    );
    let next_steps = "To take your code to the next level, focus on: implementing comprehensive unit tests \
         to verify functionality and catch regressions, optimizing for both time and space complexity where it matters, \
         and continuously refactoring to improve clarity without changing behavior. Remember that great code is not just \
         functional: it is maintainable, testable, and understandable by others.";

    [
        overall.as_str(),
        structure.as_str(),
        improvements.as_str(),
        perspective.as_str(),
        next_steps,
    ]
    .join("\n\n")
}
