use std::sync::Arc;

use serde_json::json;

use codecritic::{
    ai_provider::{NullProvider, ProviderErrorKind},
    evaluation::{DetailedFeedbackGenerator, feedback::synthesize_feedback},
};

use crate::{ScriptedProvider, feedback_input};

#[tokio::test]
async fn given_provider_narrative_when_generated_then_it_is_returned_trimmed() {
    let provider = ScriptedProvider::answering(json!({
        "detailedFeedback": "  A thorough review.\n\nSecond paragraph.  "
    }));
    let generator = DetailedFeedbackGenerator::new(provider.clone());

    let narrative = generator
        .generate_detailed_feedback(&feedback_input("const add = (a, b) => a + b;", 82))
        .await;
    assert_eq!(narrative, "A thorough review.\n\nSecond paragraph.");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn given_blank_narrative_when_generated_then_synthesis_is_used() {
    let input = feedback_input("const add = (a, b) => a + b;", 82);
    let provider = ScriptedProvider::answering(json!({ "detailedFeedback": "   " }));
    let generator = DetailedFeedbackGenerator::new(provider);

    let narrative = generator.generate_detailed_feedback(&input).await;
    assert_eq!(narrative, synthesize_feedback(&input));
}

#[tokio::test]
async fn given_provider_failure_or_no_provider_when_generated_then_synthesis_is_used() {
    let input = feedback_input("// sum\nconst add = (a, b) => a + b;", 64);
    let expected = synthesize_feedback(&input);

    let failing = DetailedFeedbackGenerator::new(ScriptedProvider::failing(
        ProviderErrorKind::Timeout,
    ));
    assert_eq!(failing.generate_detailed_feedback(&input).await, expected);

    let offline = DetailedFeedbackGenerator::new(Arc::new(NullProvider));
    assert_eq!(offline.generate_detailed_feedback(&input).await, expected);
}

#[test]
fn given_stored_scoring_when_synthesized_then_narrative_is_grounded_in_it() {
    let input = feedback_input("const add = (a, b) => a + b;", 82);
    let narrative = synthesize_feedback(&input);

    assert_eq!(narrative.split("\n\n").count(), 5);
    assert!(narrative.contains("javascript"));
    assert!(narrative.contains("Good variable and function naming conventions"));
    assert!(narrative.contains("Add unit tests to verify functionality"));
    assert_eq!(narrative, synthesize_feedback(&input), "synthesis is deterministic");
}
