use serde_json::{Value, json};

use crate::evaluation::types::{EvaluationInput, FeedbackInput};

pub fn evaluation_schema() -> Value {
    json!({
        "type": "object",
        "description": "Code evaluation result",
        "properties": {
            "score": {
                "type": "number",
                "description": "Code quality score from 0-100"
            },
            "strengths": {
                "type": "array",
                "description": "Array of 4-5 specific strengths as detailed strings",
                "items": {"type": "string"}
            },
            "improvements": {
                "type": "array",
                "description": "Array of 3-4 specific improvement suggestions as detailed strings",
                "items": {"type": "string"}
            }
        },
        "required": ["score", "strengths", "improvements"]
    })
}

pub fn feedback_schema() -> Value {
    json!({
        "type": "object",
        "description": "Detailed code feedback",
        "properties": {
            "detailedFeedback": {
                "type": "string",
                "description": "Comprehensive 4-5 paragraph analysis covering code quality, best practices, performance, security considerations, and specific recommendations for improvement"
            }
        },
        "required": ["detailedFeedback"]
    })
}

fn description_line(description: Option<&str>) -> String {
    description
        .map(|description| format!("Description: {description}\n"))
        .unwrap_or_default()
}

pub fn evaluation_prompt(input: &EvaluationInput) -> String {
    let language = input.language.as_deref();
    format!(
        "You are an expert code reviewer and evaluator. Analyze the provided {} code and provide a comprehensive evaluation.\n\n\
         Title: {}\n{}\n\
         Code to evaluate:\n```{}\n{}\n```\n\n\
         Evaluate the code thoroughly considering:\n\
         1. Code structure and organization\n\
         2. Naming conventions and readability\n\
         3. Error handling and edge cases\n\
         4. Performance considerations\n\
         5. Best practices for {}\n\
         6. Potential bugs or issues\n\
         7. Security considerations\n\
         8. Maintainability and scalability\n\n\
         Provide:\n\
         - A score from 0-100 based on overall code quality\n\
         - 4-5 specific strengths (what the code does well)\n\
         - 3-4 specific improvement suggestions (actionable recommendations)\n\n\
         Be specific, constructive, and helpful in your feedback.",
        language.unwrap_or("code"),
        input.title,
        description_line(input.description.as_deref()),
        language.unwrap_or(""),
        input.code,
        language.unwrap_or("the language"),
    )
}

pub fn feedback_prompt(input: &FeedbackInput) -> String {
    let language = input.language.as_deref();
    format!(
        "You are an expert code reviewer providing comprehensive feedback. Based on the evaluation below, provide detailed, actionable feedback for the developer.\n\n\
         Title: {}\n{}\
         Language: {}\n\n\
         Code:\n```{}\n{}\n```\n\n\
         Initial Evaluation:\n\
         - Score: {}/100\n\
         - Strengths: {}\n\
         - Areas for Improvement: {}\n\n\
         Provide a comprehensive 4-5 paragraph detailed feedback that:\n\
         1. Opens with an overall assessment of the code quality and approach\n\
         2. Discusses specific strengths in detail, explaining WHY they are good practices\n\
         3. Provides detailed improvement suggestions with specific code examples or approaches\n\
         4. Covers performance, security, and maintainability considerations\n\
         5. Concludes with actionable next steps and learning resources\n\n\
         Be specific, constructive, and educational. Help the developer understand not just WHAT to improve, but WHY and HOW.",
        input.title,
        description_line(input.description.as_deref()),
        language.unwrap_or("Unknown"),
        language.unwrap_or(""),
        input.code,
        input.score,
        input.strengths.join(", "),
        input.improvements.join(", "),
    )
}
