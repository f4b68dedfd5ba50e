use std::sync::Mutex;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom, thread_rng};

use crate::evaluation::types::{EvaluationResult, EvaluationSource};

pub const MIN_HEURISTIC_SCORE: i32 = 40;
pub const MAX_HEURISTIC_SCORE: i32 = 95;
pub const STRENGTH_COUNT: usize = 4;
pub const IMPROVEMENT_COUNT: usize = 3;

pub const STRENGTH_POOL: [&str; 8] = [
    "Clean and readable code structure with good organization",
    "Appropriate use of language-specific features and idioms",
    "Good variable and function naming conventions",
    "Logical flow and clear control structures",
    "Efficient algorithm implementation",
    "Proper separation of concerns",
    "Good use of built-in language functions",
    "Clear and maintainable code style",
];

pub const IMPROVEMENT_POOL: [&str; 8] = [
    "Consider adding more inline comments for complex logic",
    "Could benefit from additional error handling for edge cases",
    "Consider extracting repeated code into reusable functions",
    "Add input validation to prevent unexpected behavior",
    "Consider using more descriptive variable names in some places",
    "Could optimize performance for larger datasets",
    "Consider adding type annotations for better maintainability",
    "Add unit tests to verify functionality",
];

/// Randomness used by the heuristic.
pub trait SelectionSource: Send + Sync {
    /// Score jitter in `-5..=4`.
    fn jitter(&self) -> i32;

    fn shuffle(&self, items: &mut [&'static str]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EntropySelection;

impl SelectionSource for EntropySelection {
    fn jitter(&self) -> i32 {
        thread_rng().gen_range(-5..=4)
    }

    fn shuffle(&self, items: &mut [&'static str]) {
        items.shuffle(&mut thread_rng());
    }
}

/// Reproducible selection for tests and replays.
#[derive(Debug)]
pub struct SeededSelection {
    rng: Mutex<StdRng>,
}

impl SeededSelection {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, op: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        op(&mut guard)
    }
}

impl SelectionSource for SeededSelection {
    fn jitter(&self) -> i32 {
        self.with_rng(|rng| rng.gen_range(-5..=4))
    }

    fn shuffle(&self, items: &mut [&'static str]) {
        self.with_rng(|rng| items.shuffle(rng));
    }
}

/// Surface features of a code sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSignals {
    pub has_comments: bool,
    pub has_error_handling: bool,
    pub has_definitions: bool,
    pub length: usize,
}

impl CodeSignals {
    pub fn detect(code: &str) -> Self {
        Self {
            has_comments: ["//", "/*", "#"].iter().any(|marker| code.contains(marker)),
            has_error_handling: ["try", "catch", "except"]
                .iter()
                .any(|marker| code.contains(marker)),
            has_definitions: ["function", "def ", "=>"]
                .iter()
                .any(|marker| code.contains(marker)),
            length: code.chars().count(),
        }
    }

    pub fn base_score(&self) -> i32 {
        let mut score = 70;
        if self.has_comments {
            score += 5;
        }
        if self.has_error_handling {
            score += 10;
        }
        if self.has_definitions {
            score += 5;
        }
        if self.length > 500 {
            score += 5;
        }
        if self.length < 50 {
            score -= 10;
        }
        score
    }
}

fn draw(pool: &[&'static str], count: usize, selection: &dyn SelectionSource) -> Vec<String> {
    let mut shuffled = pool.to_vec();
    selection.shuffle(&mut shuffled);
    shuffled
        .into_iter()
        .take(count)
        .map(str::to_string)
        .collect()
}

pub fn heuristic_evaluate(
    code: &str,
    language: Option<&str>,
    selection: &dyn SelectionSource,
) -> EvaluationResult {
    let signals = CodeSignals::detect(code);
    let score = (signals.base_score() + selection.jitter())
        .clamp(MIN_HEURISTIC_SCORE, MAX_HEURISTIC_SCORE) as u8;

    let strengths = draw(&STRENGTH_POOL, STRENGTH_COUNT, selection);
    let improvements = draw(&IMPROVEMENT_POOL, IMPROVEMENT_COUNT, selection);
    let narrative = heuristic_narrative(language, score, &signals, &strengths, &improvements);

    EvaluationResult {
        score,
        strengths,
        improvements,
        narrative: Some(narrative),
        source: EvaluationSource::Heuristic,
    }
}

fn heuristic_narrative(
    language: Option<&str>,
    score: u8,
    signals: &CodeSignals,
    strengths: &[String],
    improvements: &[String],
) -> String {
    let language_label = language.unwrap_or("code");
    let understanding = match score {
        80.. => "excellent",
        70..=79 => "good",
        _ => "reasonable",
    };
    let structure = if score >= 75 { "well-organized" } else { "adequate" };
    let practices = if score >= 80 { "many" } else { "some" };
    let robustness = if signals.has_error_handling {
        "The inclusion of error handling shows attention to robustness."
    } else {
        "Consider adding error handling to make the code more robust."
    };
    let comments = if signals.has_comments {
        "The comments help explain the logic."
    } else {
        "Adding comments would improve code maintainability."
    };
    let closing = if score >= 80 {
        "Overall, this is production-quality code with minor enhancements possible."
    } else {
        "With these improvements, the code would be more maintainable and professional."
    };

    format!(
        "Your {language_label} implementation demonstrates {understanding} understanding of programming fundamentals. {}. {}.\n\n\
         The code structure is {structure} and follows {practices} best practices for {}. {robustness} {comments}\n\n\
         For improvement, {}. Additionally, {}. {closing} Consider reviewing the specific suggestions above to take your code to the next level.",
        strengths[0],
        strengths[1],
        language.unwrap_or("the language"),
        improvements[0].to_lowercase(),
        improvements[1].to_lowercase(),
    )
}
