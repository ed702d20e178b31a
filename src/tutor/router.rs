//! Intent routing.
//!
//! A flat keyword dispatch over the latest user message, with two sticky
//! states: an in-progress lesson or quiz holds its mode until the student
//! uses an exit word. Matching is plain case-insensitive substring search,
//! so exit and topic words trigger from inside larger words too.

use std::sync::LazyLock;

use regex::Regex;

use super::state::{DialogueMode, TeachingStep};

/// Words that end any in-progress lesson or quiz and reset to idle.
const EXIT_KEYWORDS: [&str; 4] = ["stop", "exit", "quit", "reset"];

/// Loose "<number><letter A-D>" shape, e.g. "1A" or "2 c".
static ANSWER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*[a-d]\b").unwrap());

/// Select the next dialogue mode for a message.
///
/// Precedence: exit words first, then stickiness (an active lesson or
/// in-flight quiz re-selects the current mode), then keyword candidates,
/// then the answer-shape fallback, and finally doubt solving.
pub fn route(message: &str, current: &DialogueMode) -> DialogueMode {
    let lowered = message.to_lowercase();

    if EXIT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return DialogueMode::Idle;
    }

    if current.teaching_active() || current.quiz_in_flight() {
        return current.clone();
    }

    if let Some(candidate) = keyword_candidate(&lowered) {
        return candidate;
    }

    // Heuristic for answers submitted without the word "quiz". A lesson in
    // progress never reaches this point: teaching is sticky above.
    if lowered.contains("answer") || ANSWER_PATTERN.is_match(&lowered) {
        return DialogueMode::PracticeLoop { quiz: None };
    }

    DialogueMode::DoubtSolving
}

/// First matching keyword group wins, in declaration order.
fn keyword_candidate(lowered: &str) -> Option<DialogueMode> {
    let contains_any = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

    if contains_any(&["teach", "learn", "study"]) {
        Some(DialogueMode::StructuredTeaching {
            step: TeachingStep::WaitForMode,
        })
    } else if contains_any(&["quiz", "practice", "questions", "drill"]) {
        Some(DialogueMode::PracticeLoop { quiz: None })
    } else if contains_any(&["plan", "schedule"]) {
        Some(DialogueMode::PlanSession)
    } else if contains_any(&["stuck", "hint", "help me"]) {
        Some(DialogueMode::DoubtSolving)
    } else if contains_any(&["result", "score", "mistake"]) {
        Some(DialogueMode::TestAnalysis)
    } else if contains_any(&["progress", "report", "how am i doing"]) {
        Some(DialogueMode::ProgressReport)
    } else {
        None
    }
}
