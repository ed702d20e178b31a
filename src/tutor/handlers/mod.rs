//! Dialogue mode handlers.
//!
//! One handler per dialogue mode. All but the practice loop and the teaching
//! entry are prompt templating: student context is interpolated into a
//! persona instruction, the generator is asked for a strict
//! `{"reply": "..."}` object, and a fixed fallback covers output that does
//! not parse. Retries live inside the generator, never here.

pub mod practice;

use tracing::warn;

use crate::llm::json::parse_json_response;
use crate::llm::{GenerationRequest, LlmMessage, TextGenerator};
use crate::tutor::state::{DialogueMode, StudentRecord, TeachingStep};
use crate::tutor::AppSettings;

/// Reply substituted whenever generation fails or its output is unusable.
pub(crate) const FALLBACK_REPLY: &str =
    "I encountered an error on my side. Let's restart: what would you like to work on?";

/// Notation rules appended to every generation prompt so replies render
/// cleanly in plain chat clients.
pub(crate) const MATH_NOTATION_RULES: &str = "Math notation rules:\n\
- Write all math in plain text. No LaTeX, no markdown formatting.\n\
- Use ^ for exponents (x^2), / for fractions (3/4), sqrt() for roots.\n\
- Prefer 2x over 2*x; use * only when a product would be ambiguous.\n\
- One equation per line when showing worked steps.";

const REPLY_CONTRACT: &str = "Respond with ONLY a JSON object, no markdown fences:\n\
{\"reply\": \"your message to the student\"}";

const DOUBT_INSTRUCTION: &str = "The student is stuck or asking a question. Answer it \
directly, then walk through the reasoning in short numbered steps, and end by checking \
whether the explanation helped.";

const PLAN_INSTRUCTION: &str = "The student wants a study plan. Draft a short, realistic \
schedule that leans on the weak topics in the mastery snapshot, and ask one question \
about their test date or weekly study time.";

const ANALYSIS_INSTRUCTION: &str = "The student wants to go over test results or \
mistakes. Work from the scores and errors they describe plus the mastery snapshot, \
name the patterns you see, and recommend what to review first.";

const PROGRESS_INSTRUCTION: &str = "The student asked how they are doing. Summarize \
their progress from the mastery snapshot and the recent conversation: one strength, \
the weakest area, and the next thing to work on.";

// ---------------------------------------------------------------------------
// Fixed handlers (no generation)
// ---------------------------------------------------------------------------

/// Greeting for the idle mode, also shown after an exit word.
pub fn idle_reply(settings: &AppSettings) -> String {
    format!(
        "Hi, I'm {}! I can answer a question you're stuck on, teach a topic step by \
         step, quiz you with practice questions, plan your study schedule, or go over \
         your results. What would you like to do?",
        settings.display_name
    )
}

/// Entry transition for a structured lesson.
///
/// Later lesson steps are not implemented; the mode stays here until the
/// student uses an exit word.
pub fn structured_teaching(record: &mut StudentRecord) -> String {
    record.mode = DialogueMode::StructuredTeaching {
        step: TeachingStep::WaitForMode,
    };
    "Great, let's work through a topic together. Would you like me to teach it step \
     by step, or quiz you first to see where you stand? (Say \"stop\" at any point \
     to end the lesson.)"
        .to_string()
}

// ---------------------------------------------------------------------------
// Prompt-templating handlers
// ---------------------------------------------------------------------------

/// Free-form question answering.
pub async fn doubt_solving(
    message: &str,
    record: &StudentRecord,
    settings: &AppSettings,
    generator: &dyn TextGenerator,
) -> String {
    let system = build_system(settings, record, DOUBT_INSTRUCTION);
    json_reply(system, message, generator).await
}

/// Study-plan drafting.
pub async fn plan_session(
    message: &str,
    record: &StudentRecord,
    settings: &AppSettings,
    generator: &dyn TextGenerator,
) -> String {
    let system = build_system(settings, record, PLAN_INSTRUCTION);
    json_reply(system, message, generator).await
}

/// Review of past test results.
pub async fn test_analysis(
    message: &str,
    record: &StudentRecord,
    settings: &AppSettings,
    generator: &dyn TextGenerator,
) -> String {
    let system = build_system(settings, record, ANALYSIS_INSTRUCTION);
    json_reply(system, message, generator).await
}

/// Progress summary over the student's diagnostics.
pub async fn progress_report(
    message: &str,
    record: &StudentRecord,
    settings: &AppSettings,
    generator: &dyn TextGenerator,
) -> String {
    let system = build_system(settings, record, PROGRESS_INSTRUCTION);
    json_reply(system, message, generator).await
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

fn build_system(settings: &AppSettings, record: &StudentRecord, instruction: &str) -> String {
    format!(
        "You are {}, a patient SAT tutor chatting with a student.\n{}\n\n\
         Student context:\n{}\n{}\n\n{}",
        settings.display_name,
        instruction,
        student_context(record, settings.history_turns),
        MATH_NOTATION_RULES,
        REPLY_CONTRACT,
    )
}

/// Render the record fragments every prompt shares: stated difficulty, the
/// mastery snapshot, and the recent conversation tail.
fn student_context(record: &StudentRecord, history_turns: usize) -> String {
    let mut out = String::new();

    let difficulty = record
        .preferred_difficulty()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "not stated".to_string());
    out.push_str(&format!("Preferred difficulty: {}\n", difficulty));

    if record.mastery.is_empty() {
        out.push_str("Mastery so far: none recorded\n");
    } else {
        let mut entries: Vec<String> = record
            .mastery
            .iter()
            .map(|(topic, score)| format!("{} {}", topic, score))
            .collect();
        entries.sort();
        out.push_str(&format!("Mastery so far: {}\n", entries.join(", ")));
    }

    if !record.session_log.is_empty() {
        out.push_str("Recent conversation:\n");
        for entry in record.recent_log(history_turns) {
            out.push_str(&format!("  {}: {}\n", entry.sender, entry.text));
        }
    }

    out
}

/// Ask the generator for a `{"reply": "..."}` object. Any failure, transport
/// or parse, degrades to the fixed fallback reply.
async fn json_reply(system: String, message: &str, generator: &dyn TextGenerator) -> String {
    let request = GenerationRequest {
        system: Some(system),
        messages: vec![LlmMessage::user(message)],
        temperature: Some(0.7),
        json_response: true,
        ..Default::default()
    };

    let raw = match generator.generate(request).await {
        Ok(text) => text,
        Err(err) => {
            warn!(target: "tutor", error = %err, "generation failed");
            return FALLBACK_REPLY.to_string();
        }
    };

    match parse_json_response(&raw)
        .and_then(|v| v.get("reply").and_then(|r| r.as_str()).map(String::from))
    {
        Some(reply) if !reply.trim().is_empty() => reply,
        _ => {
            warn!(target: "tutor", raw = %raw, "reply object did not parse");
            FALLBACK_REPLY.to_string()
        }
    }
}
