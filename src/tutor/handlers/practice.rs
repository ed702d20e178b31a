//! Practice-loop handler.
//!
//! The one handler with real state behavior. With no quiz in flight it turns
//! the message into a quiz: extract the request, look up the bank with two
//! broad fallbacks, synthesize questions as a last resort, then hand out a
//! numbered listing. With a quiz in flight it grades the student's reply
//! against the stored answer key and ends the quiz on any successful parse.

use tracing::{debug, warn};

use crate::llm::json::parse_json_response;
use crate::llm::{GenerationRequest, LlmMessage, TextGenerator};
use crate::questions::{self, BankQuestion, Difficulty};
use crate::tutor::state::{DialogueMode, QuizData, QuizQuestion, StudentRecord};
use crate::tutor::AppSettings;

/// Closing line of every quiz listing; the grading path tells students to
/// answer in this shape.
const ANSWER_INSTRUCTION: &str = "Reply with your answers (e.g. 1A, 2B...) to see your score.";

/// Reply when the answer key cannot be matched against the student's text.
/// The quiz stays in flight so they can try again.
const RETRY_ANSWERS_REPLY: &str = "I couldn't match those to the quiz questions. Reply \
with the question number and your letter choice, like 1A, 2B, 3C.";

/// Terminal reply when the bank and synthesis both come up empty.
const NO_QUESTIONS_REPLY: &str = "I couldn't put together good questions on that topic. \
Could you pick a different one? Algebra, geometry, trigonometry, and grammar are all \
well stocked.";

const SYNTHESIS_RULES: &str = "Question style contract:\n\
- Every question must take at least two reasoning steps. No single-step arithmetic, \
no rote recall of definitions.\n\
- SAT register: a concise setup, then one specific thing asked.\n\
- Mimic these templates:\n\
  \"If 3x - 7 = 14, what is the value of 6x + 2?\"\n\
  \"The mean of five numbers is 12. When a sixth number is added, the mean becomes 14. \
What is the sixth number?\"\n\
- Exactly four options per question, one correct.";

/// What one generator call pulls out of a practice request.
#[derive(Debug, Clone, PartialEq)]
struct PracticeRequest {
    topic: String,
    count: usize,
    difficulty: Option<Difficulty>,
}

/// Entry point for the practice mode. Dispatches on whether a quiz is
/// already in flight.
pub async fn handle(
    message: &str,
    record: &mut StudentRecord,
    settings: &AppSettings,
    generator: &dyn TextGenerator,
) -> String {
    let in_flight = match &record.mode {
        DialogueMode::PracticeLoop { quiz } => quiz.clone(),
        _ => None,
    };

    match in_flight {
        Some(quiz) => grade(message, quiz, record, generator).await,
        None => start(message, record, settings, generator).await,
    }
}

// ---------------------------------------------------------------------------
// Entry: build and hand out a quiz
// ---------------------------------------------------------------------------

async fn start(
    message: &str,
    record: &mut StudentRecord,
    settings: &AppSettings,
    generator: &dyn TextGenerator,
) -> String {
    let request = extract_request(message, settings, generator).await;

    if let Some(difficulty) = request.difficulty {
        record.set_preferred_difficulty(difficulty);
    }
    let difficulty = request.difficulty.or_else(|| record.preferred_difficulty());

    let (topic, picked) = match bank_lookup(&request.topic, request.count, difficulty) {
        Some((topic, entries)) => {
            let questions = entries.iter().map(QuizQuestion::from).collect();
            (topic, questions)
        }
        None => match synthesize(&request, generator).await {
            Some(questions) => (request.topic.clone(), questions),
            None => return NO_QUESTIONS_REPLY.to_string(),
        },
    };

    debug!(target: "tutor", topic = %topic, count = picked.len(), "quiz handed out");
    let listing = format_quiz(&topic, &picked);
    record.mode = DialogueMode::PracticeLoop {
        quiz: Some(QuizData {
            topic,
            questions: picked,
        }),
    };
    listing
}

/// One generator call to pull `{topic, count, difficulty?}` out of the
/// message. Failure degrades to the raw message as topic and the default
/// count, never an error.
async fn extract_request(
    message: &str,
    settings: &AppSettings,
    generator: &dyn TextGenerator,
) -> PracticeRequest {
    let max_count = settings.max_question_count.max(1);
    let default_count = settings.default_question_count.clamp(1, max_count);
    let fallback = PracticeRequest {
        topic: message.trim().to_string(),
        count: default_count,
        difficulty: None,
    };

    let system = format!(
        "Extract the practice request from the student's message.\n\
         Respond with ONLY a JSON object, no markdown fences:\n\
         {{\"topic\": \"<topic keyword>\", \"count\": <requested number of questions>, \
         \"difficulty\": \"Easy|Medium|Hard\"}}\n\
         Omit \"difficulty\" unless the student stated one. If no topic is named, reuse \
         the student's own words. If no count is named, use {}.",
        default_count
    );

    let gen_request = GenerationRequest {
        system: Some(system),
        messages: vec![LlmMessage::user(message)],
        temperature: Some(0.0),
        json_response: true,
        ..Default::default()
    };

    let raw = match generator.generate(gen_request).await {
        Ok(text) => text,
        Err(err) => {
            warn!(target: "tutor", error = %err, "request extraction failed");
            return fallback;
        }
    };

    let Some(parsed) = parse_json_response(&raw) else {
        warn!(target: "tutor", raw = %raw, "request extraction did not parse");
        return fallback;
    };

    let topic = parsed
        .get("topic")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .unwrap_or(fallback.topic);

    let count = parsed
        .get("count")
        .and_then(|v| v.as_u64())
        .map(|n| (n as usize).clamp(1, max_count))
        .unwrap_or(default_count);

    let difficulty = parsed
        .get("difficulty")
        .and_then(|v| v.as_str())
        .and_then(Difficulty::parse);

    PracticeRequest {
        topic,
        count,
        difficulty,
    }
}

/// Bank lookup with the two broad fallback topics. Returns the query that
/// produced the hits so the quiz is labeled by what it actually contains.
fn bank_lookup(
    topic: &str,
    count: usize,
    difficulty: Option<Difficulty>,
) -> Option<(String, Vec<BankQuestion>)> {
    for query in [topic, "Math", "English"] {
        let found = questions::search(query, count, difficulty);
        if !found.is_empty() {
            return Some((query.to_string(), found));
        }
    }
    None
}

/// Last-resort question synthesis under the style contract. Returns `None`
/// when the output yields no usable questions.
async fn synthesize(
    request: &PracticeRequest,
    generator: &dyn TextGenerator,
) -> Option<Vec<QuizQuestion>> {
    let difficulty = request
        .difficulty
        .map(|d| d.to_string())
        .unwrap_or_else(|| "Medium".to_string());
    let system = format!(
        "Write {} original SAT practice questions on \"{}\" at {} difficulty.\n{}\n{}\n\
         Respond with ONLY a JSON object, no markdown fences:\n\
         {{\"questions\": [{{\"text\": \"...\", \"options\": [\"...\", \"...\", \"...\", \
         \"...\"], \"correct_answer\": \"A\", \"explanation\": \"...\"}}]}}",
        request.count,
        request.topic,
        difficulty,
        SYNTHESIS_RULES,
        super::MATH_NOTATION_RULES,
    );

    let gen_request = GenerationRequest {
        system: Some(system),
        messages: vec![LlmMessage::user(format!(
            "Please write the {} questions now.",
            request.count
        ))],
        max_tokens: 2048,
        temperature: Some(0.7),
        json_response: true,
    };

    let raw = match generator.generate(gen_request).await {
        Ok(text) => text,
        Err(err) => {
            warn!(target: "tutor", error = %err, "question synthesis failed");
            return None;
        }
    };

    let parsed = parse_json_response(&raw)?;
    // Accept both the documented object shape and a bare array.
    let items = parsed
        .get("questions")
        .and_then(|v| v.as_array())
        .or_else(|| parsed.as_array())?;

    let questions: Vec<QuizQuestion> = items.iter().filter_map(parse_question).collect();
    if questions.is_empty() {
        warn!(target: "tutor", raw = %raw, "synthesis output had no usable questions");
        return None;
    }
    Some(questions)
}

/// Validate one synthesized question. Anything malformed is dropped.
fn parse_question(value: &serde_json::Value) -> Option<QuizQuestion> {
    let text = value.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    let options: Vec<String> = value
        .get("options")?
        .as_array()?
        .iter()
        .map(|o| o.as_str().map(|s| s.trim().to_string()))
        .collect::<Option<Vec<_>>>()?;
    let options: [String; 4] = options.try_into().ok()?;

    let correct_answer = value
        .get("correct_answer")?
        .as_str()?
        .trim()
        .chars()
        .next()?
        .to_ascii_uppercase();
    if !('A'..='D').contains(&correct_answer) {
        return None;
    }

    let explanation = value
        .get("explanation")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    Some(QuizQuestion {
        text: text.to_string(),
        options,
        correct_answer,
        explanation,
    })
}

/// Numbered multiple-choice listing, ending in the fixed answer instruction.
fn format_quiz(topic: &str, questions: &[QuizQuestion]) -> String {
    let mut out = format!(
        "Here are your {} practice questions on {}:\n\n",
        questions.len(),
        topic
    );
    for (i, question) in questions.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, question.text));
        for (letter, option) in ['A', 'B', 'C', 'D'].iter().zip(question.options.iter()) {
            out.push_str(&format!("   {}) {}\n", letter, option));
        }
        out.push('\n');
    }
    out.push_str(ANSWER_INSTRUCTION);
    out
}

// ---------------------------------------------------------------------------
// Continuation: grade the student's answers
// ---------------------------------------------------------------------------

async fn grade(
    message: &str,
    quiz: QuizData,
    record: &mut StudentRecord,
    generator: &dyn TextGenerator,
) -> String {
    let system = format!(
        "You are grading a multiple-choice SAT quiz. The student's reply may be \
         informal (\"1a 2b\", \"A then C\", \"the first one is B\"); match what you \
         can to question numbers.\n\nAnswer key:\n{}\n\n\
         Respond with ONLY a JSON object, no markdown fences:\n\
         {{\"score\": \"<correct>/<total>\", \"results\": [{{\"number\": 1, \
         \"correct\": true, \"explanation\": \"one sentence\"}}]}}",
        answer_key(&quiz)
    );

    let gen_request = GenerationRequest {
        system: Some(system),
        messages: vec![LlmMessage::user(message)],
        temperature: Some(0.0),
        json_response: true,
        ..Default::default()
    };

    let raw = match generator.generate(gen_request).await {
        Ok(text) => text,
        Err(err) => {
            warn!(target: "tutor", error = %err, "grading call failed");
            return RETRY_ANSWERS_REPLY.to_string();
        }
    };

    let Some(parsed) = parse_json_response(&raw) else {
        warn!(target: "tutor", raw = %raw, "grading output did not parse");
        return RETRY_ANSWERS_REPLY.to_string();
    };

    // A parsed object ends the quiz even if parts of it are missing.
    record.mode = DialogueMode::PracticeLoop { quiz: None };

    let score = parsed.get("score").and_then(|v| v.as_str());
    if let Some(score) = score {
        record.mastery.insert(quiz.topic.clone(), score.to_string());
    }

    let mut out = match score {
        Some(score) => format!("You scored {} on {}.\n", score, quiz.topic),
        None => format!("Here's how your {} quiz went.\n", quiz.topic),
    };

    if let Some(results) = parsed.get("results").and_then(|v| v.as_array()) {
        out.push('\n');
        for (i, result) in results.iter().enumerate() {
            let number = result
                .get("number")
                .and_then(|v| v.as_u64())
                .unwrap_or(i as u64 + 1);
            let verdict = if result.get("correct").and_then(|v| v.as_bool()).unwrap_or(false) {
                "Correct!"
            } else {
                "Not quite."
            };
            let explanation = result
                .get("explanation")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            out.push_str(&format!("{}. {} {}\n", number, verdict, explanation));
        }
    }

    out.push_str(
        "\nWant another quiz, a walkthrough of anything you missed, or a different topic?",
    );
    out
}

/// Render the answer key for the grading prompt.
fn answer_key(quiz: &QuizData) -> String {
    quiz.questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            format!(
                "{}. {} Correct: {}. {}",
                i + 1,
                q.text,
                q.correct_answer,
                q.explanation
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
