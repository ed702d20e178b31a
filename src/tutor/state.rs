//! Student session state.
//!
//! One [`StudentRecord`] per user holds the dialogue mode, stated
//! preferences, diagnostic maps, and the running session log. The dialogue
//! mode is a tagged enum: the practice variant owns its quiz and the teaching
//! variant owns its step, so only one sub-module can ever be engaged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::questions::BankQuestion;

/// Preference key holding the student's stated difficulty level.
const PREF_DIFFICULTY: &str = "difficulty";

/// Step within a structured teaching session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachingStep {
    /// Waiting for the student to choose between a walkthrough and a quiz.
    #[default]
    WaitForMode,
}

/// A single question carried by an in-flight quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Question text as shown to the student
    pub text: String,
    /// Exactly four answer options, in A..D order
    pub options: [String; 4],
    /// Correct option letter (A-D)
    pub correct_answer: char,
    /// Explanation revealed when grading
    pub explanation: String,
}

impl From<&BankQuestion> for QuizQuestion {
    fn from(q: &BankQuestion) -> Self {
        Self {
            text: q.text.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer,
            explanation: q.explanation.clone(),
        }
    }
}

/// An in-flight quiz: the topic it was drawn for plus the answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizData {
    /// Topic the questions were selected or synthesized for
    pub topic: String,
    /// The questions handed to the student, in presentation order
    pub questions: Vec<QuizQuestion>,
}

/// Current dialogue mode for a student.
///
/// Stateful modes carry their sub-module state in the variant itself:
/// `PracticeLoop` holds the quiz (in flight when `Some`), and
/// `StructuredTeaching` holds the lesson step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DialogueMode {
    /// No conversation in progress (fresh record, or after an exit word)
    #[default]
    Idle,
    /// Free-form question answering
    DoubtSolving,
    /// Guided lesson flow
    StructuredTeaching {
        #[serde(default)]
        step: TeachingStep,
    },
    /// Quiz request, delivery, and grading
    PracticeLoop {
        #[serde(default)]
        quiz: Option<QuizData>,
    },
    /// Study-plan drafting
    PlanSession,
    /// Review of past test results
    TestAnalysis,
    /// Progress summary over the student's diagnostics
    ProgressReport,
}

impl DialogueMode {
    /// Stable lowercase label, matching the serde tag.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DoubtSolving => "doubt_solving",
            Self::StructuredTeaching { .. } => "structured_teaching",
            Self::PracticeLoop { .. } => "practice_loop",
            Self::PlanSession => "plan_session",
            Self::TestAnalysis => "test_analysis",
            Self::ProgressReport => "progress_report",
        }
    }

    /// True when a quiz has been handed out and not yet graded.
    pub fn quiz_in_flight(&self) -> bool {
        matches!(self, Self::PracticeLoop { quiz: Some(_) })
    }

    /// True when a structured teaching session is underway.
    pub fn teaching_active(&self) -> bool {
        matches!(self, Self::StructuredTeaching { .. })
    }
}

impl std::fmt::Display for DialogueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Who produced a session-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The student
    #[default]
    User,
    /// The tutor
    Ai,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Ai => write!(f, "ai"),
        }
    }
}

/// One turn of conversation in the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Message origin
    pub sender: Sender,
    /// Message text
    pub text: String,
    /// Timestamp (Unix ms)
    pub timestamp: i64,
}

impl SessionEntry {
    /// Entry for a student message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            timestamp: now_millis(),
        }
    }

    /// Entry for a tutor reply
    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
            timestamp: now_millis(),
        }
    }
}

/// Persistent per-student state.
///
/// The diagnostic maps (`baseline`, `mastery`, `timing`, `error_patterns`)
/// are interpolated into prompts but only `mastery` has a write site today
/// (quiz grading). The session log is append-only and unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Owning user id
    pub user_id: String,
    /// Current dialogue mode (with any sub-module state)
    #[serde(default)]
    pub mode: DialogueMode,
    /// Stated preferences, e.g. `difficulty`
    #[serde(default)]
    pub preferences: HashMap<String, String>,
    /// Initial diagnostic scores per topic
    #[serde(default)]
    pub baseline: HashMap<String, String>,
    /// Latest demonstrated skill per topic
    #[serde(default)]
    pub mastery: HashMap<String, String>,
    /// Pacing observations per topic
    #[serde(default)]
    pub timing: HashMap<String, String>,
    /// Recurring mistake categories per topic
    #[serde(default)]
    pub error_patterns: HashMap<String, String>,
    /// Full conversation history, oldest first
    #[serde(default)]
    pub session_log: Vec<SessionEntry>,
    /// Timestamp when the record was created (Unix ms)
    pub created_at: i64,
    /// Timestamp when the record was last saved (Unix ms)
    pub updated_at: i64,
}

impl StudentRecord {
    /// Create a fresh record for a user, in idle mode with empty diagnostics.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            user_id: user_id.into(),
            mode: DialogueMode::Idle,
            preferences: HashMap::new(),
            baseline: HashMap::new(),
            mastery: HashMap::new(),
            timing: HashMap::new(),
            error_patterns: HashMap::new(),
            session_log: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a student message to the session log.
    pub fn log_user(&mut self, text: impl Into<String>) {
        self.session_log.push(SessionEntry::user(text));
    }

    /// Append a tutor reply to the session log.
    pub fn log_ai(&mut self, text: impl Into<String>) {
        self.session_log.push(SessionEntry::ai(text));
    }

    /// The last `turns` log entries, oldest first.
    pub fn recent_log(&self, turns: usize) -> &[SessionEntry] {
        let start = self.session_log.len().saturating_sub(turns);
        &self.session_log[start..]
    }

    /// The student's stated difficulty preference, if one parses.
    pub fn preferred_difficulty(&self) -> Option<crate::questions::Difficulty> {
        self.preferences
            .get(PREF_DIFFICULTY)
            .and_then(|v| crate::questions::Difficulty::parse(v))
    }

    /// Record a stated difficulty preference.
    pub fn set_preferred_difficulty(&mut self, difficulty: crate::questions::Difficulty) {
        self.preferences
            .insert(PREF_DIFFICULTY.to_string(), difficulty.to_string());
    }
}

/// Get current time in milliseconds since Unix epoch
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
