//! The tutoring dialogue engine.
//!
//! One turn = load the student record, route the message to a dialogue
//! mode, run that mode's handler, append both sides to the session log,
//! save. Mode handlers own all recovery; a turn always produces a reply.

pub mod handlers;
pub mod router;
pub mod state;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::llm::TextGenerator;
use crate::store::StateStore;
use state::DialogueMode;
use state::StudentRecord;

/// Settings the dialogue layer reads from the `tutor` config section.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Product name used for persona framing in prompts
    pub display_name: String,
    /// Session-log entries quoted back into prompts
    pub history_turns: usize,
    /// Questions per quiz when the student doesn't ask for a number
    pub default_question_count: usize,
    /// Ceiling on questions per quiz
    pub max_question_count: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            display_name: "Preceptor".to_string(),
            history_turns: 12,
            default_question_count: 3,
            max_question_count: 5,
        }
    }
}

impl AppSettings {
    /// Typed view over a loaded config value.
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        let tutor = config.get("tutor");

        let read_count = |key: &str, fallback: usize| {
            tutor
                .and_then(|t| t.get(key))
                .and_then(|v| v.as_u64())
                .map(|n| n as usize)
                .unwrap_or(fallback)
        };

        Self {
            display_name: tutor
                .and_then(|t| t.get("displayName"))
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .unwrap_or(defaults.display_name),
            history_turns: read_count("historyTurns", defaults.history_turns),
            default_question_count: read_count(
                "defaultQuestionCount",
                defaults.default_question_count,
            ),
            max_question_count: read_count("maxQuestionCount", defaults.max_question_count),
        }
    }
}

/// The result of one tutoring turn.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Tutor reply for this turn
    pub reply: String,
    /// Mode label after the turn
    pub mode: &'static str,
}

/// Dialogue engine: owns the store, the generator, and the tutor settings.
pub struct TutorEngine {
    store: Arc<dyn StateStore>,
    generator: Arc<dyn TextGenerator>,
    settings: AppSettings,
}

impl TutorEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        generator: Arc<dyn TextGenerator>,
        settings: AppSettings,
    ) -> Self {
        Self {
            store,
            generator,
            settings,
        }
    }

    /// Run one tutoring turn for a user.
    pub async fn chat(&self, user_id: &str, message: &str) -> ChatOutcome {
        let mut record = self.store.load(user_id);

        let next = router::route(message, &record.mode);
        if next != record.mode {
            debug!(
                target: "tutor",
                user_id = %user_id,
                from = record.mode.label(),
                to = next.label(),
                "mode change"
            );
            record.mode = next;
        }

        // Handlers see the record as it stood before this turn; the turn's
        // own messages are appended afterwards.
        let generator = self.generator.as_ref();
        let reply = match record.mode.clone() {
            DialogueMode::Idle => handlers::idle_reply(&self.settings),
            DialogueMode::DoubtSolving => {
                handlers::doubt_solving(message, &record, &self.settings, generator).await
            }
            DialogueMode::StructuredTeaching { .. } => handlers::structured_teaching(&mut record),
            DialogueMode::PracticeLoop { .. } => {
                handlers::practice::handle(message, &mut record, &self.settings, generator).await
            }
            DialogueMode::PlanSession => {
                handlers::plan_session(message, &record, &self.settings, generator).await
            }
            DialogueMode::TestAnalysis => {
                handlers::test_analysis(message, &record, &self.settings, generator).await
            }
            DialogueMode::ProgressReport => {
                handlers::progress_report(message, &record, &self.settings, generator).await
            }
        };

        record.log_user(message);
        record.log_ai(&reply);
        let mode = record.mode.label();
        self.store.save(&mut record);

        ChatOutcome { reply, mode }
    }

    /// Read-only view of a student's record.
    pub fn student_record(&self, user_id: &str) -> StudentRecord {
        self.store.load(user_id)
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }
}
