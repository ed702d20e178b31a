//! Practice question bank.
//!
//! A static, hand-authored table of SAT-style questions with a fuzzy keyword
//! matcher. The quiz handler consults this before asking the LLM to invent
//! questions. Matching is deliberately simple substring retrieval: no index,
//! no stemming, no relevance score.

pub mod bank;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        write!(f, "{}", s)
    }
}

impl Difficulty {
    /// Soft parse: recognizes easy/medium/hard in any case, else `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// One entry in the static question table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankQuestion {
    pub id: String,
    pub topic: String,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub text: String,
    pub options: [String; 4],
    pub correct_answer: char,
    pub explanation: String,
}

/// Stop words stripped from practice-request queries before matching.
const STOP_WORDS: &[&str] = &[
    "quiz",
    "practice",
    "questions",
    "test",
    "give",
    "easy",
    "hard",
    "medium",
    "want",
];

/// Tokenize a query for matching: lowercase, split on whitespace, drop stop
/// words and tokens of length <= 2.
fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.len() > 2 && !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

/// Search the bank for questions matching `query`.
///
/// The fallback chain, in order:
/// 1. No surviving tokens (vague request like "give me a quiz"): random
///    sample of `limit` entries from the whole table.
/// 2. OR-of-substrings match over topic, tags, and question text.
/// 3. Nothing matched but the query mentions "math": widen to the whole
///    table rather than come back empty.
/// 4. Soft difficulty filter: narrow to the requested difficulty only when
///    at least one entry survives the narrowing; topic relevance wins over
///    difficulty when the two conflict.
/// 5. Shuffle, truncate to `limit`.
pub fn search(query: &str, limit: usize, difficulty: Option<Difficulty>) -> Vec<BankQuestion> {
    let table = bank::all();
    let mut rng = rand::thread_rng();

    let tokens = tokenize(query);

    if tokens.is_empty() {
        return table
            .choose_multiple(&mut rng, limit)
            .cloned()
            .collect();
    }

    let mut matches: Vec<&BankQuestion> = table
        .iter()
        .filter(|q| {
            let topic = q.topic.to_lowercase();
            let text = q.text.to_lowercase();
            tokens.iter().any(|t| {
                topic.contains(t.as_str())
                    || text.contains(t.as_str())
                    || q.tags.iter().any(|tag| tag.to_lowercase().contains(t.as_str()))
            })
        })
        .collect();

    if matches.is_empty() && query.to_lowercase().contains("math") {
        matches = table.iter().collect();
    }

    if let Some(want) = difficulty {
        let narrowed: Vec<&BankQuestion> = matches
            .iter()
            .copied()
            .filter(|q| q.difficulty == want)
            .collect();
        if !narrowed.is_empty() {
            matches = narrowed;
        }
    }

    let mut result: Vec<BankQuestion> = matches.into_iter().cloned().collect();
    result.shuffle(&mut rng);
    result.truncate(limit);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== tokenize ====================

    #[test]
    fn test_tokenize_drops_stop_words() {
        let tokens = tokenize("give me an easy trigonometry quiz");
        assert_eq!(tokens, vec!["trigonometry"]);
    }

    #[test]
    fn test_tokenize_drops_short_tokens() {
        let tokens = tokenize("i am up to it");
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_tokenize_lowercases() {
        let tokens = tokenize("TRIGONOMETRY Problems");
        assert_eq!(tokens, vec!["trigonometry", "problems"]);
    }

    #[test]
    fn test_tokenize_all_stop_words_empty() {
        let tokens = tokenize("quiz practice questions");
        assert!(tokens.is_empty());
    }

    // ==================== search fallback chain ====================

    #[test]
    fn test_search_difficulty_soft_filter() {
        // The bank stocks Trigonometry at Medium/Hard only. Asking for Easy
        // must still return the trig entries: topic relevance wins.
        let results = search("Trigonometry", 5, Some(Difficulty::Easy));

        assert!(!results.is_empty(), "expected trig entries, got none");
        for q in &results {
            assert_eq!(q.topic, "Trigonometry");
            assert_ne!(q.difficulty, Difficulty::Easy);
        }
    }

    #[test]
    fn test_search_empty_tokens_samples_full_table() {
        // "quiz" is a stop word, so no tokens survive; the search must fall
        // back to a random sample of exactly `limit` entries.
        let results = search("quiz", 3, Some(Difficulty::Medium));
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_search_respects_limit() {
        let results = search("math", 2, None);
        assert!(results.len() <= 2);
    }

    #[test]
    fn test_search_or_substring_match() {
        let results = search("algebra", 50, None);
        assert!(!results.is_empty());
        for q in &results {
            let topic = q.topic.to_lowercase();
            let text = q.text.to_lowercase();
            let in_tags = q.tags.iter().any(|t| t.to_lowercase().contains("algebra"));
            assert!(
                topic.contains("algebra") || text.contains("algebra") || in_tags,
                "entry {} does not mention algebra",
                q.id
            );
        }
    }

    #[test]
    fn test_search_difficulty_narrows_when_possible() {
        let results = search("geometry", 50, Some(Difficulty::Easy));
        assert!(!results.is_empty());
        for q in &results {
            assert_eq!(q.difficulty, Difficulty::Easy, "entry {} not Easy", q.id);
        }
    }

    #[test]
    fn test_search_math_widening() {
        // No entry mentions "mathematics", but the query contains "math", so
        // the search widens to the whole table instead of returning nothing.
        let results = search("mathematics anything", 5, None);
        assert!(!results.is_empty());
    }

    #[test]
    fn test_search_unknown_topic_returns_empty() {
        let results = search("xylophone maintenance", 5, None);
        assert!(results.is_empty());
    }

    // ==================== Difficulty ====================

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::parse("easy"), Some(Difficulty::Easy));
        assert_eq!(Difficulty::parse("Medium"), Some(Difficulty::Medium));
        assert_eq!(Difficulty::parse(" HARD "), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("impossible"), None);
        assert_eq!(Difficulty::parse(""), None);
    }

    #[test]
    fn test_difficulty_display() {
        assert_eq!(Difficulty::Easy.to_string(), "Easy");
        assert_eq!(Difficulty::Medium.to_string(), "Medium");
        assert_eq!(Difficulty::Hard.to_string(), "Hard");
    }
}
