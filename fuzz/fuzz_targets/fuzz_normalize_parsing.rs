#![no_main]

use libfuzzer_sys::fuzz_target;

use preceptor::normalize::{extract_topic_label, normalize_row, split_options, QuestionRow};

fuzz_target!(|data: &str| {
    // Both cleanup parsers must never panic on arbitrary text, and anything
    // they extract must honor the non-empty contracts.
    if let Some((label, cleaned)) = extract_topic_label(data) {
        assert!(!label.is_empty());
        assert!(!cleaned.is_empty());
    }

    if let Some(options) = split_options(data) {
        assert!(options.iter().all(|o| !o.is_empty()));
    }

    // Full row pass: the same text as question body and as a single option
    // clump at once.
    let mut row = QuestionRow {
        id: "fuzz".to_string(),
        topic: String::new(),
        text: data.to_string(),
        options: vec![data.to_string()],
        extra: serde_json::Map::new(),
    };
    let _ = normalize_row(&mut row);
});
