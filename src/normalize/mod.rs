//! Out-of-band question text cleanup.
//!
//! Exported question rows sometimes carry a topic label embedded in the
//! question text, or all four answer options clumped into a single string.
//! The two passes here repair both shapes. They run against a JSON array
//! file via `preceptor normalize`, never in the request path. The default
//! is a dry run; `--write` rewrites the file in place.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("expected a JSON array of question rows")]
    NotAnArray,
}

impl From<std::io::Error> for NormalizeError {
    fn from(e: std::io::Error) -> Self {
        NormalizeError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for NormalizeError {
    fn from(e: serde_json::Error) -> Self {
        NormalizeError::Parse(e.to_string())
    }
}

/// One exported question row. Fields the passes don't touch are carried
/// through unchanged on rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Per-row outcome.
#[derive(Debug, Clone, Default)]
pub struct RowReport {
    pub id: String,
    /// Label moved into the row's empty topic field.
    pub topic_extracted: Option<String>,
    pub options_split: bool,
    /// Things a pass looked at but declined to change, with the reason.
    pub notes: Vec<String>,
}

impl RowReport {
    pub fn changed(&self) -> bool {
        self.topic_extracted.is_some() || self.options_split
    }
}

/// Whole-run summary.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub rows: usize,
    pub topics_extracted: usize,
    pub options_split: usize,
    pub rows_with_notes: usize,
    pub details: Vec<RowReport>,
}

impl RunReport {
    pub fn changed(&self) -> bool {
        self.topics_extracted > 0 || self.options_split > 0
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} rows: {} topic labels extracted, {} option clumps split, {} rows with notes",
            self.rows, self.topics_extracted, self.options_split, self.rows_with_notes
        )
    }
}

// ---------------------------------------------------------------------------
// Topic label pass
// ---------------------------------------------------------------------------

static BRACKETED_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\s*topic\s*:\s*([^\]\n]+?)\s*\]\s*").unwrap());

static LEADING_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*topic\s*:\s*(.+?)(?:\s*[:—]\s*|\s+-\s+)").unwrap());

/// Find an embedded topic label and strip it from the text.
///
/// Recognized forms: a bracketed `[Topic: Algebra]` anywhere in the text, or
/// a leading `Topic: Algebra —` / `Topic: Algebra:` prefix. A plain hyphen
/// separates the label only when spaced on both sides, so hyphenated topics
/// like `Pre-Algebra` stay intact. Returns the label and the cleaned text,
/// or `None` when the text carries no label (or stripping it would leave the
/// question empty).
pub fn extract_topic_label(text: &str) -> Option<(String, String)> {
    if let Some(caps) = BRACKETED_LABEL.captures(text) {
        let whole = caps.get(0)?;
        let label = caps[1].trim().to_string();
        let mut cleaned = String::with_capacity(text.len());
        cleaned.push_str(&text[..whole.start()]);
        cleaned.push_str(&text[whole.end()..]);
        let cleaned = cleaned.trim().to_string();
        if !label.is_empty() && !cleaned.is_empty() {
            return Some((label, cleaned));
        }
        return None;
    }

    if let Some(caps) = LEADING_LABEL.captures(text) {
        let whole = caps.get(0)?;
        let label = caps[1].trim().to_string();
        let rest = text[whole.end()..].trim().to_string();
        if !label.is_empty() && !rest.is_empty() {
            return Some((label, rest));
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Option split pass
// ---------------------------------------------------------------------------

static OPTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\(?)([A-D])([).])\s*").unwrap());

/// Split a clumped option string into four discrete options.
///
/// Recognized markers: `A)`, `(A)`, `A.` through `D`. The markers must
/// appear in order, all in the style of the first one (`)` vs `.`,
/// parenthesized or not), with nothing but whitespace before the first
/// marker, and every option body must be non-empty; otherwise the clump is
/// left alone. The style rule keeps things like "vitamin B." inside an
/// option body from being read as the next marker.
pub fn split_options(clump: &str) -> Option<[String; 4]> {
    let mut accepted: Vec<(usize, usize)> = Vec::with_capacity(4);
    let mut style: Option<(bool, char)> = None;
    let expected = ['A', 'B', 'C', 'D'];

    for caps in OPTION_MARKER.captures_iter(clump) {
        if accepted.len() == 4 {
            break;
        }
        let letter = caps[2].chars().next()?;
        if letter != expected[accepted.len()] {
            // Not the marker we're looking for; treat it as body text.
            continue;
        }
        let marker_style = (!caps[1].is_empty(), caps[3].chars().next()?);
        match style {
            None => style = Some(marker_style),
            Some(s) if s != marker_style => continue,
            Some(_) => {}
        }
        let whole = caps.get(0)?;
        accepted.push((whole.start(), whole.end()));
    }

    if accepted.len() != 4 {
        return None;
    }
    if !clump[..accepted[0].0].trim().is_empty() {
        return None;
    }

    let mut options = Vec::with_capacity(4);
    for (i, &(_, body_start)) in accepted.iter().enumerate() {
        let body_end = accepted
            .get(i + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(clump.len());
        let body = clump[body_start..body_end].trim();
        if body.is_empty() {
            return None;
        }
        options.push(body.to_string());
    }

    options.try_into().ok()
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Apply both passes to one row.
pub fn normalize_row(row: &mut QuestionRow) -> RowReport {
    let mut report = RowReport {
        id: row.id.clone(),
        ..Default::default()
    };

    if let Some((label, cleaned)) = extract_topic_label(&row.text) {
        if row.topic.trim().is_empty() {
            row.topic = label.clone();
            row.text = cleaned;
            report.topic_extracted = Some(label);
        } else {
            // Curated topic wins; leave the row for a human to look at.
            report.notes.push(format!(
                "embedded label \"{}\" but topic field already set to \"{}\"",
                label, row.topic
            ));
        }
    }

    match row.options.len() {
        0 | 4 => {}
        1 => match split_options(&row.options[0]) {
            Some(split) => {
                row.options = split.to_vec();
                report.options_split = true;
            }
            None => {
                report
                    .notes
                    .push("option clump did not yield 4 options".to_string());
            }
        },
        n => {
            report
                .notes
                .push(format!("{} options, expected 1 clump or 4", n));
        }
    }

    report
}

/// Apply both passes to every row, collecting a run summary.
pub fn normalize_rows(rows: &mut [QuestionRow]) -> RunReport {
    let mut run = RunReport {
        rows: rows.len(),
        ..Default::default()
    };
    for row in rows.iter_mut() {
        let report = normalize_row(row);
        if report.topic_extracted.is_some() {
            run.topics_extracted += 1;
        }
        if report.options_split {
            run.options_split += 1;
        }
        if !report.notes.is_empty() {
            run.rows_with_notes += 1;
        }
        run.details.push(report);
    }
    run
}

/// Run both passes over a JSON array file of question rows.
///
/// With `write` unset this is a dry run: the file is never touched. With it
/// set, a changed file is rewritten atomically (temp file + rename).
pub fn normalize_file(path: &Path, write: bool) -> Result<RunReport, NormalizeError> {
    let raw = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    let Value::Array(items) = value else {
        return Err(NormalizeError::NotAnArray);
    };

    let mut rows: Vec<QuestionRow> = items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()?;

    let report = normalize_rows(&mut rows);
    debug!(
        target: "normalize",
        rows = report.rows,
        topics = report.topics_extracted,
        splits = report.options_split,
        "normalization pass complete"
    );

    if write && report.changed() {
        let temp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &rows)?;
            writer.flush()?;
        }
        fs::rename(&temp_path, path)?;
    }

    Ok(report)
}
