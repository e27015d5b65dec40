//! Edit pre-condition validation.
//!
//! Answers, for the file's *current* content: can the requested edit
//! proceed, at what confidence, and if not, why not. The CRLF-normalized
//! fallback keeps edits working against editors that silently convert line
//! endings; the context probe distinguishes a drifted file from one that
//! never contained the text.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::impact::count_occurrences;

/// Confidence in the match that validation found.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
}

/// Line-ending convention detected in a file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEndingKind {
    Lf,
    CrLf,
    Mixed,
    /// Single-line content with no terminator at all.
    None,
}

/// Detects the line-ending convention of `content`.
pub fn detect_line_endings(content: &str) -> LineEndingKind {
    let crlf = content.matches("\r\n").count();
    let lf_total = content.matches('\n').count();
    let bare_lf = lf_total - crlf;
    match (crlf, bare_lf) {
        (0, 0) => LineEndingKind::None,
        (0, _) => LineEndingKind::Lf,
        (_, 0) => LineEndingKind::CrLf,
        _ => LineEndingKind::Mixed,
    }
}

/// What validation concluded about the requested edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The edit can proceed.
    Ok {
        occurrences: usize,
        confidence: MatchConfidence,
        /// True when the match only exists after CRLF normalization; the
        /// replacement must then run on the normalized form.
        normalized: bool,
    },
    /// The surrounding context exists but the exact text does not: the file
    /// changed since the caller read it.
    Drift,
    /// Neither the text nor its context is present.
    NotFound,
}

/// Side-channel facts recorded for logging and error messages.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub file_size: usize,
    pub line_endings: LineEndingKind,
    pub old_text_bytes: usize,
    pub old_text_lines: usize,
    pub new_text_bytes: usize,
    pub new_text_lines: usize,
    /// Short sha256 prefix of the content, for correlating log entries.
    pub content_digest: String,
    pub note: Option<String>,
}

/// Validation verdict plus diagnostics.
#[derive(Debug, Clone)]
pub struct EditCheck {
    pub outcome: CheckOutcome,
    pub diagnostics: Diagnostics,
}

/// Short sha256 prefix used for log correlation.
pub fn short_digest(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(&digest[..6])
}

/// Validates that `old_text` is still present in `content`.
///
/// Checks run in order: exact match (high confidence), CRLF-normalized
/// match (medium confidence), then a context probe on the first and last
/// non-empty lines of `old_text` to detect drift.
pub fn check(content: &str, old_text: &str, new_text: &str) -> EditCheck {
    let mut diagnostics = Diagnostics {
        file_size: content.len(),
        line_endings: detect_line_endings(content),
        old_text_bytes: old_text.len(),
        old_text_lines: old_text.lines().count(),
        new_text_bytes: new_text.len(),
        new_text_lines: new_text.lines().count(),
        content_digest: short_digest(content),
        note: None,
    };

    let exact = count_occurrences(content, old_text);
    if exact > 0 {
        return EditCheck {
            outcome: CheckOutcome::Ok {
                occurrences: exact,
                confidence: MatchConfidence::High,
                normalized: false,
            },
            diagnostics,
        };
    }

    let content_normalized = content.replace("\r\n", "\n");
    let old_normalized = old_text.replace("\r\n", "\n");
    let normalized = count_occurrences(&content_normalized, &old_normalized);
    if normalized > 0 {
        diagnostics.note =
            Some("matched after CRLF normalization; line endings differ between caller and file".to_owned());
        return EditCheck {
            outcome: CheckOutcome::Ok {
                occurrences: normalized,
                confidence: MatchConfidence::Medium,
                normalized: true,
            },
            diagnostics,
        };
    }

    if context_is_present(&content_normalized, &old_normalized) {
        diagnostics.note = Some("context found but exact text has drifted".to_owned());
        return EditCheck { outcome: CheckOutcome::Drift, diagnostics };
    }

    EditCheck { outcome: CheckOutcome::NotFound, diagnostics }
}

/// Looks for the first and last non-empty lines of the requested text. Both
/// being present means the caller is looking at the right region of a file
/// that has since changed.
fn context_is_present(content: &str, old_text: &str) -> bool {
    let mut non_empty = old_text.lines().filter(|line| !line.trim().is_empty());
    let Some(first) = non_empty.next() else { return false };
    let last = non_empty.last().unwrap_or(first);
    content.contains(first) && content.contains(last)
}
