//! The line scanner and the compiled-pattern cache.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::error::{OpError, OpResult};

/// One pattern hit inside a file.
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub file: String,
    /// 1-based line number.
    pub line_number: usize,
    pub line_content: String,
    /// 0-based byte offset of the match within the line.
    pub match_start: usize,
    pub match_end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_lines: Option<Vec<String>>,
}

/// Knobs for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
    /// Lines of context captured around each match; zero disables capture.
    pub context_lines: usize,
    /// Hard cap on returned matches.
    pub max_matches: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { case_sensitive: true, whole_word: false, context_lines: 0, max_matches: 500 }
    }
}

/// Key into the compiled-pattern cache.
type PatternKey = (String, bool, bool);

fn pattern_cache() -> &'static Mutex<HashMap<PatternKey, Regex>> {
    static CACHE: OnceLock<Mutex<HashMap<PatternKey, Regex>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Compiles (or fetches) the regex for a pattern. Compilation results are
/// cached behind a mutex; hot search paths pay the compile cost once.
pub fn compiled(pattern: &str, case_sensitive: bool, whole_word: bool) -> OpResult<Regex> {
    let key = (pattern.to_owned(), case_sensitive, whole_word);
    if let Some(regex) = pattern_cache().lock().expect("pattern cache poisoned").get(&key) {
        return Ok(regex.clone());
    }
    let source = if whole_word {
        format!(r"\b(?:{pattern})\b")
    } else {
        pattern.to_owned()
    };
    let regex = RegexBuilder::new(&source)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|err| OpError::validation(format!("invalid search pattern: {err}")))?;
    pattern_cache()
        .lock()
        .expect("pattern cache poisoned")
        .insert(key, regex.clone());
    Ok(regex)
}

/// Scans content line by line, emitting a match record per regex hit.
///
/// The cancellation token is polled at every line boundary. Match offsets
/// come from the regex engine directly; see [`locate_literal`] for the
/// literal path used when an exact offset has to be estimated.
pub fn scan_lines(
    file_label: &str,
    content: &str,
    regex: &Regex,
    options: &ScanOptions,
    cancel: &CancelToken,
) -> OpResult<Vec<SearchMatch>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut matches = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        cancel.check()?;
        for hit in regex.find_iter(line) {
            if matches.len() >= options.max_matches {
                return Ok(matches);
            }
            matches.push(SearchMatch {
                file: file_label.to_owned(),
                line_number: index + 1,
                line_content: (*line).to_owned(),
                match_start: hit.start(),
                match_end: hit.end(),
                context_lines: capture_context(&lines, index, options.context_lines),
            });
        }
    }
    Ok(matches)
}

/// Locates a literal needle inside a (possibly normalized) line, falling
/// back to a pattern-length estimate at offset zero when the exact offset
/// cannot be recovered from the normalized form.
pub fn locate_literal(line: &str, needle: &str) -> (usize, usize) {
    match line.find(needle) {
        Some(start) => (start, start + needle.len()),
        None => (0, needle.len().min(line.len())),
    }
}

fn capture_context(lines: &[&str], index: usize, context: usize) -> Option<Vec<String>> {
    if context == 0 {
        return None;
    }
    let start = index.saturating_sub(context);
    let end = (index + context + 1).min(lines.len());
    Some(lines[start..end].iter().map(|line| (*line).to_owned()).collect())
}
