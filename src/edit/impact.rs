//! Replacement impact analysis and risk grading.

use serde::Serialize;

use crate::config::RiskThresholds;

/// Graded risk of a proposed mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Result of analyzing a proposed replacement against current content.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    /// Disjoint left-to-right matches of the old text.
    pub occurrences: usize,
    /// `occurrences * |new_text| / |content|` as a percent. Replacements
    /// longer than the file push this past 100.
    pub change_ratio_percent: f64,
    pub risk_level: RiskLevel,
    /// True when the risk gate will refuse the mutation unless forced.
    /// Medium risk is surfaced in `factors` but does not trip the gate.
    pub is_risky: bool,
    /// Human-readable descriptions of the thresholds that fired.
    pub factors: Vec<String>,
}

/// Counts disjoint occurrences of `pattern`, scanning left to right and
/// advancing past the end of each match.
pub fn count_occurrences(content: &str, pattern: &str) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut index = 0;
    while let Some(position) = content[index..].find(pattern) {
        count += 1;
        index += position + pattern.len();
    }
    count
}

/// Computes the impact report for replacing `old_text` with `new_text`
/// everywhere in `content`.
pub fn analyze(
    content: &str,
    old_text: &str,
    new_text: &str,
    thresholds: &RiskThresholds,
) -> ImpactReport {
    grade(content.len(), count_occurrences(content, old_text), new_text.len(), thresholds)
}

/// Grades a replacement from its raw numbers. Callers that already know the
/// occurrence count (a single-splice replacement, a dry run over a diff)
/// come here directly.
pub fn grade(
    content_len: usize,
    occurrences: usize,
    new_text_len: usize,
    thresholds: &RiskThresholds,
) -> ImpactReport {
    let change_ratio_percent =
        (occurrences * new_text_len) as f64 / content_len.max(1) as f64 * 100.0;

    let mut factors = Vec::new();

    let ratio_level = if change_ratio_percent >= thresholds.critical_percent {
        factors.push(format!(
            "change ratio {change_ratio_percent:.1}% reaches the critical threshold ({}%)",
            thresholds.critical_percent
        ));
        RiskLevel::Critical
    } else if change_ratio_percent >= thresholds.high_percent {
        factors.push(format!(
            "change ratio {change_ratio_percent:.1}% reaches the high threshold ({}%)",
            thresholds.high_percent
        ));
        RiskLevel::High
    } else if change_ratio_percent >= thresholds.medium_percent {
        factors.push(format!(
            "change ratio {change_ratio_percent:.1}% reaches the medium threshold ({}%)",
            thresholds.medium_percent
        ));
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let count_level = if occurrences >= thresholds.high_occurrences {
        factors.push(format!(
            "{occurrences} occurrences reach the high threshold ({})",
            thresholds.high_occurrences
        ));
        RiskLevel::High
    } else if occurrences >= thresholds.medium_occurrences {
        factors.push(format!(
            "{occurrences} occurrences reach the medium threshold ({})",
            thresholds.medium_occurrences
        ));
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let risk_level = ratio_level.max(count_level);
    ImpactReport {
        occurrences,
        change_ratio_percent,
        risk_level,
        is_risky: risk_level >= RiskLevel::High,
        factors,
    }
}
