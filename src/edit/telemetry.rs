//! Edit telemetry counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Telemetry class of one edit, judged by replacement length.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditClass {
    /// Replacement under 100 bytes. The efficient agent pattern.
    Targeted,
    Standard,
    /// Replacement over 1000 bytes.
    FullRewrite,
}

impl EditClass {
    pub fn for_replacement(new_text_len: usize) -> Self {
        if new_text_len < 100 {
            Self::Targeted
        } else if new_text_len > 1000 {
            Self::FullRewrite
        } else {
            Self::Standard
        }
    }
}

/// Process-lifetime edit counters.
#[derive(Debug, Default)]
pub struct Telemetry {
    targeted: AtomicU64,
    standard: AtomicU64,
    full_rewrite: AtomicU64,
    total_bytes: AtomicU64,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed edit.
    pub fn record_edit(&self, new_text_len: usize) {
        match EditClass::for_replacement(new_text_len) {
            EditClass::Targeted => self.targeted.fetch_add(1, Ordering::Relaxed),
            EditClass::Standard => self.standard.fetch_add(1, Ordering::Relaxed),
            EditClass::FullRewrite => self.full_rewrite.fetch_add(1, Ordering::Relaxed),
        };
        self.total_bytes.fetch_add(new_text_len as u64, Ordering::Relaxed);
    }

    /// Point-in-time summary for the telemetry operation.
    pub fn summary(&self) -> TelemetrySummary {
        let targeted = self.targeted.load(Ordering::Relaxed);
        let standard = self.standard.load(Ordering::Relaxed);
        let full_rewrite = self.full_rewrite.load(Ordering::Relaxed);
        let total_edits = targeted + standard + full_rewrite;
        let total_bytes = self.total_bytes.load(Ordering::Relaxed);
        TelemetrySummary {
            targeted,
            standard,
            full_rewrite,
            total_edits,
            average_bytes_per_edit: if total_edits == 0 {
                0.0
            } else {
                total_bytes as f64 / total_edits as f64
            },
        }
    }
}

/// Snapshot of the edit counters.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySummary {
    pub targeted: u64,
    pub standard: u64,
    pub full_rewrite: u64,
    pub total_edits: u64,
    pub average_bytes_per_edit: f64,
}
