//! Backup identifiers.
//!
//! The shape is `YYYYMMDD-HHMMSS-<random>` with the suffix drawn from the
//! operating system's CSPRNG; an identifier is never derivable from its
//! creation time alone. Client-supplied identifiers are validated against
//! the canonical pattern before they get anywhere near a filesystem path.

use std::fmt;
use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;

use crate::error::{OpError, OpResult};
use crate::rng::random_token;

/// Random suffix length for generated identifiers.
const SUFFIX_LEN: usize = 10;

fn id_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{8}-\d{6}-[A-Za-z0-9_-]{1,32}$").expect("backup id pattern compiles")
    })
}

/// Validated backup identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupId(String);

impl BackupId {
    /// Creates a fresh identifier from the current local time and a
    /// cryptographically random suffix.
    pub fn generate() -> Self {
        Self(format!("{}-{}", Local::now().format("%Y%m%d-%H%M%S"), random_token(SUFFIX_LEN)))
    }

    /// Validates a client-supplied identifier. Anything not matching the
    /// canonical pattern is rejected before any filesystem access.
    pub fn parse(raw: &str) -> OpResult<Self> {
        if id_regex().is_match(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(OpError::validation(format!("malformed backup id: {raw:?}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
