//! Path normalization and access control.
//!
//! Every path the server touches flows through this gate before any other
//! I/O happens. Input paths arrive in four formats: native absolute, native
//! relative, drive-letter (`X:\...`), and WSL drive mount (`/mnt/x/...`).
//! Containment checks run on the symlink-resolved form of the candidate, so
//! a link pointing outside the allowed roots cannot smuggle an escape.

#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{OpError, OpResult};

/// Kind of host the server runs on, as far as path syntax is concerned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HostKind {
    /// Native Windows: `/mnt/x/...` input is translated to `X:\...`.
    Windows,
    /// Windows Subsystem for Linux: `X:\...` input is translated to `/mnt/x/...`.
    Wsl,
    /// Any other Unix host: both special forms pass through untranslated.
    Unix,
}

impl HostKind {
    /// Detects the host kind at startup.
    pub fn detect() -> Self {
        if cfg!(windows) {
            return Self::Windows;
        }
        let is_wsl = std::fs::read_to_string("/proc/version")
            .map(|v| v.to_ascii_lowercase().contains("microsoft"))
            .unwrap_or(false);
        if is_wsl {
            Self::Wsl
        } else {
            Self::Unix
        }
    }
}

/// Normalizes input paths and enforces the allowed-roots policy.
#[derive(Debug)]
pub struct PathGate {
    host: HostKind,
    /// Real (symlink-resolved) forms of the configured roots, computed once.
    resolved_roots: Vec<PathBuf>,
}

impl PathGate {
    /// Builds a gate for the given roots. Root paths are resolved here and
    /// never again; the policy is immutable after startup.
    pub fn new(roots: &[PathBuf], host: HostKind) -> Self {
        let resolved_roots = roots
            .iter()
            .map(|root| resolve_sync(root).unwrap_or_else(|_| lexical_clean(root)))
            .collect();
        Self { host, resolved_roots }
    }

    /// Gate for an unrestricted server (empty policy).
    pub fn unrestricted(host: HostKind) -> Self {
        Self { host, resolved_roots: Vec::new() }
    }

    /// True when no roots are configured.
    pub fn is_unrestricted(&self) -> bool {
        self.resolved_roots.is_empty()
    }

    /// Canonicalizes an input path to the host's native absolute form.
    ///
    /// Translation between drive-letter and WSL mount syntax happens here;
    /// everything else is made absolute and lexically cleaned.
    pub fn normalize(&self, input: &str) -> PathBuf {
        if self.host == HostKind::Windows {
            if let Some((letter, rest)) = split_wsl_mount(input) {
                let mut out = format!("{}:\\", letter.to_ascii_uppercase());
                out.push_str(&rest.replace('/', "\\"));
                return PathBuf::from(out);
            }
        }
        if self.host == HostKind::Wsl {
            if let Some((letter, rest)) = split_drive(input) {
                let mut out = format!("/mnt/{}", letter.to_ascii_lowercase());
                let rest = rest.replace('\\', "/");
                if !rest.is_empty() {
                    out.push('/');
                    out.push_str(rest.trim_start_matches('/'));
                }
                return PathBuf::from(out);
            }
        }
        let path = Path::new(input);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")).join(path)
        };
        lexical_clean(&absolute)
    }

    /// Resolves symlinks on `candidate` and tests component-wise containment
    /// against every configured root. Returns the real path on success.
    pub async fn check_allowed(&self, candidate: &Path) -> OpResult<PathBuf> {
        let real = resolve(candidate).await.map_err(OpError::Io)?;
        if self.resolved_roots.is_empty() {
            return Ok(real);
        }
        for root in &self.resolved_roots {
            // `starts_with` compares whole components, so `/a/b` can never
            // match a root of `/a/bcd`.
            if real.starts_with(root) {
                return Ok(real);
            }
        }
        Err(OpError::path(format!(
            "access denied: {} is outside the allowed roots",
            real.display()
        )))
    }

    /// Normalizes `input` and enforces the policy in one step.
    ///
    /// The returned path is the canonical form used for all subsequent I/O.
    pub async fn admit(&self, input: &str) -> OpResult<PathBuf> {
        let canonical = self.normalize(input);
        self.check_allowed(&canonical).await?;
        Ok(canonical)
    }
}

/// Splits `/mnt/<letter>/rest` into `(letter, rest)`.
fn split_wsl_mount(input: &str) -> Option<(char, &str)> {
    let rest = input.strip_prefix("/mnt/")?;
    let mut chars = rest.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() {
        return None;
    }
    match chars.next() {
        None => Some((letter, "")),
        Some('/') => Some((letter, &rest[2..])),
        Some(_) => None,
    }
}

/// Splits `<letter>:rest` into `(letter, rest)`.
fn split_drive(input: &str) -> Option<(char, &str)> {
    let mut chars = input.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() || chars.next() != Some(':') {
        return None;
    }
    Some((letter, &input[2..]))
}

/// Removes `.` and `..` components without touching the filesystem.
/// Excess `..` above an absolute root is dropped; relative paths keep it.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Resolves symlinks on `path`, tolerating a not-yet-existing tail.
///
/// The deepest existing ancestor is canonicalized and the missing components
/// are re-appended, so a write target that does not exist yet still gets a
/// meaningful containment check.
pub async fn resolve(path: &Path) -> io::Result<PathBuf> {
    let mut current = path.to_path_buf();
    let mut tail: Vec<OsString> = Vec::new();
    loop {
        match tokio::fs::canonicalize(&current).await {
            Ok(real) => {
                let mut out = real;
                for part in tail.iter().rev() {
                    out.push(part);
                }
                return Ok(out);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match (current.parent(), current.file_name()) {
                    (Some(parent), Some(name)) => {
                        tail.push(name.to_os_string());
                        current = parent.to_path_buf();
                    }
                    _ => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Blocking variant of [`resolve`], used only during startup.
fn resolve_sync(path: &Path) -> io::Result<PathBuf> {
    let mut current = path.to_path_buf();
    let mut tail: Vec<OsString> = Vec::new();
    loop {
        match std::fs::canonicalize(&current) {
            Ok(real) => {
                let mut out = real;
                for part in tail.iter().rev() {
                    out.push(part);
                }
                return Ok(out);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match (current.parent(), current.file_name()) {
                    (Some(parent), Some(name)) => {
                        tail.push(name.to_os_string());
                        current = parent.to_path_buf();
                    }
                    _ => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }
    }
}
