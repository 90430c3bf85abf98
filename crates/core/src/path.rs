//! Repository-relative paths.
//!
//! Every path that reaches a repository backend goes through [`RepoPath::parse`]
//! first. Parent-directory segments are rejected rather than resolved, so a
//! request can never name an object outside the repository tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized, slash-separated path relative to the repository root.
///
/// Invariants: non-empty, no leading slash, no empty, `.` or `..` segments,
/// no backslashes or control characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath(String);

impl RepoPath {
    /// Normalize a request-supplied sub-path.
    ///
    /// A single leading slash is stripped. Empty and `.` segments are dropped.
    /// A `..` segment, a second leading slash (absolute path), a backslash or a
    /// control character makes the whole path invalid.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let rest = raw.strip_prefix('/').unwrap_or(raw);
        if rest.starts_with('/') {
            return Err(crate::Error::InvalidPath(format!(
                "absolute path not allowed: {raw}"
            )));
        }
        check_characters(rest)?;

        let mut segments = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(crate::Error::InvalidPath(format!(
                        "parent directory segment not allowed: {raw}"
                    )));
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(crate::Error::InvalidPath("empty path".to_string()));
        }
        Ok(Self(segments.join("/")))
    }

    /// Resolve a symbolic link target relative to the directory holding `self`.
    ///
    /// `..` segments are followed here (link targets routinely use them) but
    /// may not climb above the repository root. Absolute targets are rejected.
    pub fn resolve_link(&self, target: &str) -> crate::Result<Self> {
        if target.starts_with('/') {
            return Err(crate::Error::InvalidPath(format!(
                "absolute link target not allowed: {target}"
            )));
        }
        check_characters(target)?;

        let mut segments: Vec<&str> = self.0.split('/').collect();
        segments.pop();
        for segment in target.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    if segments.pop().is_none() {
                        return Err(crate::Error::InvalidPath(format!(
                            "link target escapes repository: {target}"
                        )));
                    }
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(crate::Error::InvalidPath(format!(
                "link target resolves to repository root: {target}"
            )));
        }
        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Extension of the last segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }
}

fn check_characters(raw: &str) -> crate::Result<()> {
    if raw.contains('\\') {
        return Err(crate::Error::InvalidPath(format!(
            "backslash not allowed: {raw}"
        )));
    }
    if raw.chars().any(char::is_control) {
        return Err(crate::Error::InvalidPath(
            "control character not allowed".to_string(),
        ));
    }
    Ok(())
}

impl TryFrom<String> for RepoPath {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<RepoPath> for String {
    fn from(path: RepoPath) -> Self {
        path.0
    }
}

impl fmt::Debug for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoPath({})", self.0)
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
