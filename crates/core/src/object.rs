//! Versioned object identities.

use crate::path::RepoPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A content hash as a lowercase hex string.
///
/// Both SHA-1 (40 chars) and SHA-256 (64 chars) object formats are accepted.
/// Identical bytes always produce the same hash, which is what makes the hash
/// usable verbatim as an HTTP entity tag.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Parse from a hex string, validating length and alphabet.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.len() != 40 && s.len() != 64 {
            return Err(crate::Error::InvalidHash(format!(
                "expected 40 or 64 hex chars, got {}",
                s.len()
            )));
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidHash(format!(
                "invalid character in hash: {c}"
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The strong entity tag for this hash (the hex digest in double quotes).
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.0[..12])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File-system type and permission bits as recorded in a tree entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileMode(u32);

impl FileMode {
    pub const TREE: FileMode = FileMode(0o040000);
    pub const REGULAR: FileMode = FileMode(0o100644);
    pub const EXECUTABLE: FileMode = FileMode(0o100755);
    pub const SYMLINK: FileMode = FileMode(0o120000);
    pub const GITLINK: FileMode = FileMode(0o160000);

    const TYPE_MASK: u32 = 0o170000;

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether the entry is a symbolic link.
    pub fn is_symlink(self) -> bool {
        self.0 & Self::TYPE_MASK == Self::SYMLINK.0
    }

    /// Whether the entry is a regular file (executable or not).
    pub fn is_regular(self) -> bool {
        self.0 & Self::TYPE_MASK == 0o100000
    }

    pub fn is_executable(self) -> bool {
        self.is_regular() && self.0 & 0o111 != 0
    }
}

impl fmt::Debug for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileMode({:06o})", self.0)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.0)
    }
}

/// Object category. Only blobs are servable as content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Blob,
    Tree,
    /// A submodule reference.
    Commit,
    Other,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one versioned object at a path on the branch tip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectIdentity {
    pub mode: FileMode,
    pub kind: ObjectKind,
    pub content_hash: ContentHash,
    /// Byte length. Advisory only.
    pub size: u64,
    /// The path this identity was resolved for.
    pub path: RepoPath,
}

impl ObjectIdentity {
    pub fn is_blob(&self) -> bool {
        self.kind == ObjectKind::Blob
    }

    /// A blob whose content is a link target rather than file bytes.
    pub fn is_symlink(&self) -> bool {
        self.is_blob() && self.mode.is_symlink()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA1: &str = "6a1f0e1014bc39d6fd9ee9b59df90f076dff00b8";

    #[test]
    fn content_hash_accepts_sha1_and_sha256() {
        assert!(ContentHash::from_hex(SHA1).is_ok());
        assert!(ContentHash::from_hex(&"ab".repeat(32)).is_ok());
    }

    #[test]
    fn content_hash_normalizes_case() {
        let hash = ContentHash::from_hex(&SHA1.to_uppercase()).unwrap();
        assert_eq!(hash.as_str(), SHA1);
    }

    #[test]
    fn content_hash_rejects_bad_input() {
        assert!(ContentHash::from_hex("abc").is_err());
        assert!(ContentHash::from_hex(&"zz".repeat(20)).is_err());
    }

    #[test]
    fn content_hash_etag_is_quoted() {
        let hash = ContentHash::from_hex(SHA1).unwrap();
        assert_eq!(hash.etag(), format!("\"{SHA1}\""));
    }

    #[test]
    fn file_mode_classification() {
        assert!(FileMode::SYMLINK.is_symlink());
        assert!(!FileMode::REGULAR.is_symlink());
        assert!(FileMode::REGULAR.is_regular());
        assert!(!FileMode::REGULAR.is_executable());
        assert!(FileMode::EXECUTABLE.is_executable());
        assert!(!FileMode::TREE.is_regular());
        assert_eq!(FileMode::SYMLINK.to_string(), "120000");
    }

    #[test]
    fn symlink_identity_must_be_a_blob() {
        let identity = ObjectIdentity {
            mode: FileMode::SYMLINK,
            kind: ObjectKind::Blob,
            content_hash: ContentHash::from_hex(SHA1).unwrap(),
            size: 9,
            path: RepoPath::parse("latest").unwrap(),
        };
        assert!(identity.is_symlink());

        let tree = ObjectIdentity {
            kind: ObjectKind::Tree,
            ..identity
        };
        assert!(!tree.is_symlink());
        assert!(!tree.is_blob());
    }
}
