//! Document packs.

use crate::path::RepoPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// URL prefix under which pack content is served.
pub const VIEW_PREFIX: &str = "/view";

/// Name of a document pack. Doubles as the on-disk repository identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackName(String);

impl PackName {
    /// Create from a string, validating that it names a single path component.
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidPackName("name is empty".to_string()));
        }
        if name == "." || name == ".." {
            return Err(crate::Error::InvalidPackName(format!(
                "reserved name: {name}"
            )));
        }
        if let Some(c) = name
            .chars()
            .find(|c| matches!(c, '/' | '\\') || c.is_control())
        {
            return Err(crate::Error::InvalidPackName(format!(
                "invalid character {c:?} in {name:?}"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PackName {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<PackName> for String {
    fn from(name: PackName) -> Self {
        name.0
    }
}

impl fmt::Debug for PackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackName({})", self.0)
    }
}

impl fmt::Display for PackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A browsable document collection backed by one repository.
///
/// Packs are built once at startup and never change afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentPack {
    name: PackName,
    index_page: RepoPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl DocumentPack {
    pub fn new(name: PackName, index_page: RepoPath, description: Option<String>) -> Self {
        Self {
            name,
            index_page,
            description,
        }
    }

    pub fn name(&self) -> &PackName {
        &self.name
    }

    /// Identifier of the backing repository.
    pub fn repository_id(&self) -> &str {
        self.name.as_str()
    }

    /// Page served when a request names the pack root.
    pub fn index_page(&self) -> &RepoPath {
        &self.index_page
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// URL path of the pack's index page.
    pub fn view_path(&self) -> String {
        format!("{VIEW_PREFIX}/{}/{}", self.name, self.index_page)
    }
}
