//! Document pack registry.
//!
//! Built once at startup from the `[packs.<name>]` configuration tables and
//! read-only afterwards.

use docity_core::config::PackConfig;
use docity_core::{DocumentPack, PackName, RepoPath};
use docity_repo::ObjectResolver;
use std::collections::BTreeMap;

/// Validated document packs, keyed by name.
#[derive(Debug, Default)]
pub struct PackRegistry {
    packs: BTreeMap<String, DocumentPack>,
    rejected: BTreeMap<String, Vec<String>>,
}

impl PackRegistry {
    /// Validate every configured pack and keep the ones that pass.
    ///
    /// A pack is rejected when its name is not a single path component, its
    /// index page is missing or unsafe, or its repository cannot be opened.
    /// Rejections are logged and kept in [`rejected`](Self::rejected).
    pub async fn load(configs: &BTreeMap<String, PackConfig>, resolver: &ObjectResolver) -> Self {
        let mut registry = Self::default();

        for (name, config) in configs {
            let mut problems = Vec::new();

            let pack_name = match PackName::new(name.as_str()) {
                Ok(pack_name) => Some(pack_name),
                Err(e) => {
                    problems.push(format!("invalid pack name: {e}"));
                    None
                }
            };

            let index_page = if config.index_page.trim().is_empty() {
                problems.push("index_page is not set".to_string());
                None
            } else {
                match RepoPath::parse(&config.index_page) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        problems.push(format!("invalid index_page: {e}"));
                        None
                    }
                }
            };

            if let Some(pack_name) = &pack_name
                && !resolver.is_valid_repository(pack_name.as_str()).await
            {
                problems.push(format!(
                    "repository {pack_name} is missing or not a valid git repository"
                ));
            }

            match (pack_name, index_page) {
                (Some(pack_name), Some(index_page)) if problems.is_empty() => {
                    tracing::info!(pack = %pack_name, index_page = %index_page, "Registered document pack");
                    let pack = DocumentPack::new(pack_name, index_page, config.description.clone());
                    registry.insert(pack);
                }
                _ => {
                    tracing::warn!(pack = %name, problems = ?problems, "Rejected document pack");
                    registry.rejected.insert(name.clone(), problems);
                }
            }
        }

        registry
    }

    /// Build a registry from already validated packs.
    pub fn from_packs(packs: impl IntoIterator<Item = DocumentPack>) -> Self {
        let mut registry = Self::default();
        for pack in packs {
            registry.insert(pack);
        }
        registry
    }

    fn insert(&mut self, pack: DocumentPack) {
        self.packs.insert(pack.name().as_str().to_string(), pack);
    }

    pub fn lookup(&self, name: &str) -> Option<&DocumentPack> {
        self.packs.get(name)
    }

    /// Packs in name order.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentPack> {
        self.packs.values()
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    /// Rejected pack names with the reasons they were turned down.
    pub fn rejected(&self) -> &BTreeMap<String, Vec<String>> {
        &self.rejected
    }
}
