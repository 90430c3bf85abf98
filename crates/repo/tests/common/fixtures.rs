use git2::{Oid, Repository, Signature};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

/// One entry of a commit built by [`GitFixture::commit`].
#[allow(dead_code)]
pub enum Entry<'a> {
    File(&'a [u8]),
    Executable(&'a [u8]),
    Link(&'a str),
}

enum Node {
    Blob(i32, Oid),
    Dir(BTreeMap<String, Node>),
}

/// A temporary directory of bare repositories.
pub struct GitFixture {
    dir: TempDir,
}

#[allow(dead_code)]
impl GitFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn init(&self, name: &str) -> Repository {
        Repository::init_bare(self.root().join(name)).unwrap()
    }

    /// Commit a full snapshot of `entries` on top of HEAD.
    pub fn commit(&self, name: &str, entries: &[(&str, Entry<'_>)]) -> Oid {
        let repo = Repository::open(self.root().join(name)).unwrap();

        let mut root = BTreeMap::new();
        for (path, entry) in entries {
            let (mode, oid) = match entry {
                Entry::File(data) => (0o100644, repo.blob(data).unwrap()),
                Entry::Executable(data) => (0o100755, repo.blob(data).unwrap()),
                Entry::Link(target) => (0o120000, repo.blob(target.as_bytes()).unwrap()),
            };
            let segments: Vec<&str> = path.split('/').collect();
            insert(&mut root, &segments, mode, oid);
        }
        let tree_id = write_tree(&repo, &root);
        let tree = repo.find_tree(tree_id).unwrap();

        let sig = Signature::now("docity", "docity@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "snapshot", &tree, &parents)
            .unwrap()
    }

    /// Hash of `path` in the HEAD tree, as lowercase hex.
    pub fn hash_at_head(&self, name: &str, path: &str) -> String {
        let repo = Repository::open(self.root().join(name)).unwrap();
        let tree = repo.head().unwrap().peel_to_tree().unwrap();
        tree.get_path(Path::new(path)).unwrap().id().to_string()
    }
}

fn insert(map: &mut BTreeMap<String, Node>, segments: &[&str], mode: i32, oid: Oid) {
    match segments {
        [name] => {
            map.insert(name.to_string(), Node::Blob(mode, oid));
        }
        [dir, rest @ ..] => {
            let node = map
                .entry(dir.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            if let Node::Dir(children) = node {
                insert(children, rest, mode, oid);
            }
        }
        [] => {}
    }
}

fn write_tree(repo: &Repository, map: &BTreeMap<String, Node>) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    for (name, node) in map {
        match node {
            Node::Blob(mode, oid) => {
                builder.insert(name.as_str(), *oid, *mode).unwrap();
            }
            Node::Dir(children) => {
                let oid = write_tree(repo, children);
                builder.insert(name.as_str(), oid, 0o040000).unwrap();
            }
        }
    }
    builder.write().unwrap()
}
