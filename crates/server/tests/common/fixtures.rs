//! Test fixtures: seeded in-memory repositories and real git repositories.

use docity_repo::MemoryBackend;
use git2::{Oid, Repository, Signature};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub const WELCOME: &str = "Hi";

/// The "hello" pack used across tests.
///
/// ```text
/// welcome.html          "Hi"
/// guide/intro.html
/// guide/v2/index.html
/// guide/latest     ->   v2/index.html
/// assets/site.css
/// Makefile
/// ```
pub fn hello_backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    seed_hello(&backend);
    backend
}

pub fn seed_hello(backend: &MemoryBackend) {
    backend.write_file("hello", "welcome.html", WELCOME).unwrap();
    backend
        .write_file("hello", "guide/intro.html", "<p>intro</p>")
        .unwrap();
    backend
        .write_file("hello", "guide/v2/index.html", "<p>v2</p>")
        .unwrap();
    backend
        .write_symlink("hello", "guide/latest", "v2/index.html")
        .unwrap();
    backend
        .write_file("hello", "assets/site.css", "body { margin: 0 }")
        .unwrap();
    backend.write_file("hello", "Makefile", "all:\n").unwrap();
}

/// One entry of a commit built by [`commit_files`].
#[allow(dead_code)]
pub enum GitEntry<'a> {
    File(&'a [u8]),
    Link(&'a str),
}

enum Node {
    Blob(i32, Oid),
    Dir(BTreeMap<String, Node>),
}

/// Create a bare repository at `dir` and commit `entries` as a snapshot.
#[allow(dead_code)]
pub fn commit_files(dir: &Path, entries: &[(&str, GitEntry<'_>)]) -> Oid {
    let repo = Repository::open_bare(dir).or_else(|_| Repository::init_bare(dir)).unwrap();

    let mut root = BTreeMap::new();
    for (path, entry) in entries {
        let (mode, oid) = match entry {
            GitEntry::File(data) => (0o100644, repo.blob(data).unwrap()),
            GitEntry::Link(target) => (0o120000, repo.blob(target.as_bytes()).unwrap()),
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

/// Hash of `path` in the HEAD tree of the repository at `dir`.
#[allow(dead_code)]
pub fn hash_at_head(dir: &Path, path: &str) -> String {
    let repo = Repository::open_bare(dir).unwrap();
    let tree = repo.head().unwrap().peel_to_tree().unwrap();
    tree.get_path(Path::new(path)).unwrap().id().to_string()
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
        let (oid, mode) = match node {
            Node::Blob(mode, oid) => (*oid, *mode),
            Node::Dir(children) => (write_tree(repo, children), 0o040000),
        };
        builder.insert(name.as_str(), oid, mode).unwrap();
    }
    builder.write().unwrap()
}
