//! Core domain types and shared logic for docity.
//!
//! This crate defines the data model used across the other crates:
//! - Object identities (content hash, mode, kind) of versioned blobs
//! - Normalized repository-relative paths
//! - Document packs and their names
//! - Configuration

pub mod config;
pub mod error;
pub mod object;
pub mod pack;
pub mod path;

pub use error::{Error, Result};
pub use object::{ContentHash, FileMode, ObjectIdentity, ObjectKind};
pub use pack::{DocumentPack, PackName, VIEW_PREFIX};
pub use path::RepoPath;
