//! HTTP server for documentation kept in git repositories.
//!
//! This crate provides:
//! - The content handler serving `/view/<pack>/<path>` with entity tags and
//!   conditional GET
//! - The path cache and its sweep task
//! - The document pack registry and listing
//! - Health and Prometheus metrics endpoints

pub mod cache;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod mime;
pub mod registry;
pub mod routes;
pub mod state;

pub use cache::PathCache;
pub use error::ApiError;
pub use registry::PackRegistry;
pub use routes::create_router;
pub use state::AppState;
