//! HTTP request handlers.

pub mod health;
pub mod packs;
pub mod view;

pub use health::*;
pub use packs::*;
pub use view::*;
