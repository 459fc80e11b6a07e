//! Action handlers and the dispatch registry.
//!
//! ## Adding a new action
//!
//! 1. Implement the [`Action`] trait in `mining.rs` (or a new file)
//! 2. Register it in [`ActionRegistry::new`]

mod mining;
mod registry;
mod traits;
mod types;

pub use registry::ActionRegistry;
pub use traits::Action;
pub use types::{ActionOutcome, Params};
