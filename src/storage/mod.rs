//! Storage for run-to-run state.
//!
//! Only the set of already reported announcement identities survives
//! between runs; see [`SeenStore`].

pub mod seen;

// Re-export for convenience
pub use seen::{SeenSet, SeenStore};
