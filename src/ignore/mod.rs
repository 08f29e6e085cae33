//! Gitignore-grammar ignore engine with stackable per-directory layers.
//!
//! Each [`IgnoreLayer`] binds an ordered rule set to the directory it was
//! found in; rules only apply to paths under that base. The walker pushes a
//! layer when it enters a directory containing an ignore file and evaluates
//! the stack for every entry: rules run in order across all layers and the
//! last match wins.

mod rules;
mod stack;

pub use rules::IgnoreRule;
pub use stack::{normalize_rel, IgnoreLayer, IgnoreStack};
