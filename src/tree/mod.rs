//! Directory tree walking logic
//!
//! This module builds the in-memory picture of a directory that every later
//! stage works from:
//!
//! - `PathFilter`: decides which entries take part in the walk
//! - `TreeWalker`: walks the root into an arena-backed `FileTree`

mod filter;
mod node;
mod utils;
mod walker;

// Re-export public types
pub use filter::PathFilter;
pub use node::{
    EntryId, EntryKind, Exclusion, FileEntry, FileTree, NodeBody, NodeId, RelPath, TreeNode,
};
pub use utils::{DEFAULT_IGNORED_NAMES, DEFAULT_SKIPPED_CONTENTS, compile_patterns, format_size};
pub use walker::TreeWalker;

pub(crate) use utils::matches_any;
