// src/lib.rs

//! Walks the commit history of git repositories, optionally materializing
//! each commit in the working tree, and extracts per-commit tree diffs with
//! line-level edit lists.

pub mod analysis;
pub mod cleanup;
pub mod diff;
pub mod error;
pub mod identity;
pub mod model;
pub mod ordering;
pub mod signal;
pub mod walker;
pub mod worktree;

#[cfg(test)]
mod test_support;

pub use diff::{DiffVisitor, EditListWalker, PathFilter, TreeDiffExtractor};
pub use error::{Error, Result};
pub use model::{ChangeKind, CommitRecord, DiffEntry, Edit, EditKind, EditList};
pub use ordering::CommitOrdering;
pub use walker::{CommitVisitor, CommitWalker, WalkEnd, WalkReport, WalkWindow};
pub use worktree::{FileVisitor, Terminator, WalkerConfig, WorkingTreeWalker};
