// src/walker.rs

use crate::error::{Error, Result};
use crate::model::CommitRecord;
use crate::ordering::{repo_path, CommitOrdering};
use git2::Repository;
use tracing::{debug, warn};

/// Receives the commits of a walk in order.
pub trait CommitVisitor {
    /// Visit one commit. `Ok(false)` stops the walk; an error is logged and
    /// also stops it.
    fn visit(&mut self, commit: &CommitRecord) -> Result<bool>;

    /// Called exactly once after the walk, however it ended.
    fn walk_completed(&mut self) {}
}

/// Slice `[start, start + limit)` of the ordered commits to visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkWindow {
    pub start: usize,
    pub limit: usize,
}

impl WalkWindow {
    pub fn all() -> Self {
        Self { start: 0, limit: usize::MAX }
    }

    pub fn first(limit: usize) -> Self {
        Self { start: 0, limit }
    }

    pub fn range(start: usize, limit: usize) -> Self {
        Self { start, limit }
    }

    fn end(&self, len: usize) -> usize {
        self.start.saturating_add(self.limit).min(len)
    }
}

impl Default for WalkWindow {
    fn default() -> Self {
        Self::all()
    }
}

/// Why a walk ended.
#[derive(Debug)]
pub enum WalkEnd {
    /// Every commit in the window was visited.
    Exhausted,
    /// The visitor asked to stop, or a termination request was observed.
    Stopped,
    /// The ordering or a visitor failed. Already logged.
    Failed(Error),
}

#[derive(Debug)]
pub struct WalkReport {
    /// Number of commits handed to the visitor
    pub visited: usize,
    pub end: WalkEnd,
}

impl WalkReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.end, WalkEnd::Failed(_))
    }
}

/// Drives a [`CommitVisitor`] over the commits of one repository.
pub struct CommitWalker<'r> {
    repo: &'r Repository,
    ordering: CommitOrdering,
}

impl<'r> CommitWalker<'r> {
    pub fn new(repo: &'r Repository, ordering: CommitOrdering) -> Self {
        Self { repo, ordering }
    }

    pub fn walk<V: CommitVisitor + ?Sized>(&self, visitor: &mut V, window: WalkWindow) -> WalkReport {
        let report = self.visit_window(visitor, window);
        visitor.walk_completed();
        report
    }

    fn visit_window<V: CommitVisitor + ?Sized>(&self, visitor: &mut V, window: WalkWindow) -> WalkReport {
        let commits = match self.ordering.commits(self.repo) {
            Ok(commits) => commits,
            Err(e) => {
                warn!("Failed to order commits of {}: {}", repo_path(self.repo).display(), e);
                return WalkReport { visited: 0, end: WalkEnd::Failed(e) };
            }
        };

        let end = window.end(commits.len());
        debug!(
            "Walking commits {}..{} of {} in {}",
            window.start,
            end,
            commits.len(),
            repo_path(self.repo).display()
        );

        let mut visited = 0;
        for commit in commits.iter().take(end).skip(window.start) {
            visited += 1;
            match visitor.visit(commit) {
                Ok(true) => {}
                Ok(false) => return WalkReport { visited, end: WalkEnd::Stopped },
                Err(e) => {
                    warn!(
                        "Stopping walk of {} at {}: {}",
                        repo_path(self.repo).display(),
                        commit.id,
                        e
                    );
                    return WalkReport { visited, end: WalkEnd::Failed(e) };
                }
            }
        }
        WalkReport { visited, end: WalkEnd::Exhausted }
    }
}
