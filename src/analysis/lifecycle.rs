// src/analysis/lifecycle.rs

//! How long lines live before they are deleted or replaced.
//!
//! The first pass diffs every single-parent commit against its parent and
//! files the edits under the parent. The second pass checks out each of those
//! parents and blames the lines the child removed, giving the time between
//! the line's introduction and its removal.

use crate::diff::{DiffVisitor, EditListWalker, PathFilter};
use crate::error::{Error, Result};
use crate::model::{CommitRecord, DiffEntry, EditKind, EditList};
use crate::ordering::CommitOrdering;
use crate::walker::{CommitWalker, WalkEnd, WalkWindow};
use crate::worktree::{FileVisitor, Terminator, WalkerConfig, WorkingTreeWalker};
use git2::{BlameOptions, Oid, Repository};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Edits a child commit made to one file, stamped with the child's time.
#[derive(Debug, Clone)]
pub struct DiffEdits {
    pub entry: DiffEntry,
    pub edits: EditList,
    pub timestamp: i64,
}

/// Lifetime of one removed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineAge {
    /// Commit the line was removed from
    pub commit: Oid,
    pub path: PathBuf,
    /// 0-based line number in `commit`
    pub line: usize,
    /// Seconds from the commit that introduced the line to its removal
    pub age: i64,
}

#[derive(Debug, Default)]
struct EditCollector {
    by_parent: BTreeMap<Oid, Vec<DiffEdits>>,
}

impl DiffVisitor for EditCollector {
    fn visit_diff(&mut self, entry: &DiffEntry, edits: &EditList, commit: &CommitRecord) -> Result<()> {
        let Some(parent) = commit.first_parent() else {
            return Ok(());
        };
        self.by_parent.entry(parent).or_default().push(DiffEdits {
            entry: entry.clone(),
            edits: edits.clone(),
            timestamp: commit.time,
        });
        Ok(())
    }

    fn diff_completed(&mut self) {
        debug!("Collected edits for {} parent commits", self.by_parent.len());
    }
}

struct BlameRetriever {
    repo: Repository,
    by_parent: BTreeMap<Oid, Vec<DiffEdits>>,
    ages: Vec<LineAge>,
}

impl BlameRetriever {
    fn blame_lines(&mut self, commit: Oid, path: &Path, lines: std::ops::Range<usize>, changed_at: i64) -> Result<()> {
        let mut options = BlameOptions::new();
        options.newest_commit(commit).ignore_whitespace(true);
        let blame = self.repo.blame_file(path, Some(&mut options))?;

        for line in lines {
            let hunk = blame.get_line(line + 1).ok_or_else(|| Error::ObjectAccess {
                id: commit.to_string(),
                reason: format!("no blame for line {} of {}", line + 1, path.display()),
            })?;
            let source = self.repo.find_commit(hunk.final_commit_id())?;
            self.ages.push(LineAge {
                commit,
                path: path.to_path_buf(),
                line,
                age: changed_at - source.time().seconds(),
            });
        }
        Ok(())
    }
}

impl FileVisitor for BlameRetriever {
    fn is_visitable(&mut self, commit: &CommitRecord) -> bool {
        self.by_parent.contains_key(&commit.id)
    }

    fn visit_files(&mut self, commit: &CommitRecord, _workdir: &Path) -> Result<()> {
        let Some(diffs) = self.by_parent.remove(&commit.id) else {
            return Ok(());
        };
        for diff in &diffs {
            for edit in diff.edits.iter() {
                if !matches!(edit.kind(), EditKind::Delete | EditKind::Replace) {
                    continue;
                }
                if let Err(e) = self.blame_lines(commit.id, &diff.entry.old_path, edit.begin_a..edit.end_a, diff.timestamp) {
                    warn!("Failed to blame {} at {}: {}", diff.entry.old_path.display(), commit.id, e);
                }
            }
        }
        Ok(())
    }

    fn on_complete(&mut self) {
        info!("Blamed {} removed lines", self.ages.len());
    }
}

pub struct LineLifecycle {
    repo_dir: PathBuf,
    filter: PathFilter,
    config: WalkerConfig,
}

impl LineLifecycle {
    pub fn new(repo_dir: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            filter,
            config: WalkerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WalkerConfig) -> Self {
        self.config = config;
        self
    }

    fn open(&self) -> Result<Repository> {
        Repository::open(&self.repo_dir).map_err(|e| Error::repository_state(&self.repo_dir, e.message()))
    }

    /// Line ages for the commits in `window` of the topological order.
    /// A termination request ends the blame pass early with the ages found
    /// so far.
    pub fn calculate(&self, window: WalkWindow, terminator: &Terminator) -> Result<Vec<LineAge>> {
        let repo = self.open()?;
        let mut edits = EditListWalker::new(&repo, self.filter.clone(), EditCollector::default());
        let report = CommitWalker::new(&repo, CommitOrdering::Topological).walk(&mut edits, window);
        if let WalkEnd::Failed(e) = report.end {
            return Err(e);
        }
        let by_parent = edits.into_visitor().by_parent;

        let mut retriever = BlameRetriever {
            repo: self.open()?,
            by_parent,
            ages: Vec::new(),
        };
        let walker = WorkingTreeWalker::from_repository(repo, CommitOrdering::Topological, self.config.clone())?;
        let report = walker.walk(&mut retriever, window, terminator);
        if !report.restored {
            return Err(Error::repository_state(
                &self.repo_dir,
                format!("left on temporary branch {}", self.config.temp_branch),
            ));
        }
        if let WalkEnd::Failed(e) = report.walk.end {
            return Err(e);
        }
        Ok(retriever.ages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use std::time::Duration;

    fn config() -> WalkerConfig {
        WalkerConfig {
            grace_period: Duration::ZERO,
            ..WalkerConfig::default()
        }
    }

    #[test]
    fn ages_of_replaced_and_deleted_lines() {
        let (dir, repo) = init_repo();
        commit_files(&repo, &[("a.txt", "l1\nl2\nl3\n")], "add", 1_000);
        commit_files(&repo, &[("a.txt", "l1\nX\nl3\n")], "replace", 5_000);
        commit_files(&repo, &[("a.txt", "X\nl3\n")], "delete", 9_000);
        let head_before = head_ref_name(&repo);

        let ages = LineLifecycle::new(dir.path(), PathFilter::All)
            .with_config(config())
            .calculate(WalkWindow::all(), &Terminator::new())
            .unwrap();

        let found: Vec<(usize, i64)> = ages.iter().map(|a| (a.line, a.age)).collect();
        assert_eq!(found, vec![(1, 4_000), (0, 8_000)]);
        assert!(ages.iter().all(|a| a.path == Path::new("a.txt")));

        let repo = Repository::open(dir.path()).unwrap();
        assert_eq!(head_ref_name(&repo), head_before);
    }

    #[test]
    fn filtered_paths_produce_nothing() {
        let (dir, repo) = init_repo();
        commit_files(&repo, &[("a.txt", "1\n2\n")], "add", 1_000);
        commit_files(&repo, &[("a.txt", "1\n")], "delete", 2_000);

        let ages = LineLifecycle::new(dir.path(), PathFilter::suffixes([".rs"]))
            .with_config(config())
            .calculate(WalkWindow::all(), &Terminator::new())
            .unwrap();
        assert!(ages.is_empty());
    }

    #[test]
    fn pure_additions_have_no_ages() {
        let (dir, repo) = init_repo();
        commit_files(&repo, &[("a.txt", "1\n")], "add", 1_000);
        commit_files(&repo, &[("a.txt", "1\n2\n")], "grow", 2_000);

        let ages = LineLifecycle::new(dir.path(), PathFilter::All)
            .with_config(config())
            .calculate(WalkWindow::all(), &Terminator::new())
            .unwrap();
        assert!(ages.is_empty());
    }
}
