// src/analysis/keywords.rs

use crate::error::{Error, Result};
use crate::model::CommitRecord;
use crate::ordering::CommitOrdering;
use crate::walker::{CommitVisitor, CommitWalker, WalkEnd, WalkWindow};
use git2::Repository;
use std::path::Path;

/// Counts commits whose message contains at least one of the keywords.
/// Matching is case sensitive.
#[derive(Debug, Clone, Default)]
pub struct KeywordCounter {
    keywords: Vec<String>,
    matching: usize,
    total: usize,
}

impl KeywordCounter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn matches(&self, message: &str) -> bool {
        self.keywords.iter().any(|k| message.contains(k.as_str()))
    }

    pub fn matching(&self) -> usize {
        self.matching
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl CommitVisitor for KeywordCounter {
    fn visit(&mut self, commit: &CommitRecord) -> Result<bool> {
        self.total += 1;
        if self.matches(&commit.message) {
            self.matching += 1;
        }
        Ok(true)
    }
}

pub fn count_matching_commits(repo: &Repository, keywords: &[String]) -> Result<usize> {
    let mut counter = KeywordCounter::new(keywords.iter().cloned());
    let report = CommitWalker::new(repo, CommitOrdering::Topological).walk(&mut counter, WalkWindow::all());
    match report.end {
        WalkEnd::Failed(e) => Err(e),
        _ => Ok(counter.matching()),
    }
}

pub fn count_matching_commits_at(path: &Path, keywords: &[String]) -> Result<usize> {
    let repo = Repository::open(path).map_err(|e| Error::repository_state(path, e.message()))?;
    count_matching_commits(&repo, keywords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn counts_each_matching_commit_once() {
        let (_dir, repo) = init_repo();
        commit_files(&repo, &[("a", "1")], "Fix crash and fix typo", 1_000);
        commit_files(&repo, &[("a", "2")], "Add feature", 2_000);
        commit_files(&repo, &[("a", "3")], "bug: fix parser", 3_000);
        commit_files(&repo, &[("a", "4")], "FIX upper case", 4_000);

        let keywords = vec!["fix".to_string(), "bug".to_string()];
        assert_eq!(count_matching_commits(&repo, &keywords).unwrap(), 2);
    }

    #[test]
    fn counter_tracks_totals() {
        let mut counter = KeywordCounter::new(["refactor"]);
        counter.visit(&record(1, "A", "a@a", 0)).unwrap();
        let mut commit = record(2, "A", "a@a", 1);
        commit.message = "refactor walker".into();
        counter.visit(&commit).unwrap();

        assert_eq!(counter.total(), 2);
        assert_eq!(counter.matching(), 1);
    }

    #[test]
    fn empty_repository_has_no_matches() {
        let (dir, _repo) = init_repo();
        assert_eq!(count_matching_commits_at(dir.path(), &["x".to_string()]).unwrap(), 0);
    }

    #[test]
    fn missing_repository_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = count_matching_commits_at(&dir.path().join("nope"), &[]);
        assert!(matches!(result, Err(Error::RepositoryState { .. })));
    }
}
