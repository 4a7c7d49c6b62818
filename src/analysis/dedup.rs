// src/analysis/dedup.rs

use crate::error::{Error, Result};
use crate::ordering::commit_ids;
use git2::{Oid, Repository};
use indicatif::{ParallelProgressIterator, ProgressBar};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::warn;

pub type CommitSet = HashSet<Oid>;

/// Every commit reachable from HEAD in the repository at `path`.
pub fn repository_commits(path: &Path) -> Result<CommitSet> {
    let repo = Repository::open(path).map_err(|e| Error::repository_state(path, e.message()))?;
    commit_ids(&repo)
}

/// Commit sets of all repositories that could be read. Failures are logged.
pub fn commits_for_all(paths: &[PathBuf]) -> BTreeMap<PathBuf, CommitSet> {
    let mut sets = BTreeMap::new();
    for path in paths {
        match repository_commits(path) {
            Ok(commits) => {
                sets.insert(path.clone(), commits);
            }
            Err(e) => warn!("Failed to get commits at {}: {}", path.display(), e),
        }
    }
    sets
}

pub fn common_commits(a: &CommitSet, b: &CommitSet) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|id| large.contains(id)).count()
}

/// All pairs of projects sharing more than `threshold` commits, each pair
/// listed once in path order.
pub fn find_duplicates(sets: &BTreeMap<PathBuf, CommitSet>, threshold: usize) -> Vec<(PathBuf, PathBuf)> {
    let projects: Vec<(&PathBuf, &CommitSet)> = sets.iter().collect();
    let mut duplicates = Vec::new();
    for (i, (first, first_commits)) in projects.iter().enumerate() {
        for (second, second_commits) in &projects[i + 1..] {
            if common_commits(first_commits, second_commits) > threshold {
                duplicates.push(((*first).clone(), (*second).clone()));
            }
        }
    }
    duplicates
}

/// Compares many repositories at once. Commit sets are loaded and compared
/// on the rayon pool; every base project is one task and results meet in a
/// shared map.
pub struct ParallelDeduplicator {
    threshold: usize,
    show_progress: bool,
}

impl ParallelDeduplicator {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, len: usize, message: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_message(message);
        bar
    }

    /// Map from each base project to the later projects it duplicates.
    pub fn find_duplicates(&self, projects: &[PathBuf]) -> BTreeMap<PathBuf, Vec<PathBuf>> {
        let mut projects = projects.to_vec();
        projects.sort();

        let sets: Vec<Option<CommitSet>> = projects
            .par_iter()
            .progress_with(self.progress_bar(projects.len(), "Reading commits"))
            .map(|path| match repository_commits(path) {
                Ok(commits) => Some(commits),
                Err(e) => {
                    warn!("Failed to get commits at {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        let duplicates: Mutex<BTreeMap<PathBuf, Vec<PathBuf>>> = Mutex::new(BTreeMap::new());
        (0..projects.len())
            .into_par_iter()
            .progress_with(self.progress_bar(projects.len(), "Comparing repositories"))
            .for_each(|i| {
                let Some(base) = &sets[i] else {
                    return;
                };
                for j in i + 1..projects.len() {
                    let Some(other) = &sets[j] else {
                        continue;
                    };
                    if common_commits(base, other) > self.threshold {
                        duplicates
                            .lock()
                            .entry(projects[i].clone())
                            .or_default()
                            .push(projects[j].clone());
                    }
                }
            });

        let mut duplicates = duplicates.into_inner();
        for others in duplicates.values_mut() {
            others.sort();
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use std::fs;

    /// Three repositories: `fork` shares two commits with `origin`,
    /// `other` shares nothing.
    fn projects() -> (tempfile::TempDir, Vec<PathBuf>) {
        let root = tempfile::tempdir().unwrap();
        let origin = root.path().join("origin");
        let fork = root.path().join("fork");
        let other = root.path().join("other");

        let repo = Repository::init(&origin).unwrap();
        commit_files(&repo, &[("a", "1")], "one", 1_000);
        commit_files(&repo, &[("a", "2")], "two", 2_000);

        let fork_repo = Repository::clone(origin.to_str().unwrap(), &fork).unwrap();
        commit_files(&fork_repo, &[("b", "3")], "three", 3_000);

        let other_repo = Repository::init(&other).unwrap();
        commit_files(&other_repo, &[("z", "z")], "z", 1_000);

        fs::create_dir(root.path().join("not-a-repo")).unwrap();

        let paths = crate::analysis::repository_dirs(root.path()).unwrap();
        (root, paths)
    }

    #[test]
    fn common_commit_count() {
        let a: CommitSet = [Oid::from_str("01").unwrap(), Oid::from_str("02").unwrap()].into();
        let b: CommitSet = [Oid::from_str("02").unwrap(), Oid::from_str("03").unwrap()].into();
        assert_eq!(common_commits(&a, &b), 1);
        assert_eq!(common_commits(&a, &a), 2);
    }

    #[test]
    fn sequential_finds_forks() {
        let (root, paths) = projects();
        let sets = commits_for_all(&paths);
        assert_eq!(sets.len(), 3);

        let pairs = find_duplicates(&sets, 1);
        assert_eq!(pairs, vec![(root.path().join("fork"), root.path().join("origin"))]);

        assert!(find_duplicates(&sets, 2).is_empty());
    }

    #[test]
    fn parallel_agrees_with_sequential() {
        let (root, paths) = projects();

        let found = ParallelDeduplicator::new(1).find_duplicates(&paths);

        assert_eq!(found.len(), 1);
        assert_eq!(found[&root.path().join("fork")], vec![root.path().join("origin")]);
    }
}
