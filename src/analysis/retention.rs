// src/analysis/retention.rs

use crate::error::Result;
use crate::identity::{ClusterId, CommitterIdentity, IdentityClusters};
use crate::model::CommitRecord;
use crate::ordering::topological_commits;
use git2::Repository;
use std::collections::BTreeMap;

/// Commits a committer needs to count as internal.
pub const INTERNAL_COMMITTER_LIMIT: usize = 20;

const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tally {
    commits: usize,
    first: i64,
    last: i64,
}

/// Internal versus external committers of one repository and how long the
/// internal ones stayed around.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalExternalData {
    pub internal: Vec<CommitterIdentity>,
    pub external: Vec<CommitterIdentity>,
    /// Mean days between first and last commit of internal committers,
    /// weighted by their number of commits
    pub internal_retention_days: Option<f64>,
}

impl InternalExternalData {
    pub fn build(repo: &Repository, limit: usize) -> Result<Self> {
        let commits = topological_commits(repo)?;
        Ok(Self::from_commits(&commits, limit))
    }

    /// Merge commits are ignored.
    pub fn from_commits(commits: &[CommitRecord], limit: usize) -> Self {
        let commits: Vec<&CommitRecord> = commits.iter().filter(|c| !c.is_merge()).collect();
        let identities: Vec<CommitterIdentity> = commits
            .iter()
            .map(|c| CommitterIdentity::from_author(&c.author))
            .collect();
        let clusters = IdentityClusters::from_identities(identities.iter().cloned());

        let mut tallies: BTreeMap<ClusterId, Tally> = BTreeMap::new();
        for (commit, identity) in commits.iter().zip(&identities) {
            let Some(cluster) = clusters.cluster_of(identity) else {
                continue;
            };
            tallies
                .entry(cluster)
                .and_modify(|t| {
                    t.commits += 1;
                    t.first = t.first.min(commit.time);
                    t.last = t.last.max(commit.time);
                })
                .or_insert(Tally {
                    commits: 1,
                    first: commit.time,
                    last: commit.time,
                });
        }

        let mut internal = Vec::new();
        let mut external = Vec::new();
        let mut weighted_days = 0.0;
        let mut weights = 0usize;
        for (cluster, tally) in tallies {
            let identity = clusters.representative(cluster).clone();
            if tally.commits >= limit {
                weighted_days += tally.commits as f64 * (tally.last - tally.first) as f64 / SECONDS_PER_DAY;
                weights += tally.commits;
                internal.push(identity);
            } else {
                external.push(identity);
            }
        }

        Self {
            internal,
            external,
            internal_retention_days: (weights > 0).then(|| weighted_days / weights as f64),
        }
    }

    pub fn num_internal(&self) -> usize {
        self.internal.len()
    }

    pub fn num_external(&self) -> usize {
        self.external.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    const DAY: i64 = 86_400;

    #[test]
    fn splits_by_commit_count_and_weights_retention() {
        let mut commits = Vec::new();
        let mut n = 0;
        let mut push = |name: &str, email: &str, time: i64| {
            n += 1;
            commits.push(record(n, name, email, time));
        };
        // Ann: 3 commits over 10 days, once under another name
        push("Ann", "ann@x.org", 0);
        push("Ann", "ann@x.org", 5 * DAY);
        push("A. Nonymous", "ann@home.net", 10 * DAY);
        // Bob: 2 commits over 4 days
        push("Bob", "bob@x.org", DAY);
        push("Bob", "bob@x.org", 5 * DAY);
        // Cid: drive-by
        push("Cid", "cid@y.org", 2 * DAY);

        let mut merge = record(99, "Cid", "cid@y.org", 3 * DAY);
        merge.parents = vec![commits[0].id, commits[1].id];
        commits.push(merge);

        let data = InternalExternalData::from_commits(&commits, 2);

        assert_eq!(data.num_internal(), 2);
        assert_eq!(data.num_external(), 1);
        assert_eq!(data.external[0].name, "Cid");
        assert_eq!(data.internal[0].name, "Ann");

        // (3 * 10 + 2 * 4) / 5
        let retention = data.internal_retention_days.unwrap();
        assert!((retention - 7.6).abs() < 1e-9);
    }

    #[test]
    fn no_internal_committers_means_no_retention() {
        let commits = vec![record(1, "A", "a@a", 0), record(2, "B", "b@b", 10)];
        let data = InternalExternalData::from_commits(&commits, INTERNAL_COMMITTER_LIMIT);
        assert_eq!(data.num_internal(), 0);
        assert_eq!(data.num_external(), 2);
        assert_eq!(data.internal_retention_days, None);
    }

    #[test]
    fn builds_from_repository() {
        let (_dir, repo) = init_repo();
        for i in 0..3 {
            let content = i.to_string();
            commit_files(&repo, &[("f", content.as_str())], "c", 1_000 + i * DAY);
        }
        let data = InternalExternalData::build(&repo, 3).unwrap();
        assert_eq!(data.num_internal(), 1);
        assert_eq!(data.internal_retention_days, Some(2.0));
    }
}
