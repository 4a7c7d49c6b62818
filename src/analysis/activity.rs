// src/analysis/activity.rs

use crate::error::Result;
use crate::identity::{ClusterId, CommitterIdentity, IdentityClusters};
use crate::model::CommitRecord;
use crate::ordering::topological_commits;
use git2::Repository;
use std::collections::BTreeMap;

/// Six months of 30 days, in seconds.
pub const GRACE_PERIOD: i64 = 60 * 60 * 24 * 30 * 6;

/// When a committer was active. `last` is `None` for committers still
/// active at the end of the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityRange {
    pub first: i64,
    pub last: Option<i64>,
}

impl ActivityRange {
    /// True if the range touches the half-open period `[start, end)`.
    pub fn connects(&self, start: i64, end: i64) -> bool {
        self.first <= end && self.last.map_or(true, |last| start <= last)
    }
}

/// Activity range per committer cluster, keyed by the cluster's first seen
/// identity. Committers whose last commit falls within `grace` of the newest
/// commit are considered still active.
pub fn activity_ranges(commits: &[CommitRecord], grace: i64) -> Vec<(CommitterIdentity, ActivityRange)> {
    let identities: Vec<CommitterIdentity> = commits
        .iter()
        .map(|c| CommitterIdentity::from_author(&c.author))
        .collect();
    let clusters = IdentityClusters::from_identities(identities.iter().cloned());

    let mut spans: BTreeMap<ClusterId, (i64, i64)> = BTreeMap::new();
    for (commit, identity) in commits.iter().zip(&identities) {
        let Some(cluster) = clusters.cluster_of(identity) else {
            continue;
        };
        spans
            .entry(cluster)
            .and_modify(|(first, last)| {
                *first = (*first).min(commit.time);
                *last = (*last).max(commit.time);
            })
            .or_insert((commit.time, commit.time));
    }

    let max_time = commits.iter().map(|c| c.time).max().unwrap_or(0);
    let grace_time = max_time.saturating_sub(grace);

    spans
        .into_iter()
        .map(|(cluster, (first, last))| {
            let last = last.max(first + 1);
            let range = ActivityRange {
                first,
                last: (last <= grace_time).then_some(last),
            };
            (clusters.representative(cluster).clone(), range)
        })
        .collect()
}

/// Number of active committers per period over the life of a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCommitterData {
    /// Start of the first period
    pub start: i64,
    /// Length of each period in seconds
    pub period: i64,
    /// Active committers per period, oldest first
    pub series: Vec<usize>,
}

impl ActiveCommitterData {
    pub fn build(repo: &Repository, grace: i64) -> Result<Self> {
        let commits = topological_commits(repo)?;
        Ok(Self::from_commits(&commits, grace))
    }

    /// A non-positive `grace` gives an empty series.
    pub fn from_commits(commits: &[CommitRecord], grace: i64) -> Self {
        if grace <= 0 {
            return Self { start: 0, period: grace, series: Vec::new() };
        }
        let (Some(start), Some(end)) = (
            commits.iter().map(|c| c.time).min(),
            commits.iter().map(|c| c.time).max(),
        ) else {
            return Self { start: 0, period: grace, series: Vec::new() };
        };

        let ranges = activity_ranges(commits, grace);
        let span = end - start;
        let chunks = span / grace + i64::from(span % grace != 0);

        let series = (0..chunks)
            .map(|i| {
                let period_start = start + i * grace;
                let period_end = period_start.saturating_add(grace);
                ranges
                    .iter()
                    .filter(|(_, range)| range.connects(period_start, period_end))
                    .count()
            })
            .collect();

        Self { start, period: grace, series }
    }

    pub fn time_series(&self) -> &[usize] {
        &self.series
    }

    pub fn last_active_committers(&self) -> Option<usize> {
        self.series.last().copied()
    }

    /// Active committers in the last period over the most ever active.
    pub fn last_activity_ratio(&self) -> Option<f64> {
        let max = self.series.iter().copied().max()?;
        if max == 0 {
            return None;
        }
        self.last_active_committers().map(|last| last as f64 / max as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn history() -> Vec<CommitRecord> {
        vec![
            record(1, "Alice", "alice@a.org", 0),
            record(2, "Alice", "alice@a.org", 50),
            record(3, "Bob", "bob@b.org", 120),
            record(4, "Eve", "eve@e.org", 150),
            record(5, "Carol", "alice@c.org", 300),
            record(6, "Dave", "dave@d.org", 400),
        ]
    }

    #[test]
    fn ranges_merge_matching_identities_and_extend_recent_ones() {
        let ranges = activity_ranges(&history(), 100);
        let by_name: BTreeMap<&str, ActivityRange> =
            ranges.iter().map(|(id, r)| (id.name.as_str(), *r)).collect();

        assert_eq!(by_name.len(), 4);
        assert_eq!(by_name["Alice"], ActivityRange { first: 0, last: Some(300) });
        assert_eq!(by_name["Bob"], ActivityRange { first: 120, last: Some(121) });
        assert_eq!(by_name["Dave"], ActivityRange { first: 400, last: None });
    }

    #[test]
    fn series_counts_committers_per_period() {
        let data = ActiveCommitterData::from_commits(&history(), 100);

        assert_eq!(data.start, 0);
        assert_eq!(data.time_series(), &[1, 3, 1, 2]);
        assert_eq!(data.last_active_committers(), Some(2));
        let ratio = data.last_activity_ratio().unwrap();
        assert!((ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_or_instant_history_has_no_series() {
        let empty = ActiveCommitterData::from_commits(&[], GRACE_PERIOD);
        assert!(empty.series.is_empty());
        assert_eq!(empty.last_activity_ratio(), None);

        let single = ActiveCommitterData::from_commits(&[record(1, "A", "a@a", 10)], GRACE_PERIOD);
        assert!(single.series.is_empty());
    }

    #[test]
    fn degenerate_grace_periods_do_not_panic() {
        let commits = [record(1, "A", "a@a", 0), record(2, "B", "b@b", 100)];

        assert!(ActiveCommitterData::from_commits(&commits, 0).series.is_empty());
        assert!(ActiveCommitterData::from_commits(&commits, -5).series.is_empty());

        let huge = ActiveCommitterData::from_commits(&commits, i64::MAX);
        assert_eq!(huge.time_series(), &[2]);
    }

    #[test]
    fn builds_from_repository() {
        let (_dir, repo) = init_repo();
        commit_files_as(&repo, ("Ann", "ann@x.org"), &[("a", "1")], "a", 1_000);
        commit_files_as(&repo, ("Ben", "ben@x.org"), &[("a", "2")], "b", 1_000 + GRACE_PERIOD * 2);

        let data = ActiveCommitterData::build(&repo, GRACE_PERIOD).unwrap();
        assert_eq!(data.series.len(), 2);
        assert_eq!(data.last_active_committers(), Some(1));
    }
}
