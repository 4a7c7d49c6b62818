// src/ordering.rs

use crate::error::{Error, Result};
use crate::model::CommitRecord;
use git2::{ErrorCode, Oid, Repository, Sort};
use std::collections::HashSet;
use std::path::PathBuf;

/// How the commits of a repository are laid out for a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitOrdering {
    /// Every commit reachable from HEAD, oldest first, never before one of
    /// its ancestors.
    #[default]
    Topological,
    /// The first-parent chain from the root up to HEAD.
    BaseChain,
}

impl CommitOrdering {
    pub fn commits(&self, repo: &Repository) -> Result<Vec<CommitRecord>> {
        match self {
            CommitOrdering::Topological => topological_commits(repo),
            CommitOrdering::BaseChain => base_commits(repo),
        }
    }
}

/// Where a repository lives, for log and error messages.
pub(crate) fn repo_path(repo: &Repository) -> PathBuf {
    repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf()
}

/// Resolve HEAD to a commit id. `Ok(None)` means the current branch is unborn.
fn head_commit_id(repo: &Repository) -> Result<Option<Oid>> {
    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
        Err(e) => return Err(Error::repository_state(repo_path(repo), e.message())),
    };
    let commit = head
        .peel_to_commit()
        .map_err(|e| Error::repository_state(repo_path(repo), e.message()))?;
    Ok(Some(commit.id()))
}

pub fn topological_commits(repo: &Repository) -> Result<Vec<CommitRecord>> {
    let Some(head) = head_commit_id(repo)? else {
        return Ok(Vec::new());
    };

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
    revwalk.push(head)?;

    let mut commits = Vec::new();
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        commits.push(CommitRecord::from_commit(&commit));
    }
    Ok(commits)
}

pub fn base_commits(repo: &Repository) -> Result<Vec<CommitRecord>> {
    let head = head_commit_id(repo)?
        .ok_or_else(|| Error::repository_state(repo_path(repo), "HEAD points to an unborn branch"))?;

    let mut commits = Vec::new();
    let mut current = repo.find_commit(head)?;
    loop {
        commits.push(CommitRecord::from_commit(&current));
        if current.parent_count() == 0 {
            break;
        }
        current = current.parent(0)?;
    }

    commits.reverse();
    Ok(commits)
}

/// Ids of every commit reachable from HEAD. Empty for an unborn HEAD.
pub fn commit_ids(repo: &Repository) -> Result<HashSet<Oid>> {
    let Some(head) = head_commit_id(repo)? else {
        return Ok(HashSet::new());
    };
    let mut revwalk = repo.revwalk()?;
    revwalk.push(head)?;
    let mut ids = HashSet::new();
    for oid in revwalk {
        ids.insert(oid?);
    }
    Ok(ids)
}
