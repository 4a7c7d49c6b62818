// src/test_support.rs

use crate::model::{Author, CommitRecord};
use git2::{Oid, Repository, Signature, Time};
use std::fs;
use std::path::Path;

pub fn init_repo() -> (tempfile::TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    // Configure identity for commits
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test").unwrap();
    config.set_str("user.email", "test@test.com").unwrap();

    (dir, repo)
}

pub fn signature(name: &str, email: &str, epoch: i64) -> Signature<'static> {
    Signature::new(name, email, &Time::new(epoch, 0)).unwrap()
}

/// Write files into the working tree, stage them and commit on HEAD.
pub fn commit_files_as(
    repo: &Repository,
    author: (&str, &str),
    files: &[(&str, &str)],
    message: &str,
    epoch: i64,
) -> Oid {
    let sig = signature(author.0, author.1, epoch);
    let mut index = repo.index().unwrap();

    for (path, content) in files {
        let full_path = repo.workdir().unwrap().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }

    index.write().unwrap();
    let tree_oid = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_oid).unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

pub fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str, epoch: i64) -> Oid {
    commit_files_as(repo, ("Test", "test@test.com"), files, message, epoch)
}

/// Build a flat tree holding exactly `files`.
pub fn tree_of(repo: &Repository, files: &[(&str, &[u8])]) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    for (name, content) in files {
        let blob = repo.blob(content).unwrap();
        builder.insert(name, blob, 0o100644).unwrap();
    }
    builder.write().unwrap()
}

fn commit_with_parents(
    repo: &Repository,
    update_ref: Option<&str>,
    files: &[(&str, &str)],
    parents: &[Oid],
    message: &str,
    epoch: i64,
) -> Oid {
    let sig = signature("Test", "test@test.com", epoch);
    let files: Vec<(&str, &[u8])> = files.iter().map(|(p, c)| (*p, c.as_bytes())).collect();
    let tree = repo.find_tree(tree_of(repo, &files)).unwrap();
    let parents: Vec<git2::Commit> = parents.iter().map(|id| repo.find_commit(*id).unwrap()).collect();
    let parents: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(update_ref, &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Commit a flat tree with explicit parents without moving any ref.
pub fn commit_tree(repo: &Repository, files: &[(&str, &str)], parents: &[Oid], message: &str, epoch: i64) -> Oid {
    commit_with_parents(repo, None, files, parents, message, epoch)
}

/// Commit a flat tree with explicit parents and advance HEAD to it.
pub fn commit_tree_on_head(
    repo: &Repository,
    files: &[(&str, &str)],
    parents: &[Oid],
    message: &str,
    epoch: i64,
) -> Oid {
    commit_with_parents(repo, Some("HEAD"), files, parents, message, epoch)
}

pub fn head_ref_name(repo: &Repository) -> String {
    let head = repo.find_reference("HEAD").unwrap();
    head.symbolic_target().unwrap_or("<detached>").to_string()
}

pub fn branch_exists(repo: &Repository, name: &str) -> bool {
    repo.find_branch(name, git2::BranchType::Local).is_ok()
}

/// A commit snapshot that never touched a repository.
pub fn record(n: u64, name: &str, email: &str, time: i64) -> CommitRecord {
    CommitRecord {
        id: Oid::from_str(&format!("{n:040x}")).unwrap(),
        parents: Vec::new(),
        author: Author {
            name: name.to_string(),
            email: email.to_string(),
        },
        time,
        message: String::new(),
    }
}
