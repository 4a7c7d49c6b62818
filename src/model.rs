// src/model.rs

use git2::{Commit, Oid};
use std::fmt;
use std::path::PathBuf;

/// Author of a commit, as recorded by git
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// Read-only snapshot of one commit, detached from the repository handle
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub id: Oid,
    /// Parent ids in git order; index 0 is the first parent
    pub parents: Vec<Oid>,
    pub author: Author,
    /// Committer time in seconds since the epoch
    pub time: i64,
    /// Full commit message
    pub message: String,
}

impl CommitRecord {
    pub fn from_commit(commit: &Commit) -> Self {
        let author = commit.author();
        Self {
            id: commit.id(),
            parents: commit.parent_ids().collect(),
            author: Author {
                name: author.name().unwrap_or("Unknown").to_string(),
                email: author.email().unwrap_or("").to_string(),
            },
            time: commit.time().seconds(),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        }
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn first_parent(&self) -> Option<Oid> {
        self.parents.first().copied()
    }
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "commit {} {}", self.id, self.time)
    }
}

/// How a path changed between two trees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Delete,
    Modify,
    Rename,
    Copy,
}

/// One path-level difference between two tree snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    /// Zero for an added path
    pub old_id: Oid,
    /// Zero for a deleted path
    pub new_id: Oid,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Delete,
    Replace,
}

/// A changed region: lines `begin_a..end_a` of the old content were replaced
/// by lines `begin_b..end_b` of the new content. Line numbers are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub begin_a: usize,
    pub end_a: usize,
    pub begin_b: usize,
    pub end_b: usize,
}

impl Edit {
    pub fn new(begin_a: usize, end_a: usize, begin_b: usize, end_b: usize) -> Self {
        Self { begin_a, end_a, begin_b, end_b }
    }

    pub fn old_lines(&self) -> usize {
        self.end_a - self.begin_a
    }

    pub fn new_lines(&self) -> usize {
        self.end_b - self.begin_b
    }

    pub fn kind(&self) -> EditKind {
        match (self.old_lines(), self.new_lines()) {
            (0, _) => EditKind::Insert,
            (_, 0) => EditKind::Delete,
            _ => EditKind::Replace,
        }
    }

    pub fn churn(&self) -> usize {
        self.old_lines().max(self.new_lines())
    }
}

/// Ordered edits of one diff entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditList(Vec<Edit>);

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: Edit) {
        self.0.push(edit);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Edit> {
        self.0.iter()
    }

    /// Sum of `max(old lines, new lines)` over all edits.
    pub fn churn(&self) -> usize {
        self.0.iter().map(Edit::churn).sum()
    }
}

impl From<Vec<Edit>> for EditList {
    fn from(edits: Vec<Edit>) -> Self {
        Self(edits)
    }
}

impl<'a> IntoIterator for &'a EditList {
    type Item = &'a Edit;
    type IntoIter = std::slice::Iter<'a, Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
