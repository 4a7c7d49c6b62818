// src/diff.rs

use crate::error::{Error, Result};
use crate::model::{ChangeKind, CommitRecord, DiffEntry, Edit, EditList};
use crate::ordering::repo_path;
use crate::walker::CommitVisitor;
use git2::{Blob, Delta, DiffFindOptions, DiffOptions, Oid, Patch, Repository, Tree};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which paths of a diff are worth an edit list.
#[derive(Debug, Clone, Default)]
pub enum PathFilter {
    #[default]
    All,
    /// File name ends with one of the suffixes, e.g. `.java`
    Suffixes(Vec<String>),
    Globs(GlobSet),
}

impl PathFilter {
    pub fn suffixes<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PathFilter::Suffixes(suffixes.into_iter().map(Into::into).collect())
    }

    pub fn globs<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
        }
        Ok(PathFilter::Globs(builder.build()?))
    }

    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            PathFilter::All => true,
            PathFilter::Suffixes(suffixes) => path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| suffixes.iter().any(|s| name.ends_with(s.as_str()))),
            PathFilter::Globs(set) => set.is_match(path),
        }
    }

    fn accepts_entry(&self, entry: &DiffEntry) -> bool {
        self.accepts(&entry.new_path) || self.accepts(&entry.old_path)
    }
}

/// Computes path-level and line-level differences between tree snapshots.
pub struct TreeDiffExtractor<'r> {
    repo: &'r Repository,
    filter: PathFilter,
}

impl<'r> TreeDiffExtractor<'r> {
    pub fn new(repo: &'r Repository, filter: PathFilter) -> Self {
        Self { repo, filter }
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Diff `old` (or the empty tree) against `new`. Entries whose blobs
    /// cannot be read are logged and left out.
    pub fn diff_trees(&self, old: Option<&Tree>, new: &Tree) -> Result<Vec<(DiffEntry, EditList)>> {
        let mut result = Vec::new();
        for entry in self.entries(old, new)? {
            match self.edit_list(&entry) {
                Ok(edits) => result.push((entry, edits)),
                Err(e) => warn!(
                    "Skipping {} in {}: {}",
                    entry.new_path.display(),
                    repo_path(self.repo).display(),
                    e
                ),
            }
        }
        Ok(result)
    }

    /// Diff commit `to` against `from`, or against the empty tree when no
    /// parent is given.
    pub fn diff_commits(&self, to: Oid, from: Option<Oid>) -> Result<Vec<(DiffEntry, EditList)>> {
        let (old, new) = self.trees(to, from)?;
        self.diff_trees(old.as_ref(), &new)
    }

    /// Like [`diff_commits`](Self::diff_commits) but pushes every surviving
    /// entry into `callback`. A failing entry is logged and does not stop the
    /// remaining ones. Returns how many entries were delivered successfully.
    pub fn for_each_entry<F>(&self, commit: &CommitRecord, from: Option<Oid>, mut callback: F) -> Result<usize>
    where
        F: FnMut(&DiffEntry, &EditList, &CommitRecord) -> Result<()>,
    {
        let (old, new) = self.trees(commit.id, from)?;
        let mut delivered = 0;
        for entry in self.entries(old.as_ref(), &new)? {
            let outcome = self
                .edit_list(&entry)
                .and_then(|edits| callback(&entry, &edits, commit));
            match outcome {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Failed fully executing callback for {} at {} in {}: {}",
                    entry.new_path.display(),
                    commit.id,
                    repo_path(self.repo).display(),
                    e
                ),
            }
        }
        Ok(delivered)
    }

    fn trees(&self, to: Oid, from: Option<Oid>) -> Result<(Option<Tree<'r>>, Tree<'r>)> {
        let new = self.repo.find_commit(to)?.tree()?;
        let old = from
            .map(|id| self.repo.find_commit(id).and_then(|c| c.tree()))
            .transpose()?;
        Ok((old, new))
    }

    /// Path-level changes with renames coalesced, restricted to the filter.
    pub fn entries(&self, old: Option<&Tree>, new: &Tree) -> Result<Vec<DiffEntry>> {
        let mut diff_opts = DiffOptions::new();
        diff_opts.include_untracked(false);
        diff_opts.ignore_filemode(true);

        let mut diff = self.repo.diff_tree_to_tree(old, Some(new), Some(&mut diff_opts))?;

        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        find_opts.copies(true);
        diff.find_similar(Some(&mut find_opts))?;

        let mut entries = Vec::new();
        for delta in diff.deltas() {
            let kind = match delta.status() {
                Delta::Added => ChangeKind::Add,
                Delta::Deleted => ChangeKind::Delete,
                Delta::Modified | Delta::Typechange => ChangeKind::Modify,
                Delta::Renamed => ChangeKind::Rename,
                Delta::Copied => ChangeKind::Copy,
                _ => continue,
            };
            let old_path = delta.old_file().path().map(Path::to_path_buf).unwrap_or_default();
            let new_path = delta.new_file().path().map(Path::to_path_buf).unwrap_or_default();
            let entry = DiffEntry {
                old_path,
                new_path,
                old_id: delta.old_file().id(),
                new_id: delta.new_file().id(),
                kind,
            };
            if self.filter.accepts_entry(&entry) {
                entries.push(entry);
            } else {
                debug!("Filtered out {}", entry.new_path.display());
            }
        }
        Ok(entries)
    }

    /// Line edits of one entry. Binary content on either side gives an
    /// empty list.
    pub fn edit_list(&self, entry: &DiffEntry) -> Result<EditList> {
        let old = self.blob(entry.old_id, &entry.old_path)?;
        let new = self.blob(entry.new_id, &entry.new_path)?;

        if old.as_ref().is_some_and(Blob::is_binary) || new.as_ref().is_some_and(Blob::is_binary) {
            return Ok(EditList::new());
        }

        let old_bytes = old.as_ref().map_or(&[][..], Blob::content);
        let new_bytes = new.as_ref().map_or(&[][..], Blob::content);
        line_edits(old_bytes, new_bytes)
    }

    fn blob(&self, id: Oid, path: &Path) -> Result<Option<Blob<'r>>> {
        if id.is_zero() {
            return Ok(None);
        }
        self.repo.find_blob(id).map(Some).map_err(|e| Error::ObjectAccess {
            id: format!("{} ({})", id, path.display()),
            reason: e.message().to_string(),
        })
    }
}

/// Whitespace-insensitive line diff of two buffers, one [`Edit`] per hunk.
pub fn line_edits(old: &[u8], new: &[u8]) -> Result<EditList> {
    let mut opts = DiffOptions::new();
    opts.ignore_whitespace(true);
    opts.context_lines(0);
    opts.interhunk_lines(0);

    let patch = Patch::from_buffers(old, None, new, None, Some(&mut opts))?;
    let mut edits = EditList::new();
    for idx in 0..patch.num_hunks() {
        let (hunk, _) = patch.hunk(idx)?;
        edits.push(hunk_to_edit(
            hunk.old_start() as usize,
            hunk.old_lines() as usize,
            hunk.new_start() as usize,
            hunk.new_lines() as usize,
        ));
    }
    Ok(edits)
}

/// Hunk starts are 1-based, except that an empty side names the line after
/// which the change sits.
fn hunk_to_edit(old_start: usize, old_lines: usize, new_start: usize, new_lines: usize) -> Edit {
    let begin_a = if old_lines == 0 { old_start } else { old_start - 1 };
    let begin_b = if new_lines == 0 { new_start } else { new_start - 1 };
    Edit::new(begin_a, begin_a + old_lines, begin_b, begin_b + new_lines)
}

/// Sum of `max(old lines, new lines)` over the edits.
pub fn churn(edits: &EditList) -> usize {
    edits.churn()
}

/// Receives the surviving diff entries of each single-parent commit.
pub trait DiffVisitor {
    fn visit_diff(&mut self, entry: &DiffEntry, edits: &EditList, commit: &CommitRecord) -> Result<()>;

    fn diff_completed(&mut self) {}
}

/// Commit visitor that diffs every single-parent commit against its parent
/// and forwards the entries to a [`DiffVisitor`]. Root and merge commits are
/// passed over.
pub struct EditListWalker<'r, V> {
    extractor: TreeDiffExtractor<'r>,
    visitor: V,
}

impl<'r, V: DiffVisitor> EditListWalker<'r, V> {
    pub fn new(repo: &'r Repository, filter: PathFilter, visitor: V) -> Self {
        Self {
            extractor: TreeDiffExtractor::new(repo, filter),
            visitor,
        }
    }

    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    pub fn into_visitor(self) -> V {
        self.visitor
    }
}

impl<V: DiffVisitor> CommitVisitor for EditListWalker<'_, V> {
    fn visit(&mut self, commit: &CommitRecord) -> Result<bool> {
        if commit.parents.len() != 1 {
            return Ok(true);
        }
        let visitor = &mut self.visitor;
        let outcome = self
            .extractor
            .for_each_entry(commit, commit.first_parent(), |entry, edits, commit| {
                visitor.visit_diff(entry, edits, commit)
            });
        if let Err(e) = outcome {
            warn!(
                "Failed to diff {} in {}: {}",
                commit.id,
                repo_path(self.extractor.repo).display(),
                e
            );
        }
        Ok(true)
    }

    fn walk_completed(&mut self) {
        self.visitor.diff_completed();
    }
}
