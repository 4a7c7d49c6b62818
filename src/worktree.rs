// src/worktree.rs

use crate::cleanup::CleanupCascade;
use crate::error::{Error, Result};
use crate::model::CommitRecord;
use crate::ordering::{repo_path, CommitOrdering};
use crate::walker::{CommitVisitor, CommitWalker, WalkReport, WalkWindow};
use git2::build::CheckoutBuilder;
use git2::{BranchType, ErrorCode, Oid, Repository, ResetType};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const TEMPORARY_BRANCH_NAME: &str = "committools-walk-tmp";

#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Branch created for each checked out commit and removed afterwards
    pub temp_branch: String,
    /// Pause between commits so a termination request can take the lock
    pub yield_interval: Duration,
    /// How long a termination request waits for the walk to wind down
    pub grace_period: Duration,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            temp_branch: TEMPORARY_BRANCH_NAME.to_string(),
            yield_interval: Duration::from_millis(1),
            grace_period: Duration::from_secs(5),
        }
    }
}

/// What HEAD pointed at when the walker was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginalHead {
    /// Full ref name, e.g. `refs/heads/main`. The branch may be unborn.
    Branch(String),
    Detached(Oid),
}

impl OriginalHead {
    pub fn capture(repo: &Repository) -> Result<Self> {
        let head = repo
            .find_reference("HEAD")
            .map_err(|e| Error::repository_state(repo_path(repo), e.message()))?;
        if let Some(target) = head.symbolic_target() {
            return Ok(OriginalHead::Branch(target.to_string()));
        }
        head.target()
            .map(OriginalHead::Detached)
            .ok_or_else(|| Error::repository_state(repo_path(repo), "HEAD has no target"))
    }
}

/// Shared between a running walk and whoever may ask it to stop.
///
/// The walk holds the lock only while one commit is checked out, visited and
/// restored. [`Terminator::request`] waits for that span to finish before
/// raising the flag, so the repository is never abandoned mid-checkout.
#[derive(Debug, Clone, Default)]
pub struct Terminator {
    lock: Arc<Mutex<()>>,
    terminating: Arc<AtomicBool>,
}

impl Terminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::SeqCst)
    }

    /// Block until no commit is in flight, raise the terminating flag and
    /// keep the lock for `grace` so the walk can observe it and clean up.
    pub fn request(&self, grace: Duration) {
        warn!("Shutting down gracefully, please wait...");
        let _guard = self.lock.lock();
        debug!("Walk lock acquired by termination request");
        self.terminating.store(true, Ordering::SeqCst);
        thread::sleep(grace);
    }
}

/// Receives commits with the working directory checked out at them.
pub trait FileVisitor {
    fn is_visitable(&mut self, _commit: &CommitRecord) -> bool {
        true
    }

    /// `workdir` holds exactly the tree of `commit` for the duration of the
    /// call. Errors are logged and the walk moves on to the next commit.
    fn visit_files(&mut self, commit: &CommitRecord, workdir: &Path) -> Result<()>;

    fn on_complete(&mut self) {}
}

#[derive(Debug)]
pub struct WorktreeReport {
    pub walk: WalkReport,
    /// False when HEAD could not be put back on its original ref. The
    /// repository is then left on the temporary branch.
    pub restored: bool,
}

/// Walks commits and checks each one out into the working directory.
pub struct WorkingTreeWalker {
    repo: Repository,
    ordering: CommitOrdering,
    config: WalkerConfig,
    original: OriginalHead,
    workdir: PathBuf,
}

impl WorkingTreeWalker {
    pub fn open(path: &Path, ordering: CommitOrdering) -> Result<Self> {
        let repo = Repository::open(path)
            .map_err(|e| Error::repository_state(path, e.message()))?;
        Self::from_repository(repo, ordering, WalkerConfig::default())
    }

    pub fn from_repository(repo: Repository, ordering: CommitOrdering, config: WalkerConfig) -> Result<Self> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| Error::repository_state(repo.path(), "bare repositories have no working tree"))?
            .to_path_buf();
        let original = OriginalHead::capture(&repo)?;
        debug!("Working tree walker on {} starting from {:?}", workdir.display(), original);
        Ok(Self {
            repo,
            ordering,
            config,
            original,
            workdir,
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn original_head(&self) -> &OriginalHead {
        &self.original
    }

    pub fn walk<V: FileVisitor + ?Sized>(
        &self,
        visitor: &mut V,
        window: WalkWindow,
        terminator: &Terminator,
    ) -> WorktreeReport {
        let mut session = WalkSession {
            checkout: Checkout {
                repo: &self.repo,
                original: &self.original,
                temp_branch: &self.config.temp_branch,
            },
            workdir: &self.workdir,
            yield_interval: self.config.yield_interval,
            terminator,
            visitor,
            restored: false,
        };
        let walk = CommitWalker::new(&self.repo, self.ordering).walk(&mut session, window);
        WorktreeReport {
            walk,
            restored: session.restored,
        }
    }

    /// Put HEAD back on the original ref and drop the temporary branch.
    pub fn restore(&self) -> Result<()> {
        Checkout {
            repo: &self.repo,
            original: &self.original,
            temp_branch: &self.config.temp_branch,
        }
        .restore()
    }
}

/// Branch juggling around one repository.
struct Checkout<'w> {
    repo: &'w Repository,
    original: &'w OriginalHead,
    temp_branch: &'w str,
}

impl Checkout<'_> {
    fn temp_ref(&self) -> String {
        format!("refs/heads/{}", self.temp_branch)
    }

    fn temp_branch_exists(&self) -> bool {
        self.repo.find_branch(self.temp_branch, BranchType::Local).is_ok()
    }

    fn head_is_original(&self) -> bool {
        OriginalHead::capture(self.repo).is_ok_and(|head| &head == self.original)
    }

    /// Create the temporary branch at `id` and force the working tree onto it.
    fn checkout_temp(&self, id: Oid) -> Result<()> {
        let commit = self.repo.find_commit(id)?;
        self.repo
            .branch(self.temp_branch, &commit, true)
            .map_err(Error::checkout("create temporary branch"))?;
        self.repo
            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
            .map_err(Error::checkout("check out commit"))?;
        self.repo
            .set_head(&self.temp_ref())
            .map_err(Error::checkout("switch to temporary branch"))
    }

    fn reset_hard(&self) -> Result<()> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(()),
            Err(e) => return Err(Error::checkout("resolve HEAD")(e)),
        };
        let commit = head.peel_to_commit().map_err(Error::checkout("resolve HEAD"))?;
        self.repo
            .reset(commit.as_object(), ResetType::Hard, Some(CheckoutBuilder::new().force()))
            .map_err(Error::checkout("hard reset"))
    }

    fn checkout_original(&self) -> Result<()> {
        match self.original {
            OriginalHead::Branch(refname) => {
                match self.repo.revparse_single(refname) {
                    Ok(target) => {
                        let commit = target.peel_to_commit().map_err(Error::checkout("resolve original branch"))?;
                        self.repo
                            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
                            .map_err(Error::checkout("check out original branch"))?;
                    }
                    Err(e) if e.code() == ErrorCode::NotFound => {}
                    Err(e) => return Err(Error::checkout("resolve original branch")(e)),
                }
                self.repo
                    .set_head(refname)
                    .map_err(Error::checkout("switch to original branch"))
            }
            OriginalHead::Detached(id) => {
                let commit = self.repo.find_commit(*id).map_err(Error::checkout("resolve original commit"))?;
                self.repo
                    .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
                    .map_err(Error::checkout("check out original commit"))?;
                self.repo
                    .set_head_detached(*id)
                    .map_err(Error::checkout("detach HEAD at original commit"))
            }
        }
    }

    fn delete_temp(&self) -> Result<()> {
        match self.repo.find_branch(self.temp_branch, BranchType::Local) {
            Ok(mut branch) => branch.delete().map_err(Error::checkout("delete temporary branch")),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(()),
            Err(e) => Err(Error::checkout("find temporary branch")(e)),
        }
    }

    fn restore(&self) -> Result<()> {
        CleanupCascade::new()
            .step("hard reset", || self.reset_hard())
            .step("check out original", || self.checkout_original())
            .step("hard reset", || self.reset_hard())
            .step("delete temporary branch", || self.delete_temp())
            .run()
    }
}

/// The per-walk state: adapts a [`FileVisitor`] into a [`CommitVisitor`].
struct WalkSession<'w, V: ?Sized> {
    checkout: Checkout<'w>,
    workdir: &'w Path,
    yield_interval: Duration,
    terminator: &'w Terminator,
    visitor: &'w mut V,
    restored: bool,
}

impl<V: FileVisitor + ?Sized> WalkSession<'_, V> {
    fn visit_checked_out(&mut self, commit: &CommitRecord) -> Result<()> {
        if self.checkout.temp_branch_exists() {
            if let Err(e) = self.checkout.restore() {
                warn!(
                    "Failed to discard leftover branch {} in {}: {}",
                    self.checkout.temp_branch,
                    self.workdir.display(),
                    e
                );
            }
        }

        let visited = self
            .checkout
            .checkout_temp(commit.id)
            .and_then(|()| self.visitor.visit_files(commit, self.workdir));
        let restored = self.checkout.restore();
        visited.and(restored)
    }
}

impl<V: FileVisitor + ?Sized> CommitVisitor for WalkSession<'_, V> {
    fn visit(&mut self, commit: &CommitRecord) -> Result<bool> {
        let terminator = self.terminator;
        if terminator.is_terminating() {
            info!("Termination requested. Stopping tree walk before {}", commit.id);
            return Ok(false);
        }
        let Some(guard) = terminator.lock.try_lock() else {
            warn!("Failed to acquire walk lock. Stopping tree walk...");
            return Ok(false);
        };
        if terminator.is_terminating() {
            return Ok(false);
        }

        if self.visitor.is_visitable(commit) {
            if let Err(e) = self.visit_checked_out(commit) {
                warn!("Failed to visit {} at {}: {}", self.workdir.display(), commit.id, e);
            }
        }

        drop(guard);
        thread::sleep(self.yield_interval);
        Ok(!terminator.is_terminating())
    }

    fn walk_completed(&mut self) {
        if let Err(e) = self.checkout.restore() {
            warn!("Failed to restore {}: {}", self.workdir.display(), e);
        }
        self.restored = self.checkout.head_is_original() && !self.checkout.temp_branch_exists();
        if !self.restored {
            error!(
                "Repository {} could not be restored to {:?}; it is left on branch {}",
                self.workdir.display(),
                self.checkout.original,
                self.checkout.temp_branch
            );
        }
        self.visitor.on_complete();
    }
}
