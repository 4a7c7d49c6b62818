// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything the walk engine and its consumers can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// HEAD or another ref could not be resolved. Fatal to the current walk.
    #[error("repository state error in {path:?}: {reason}")]
    RepositoryState { path: PathBuf, reason: String },

    /// A blob or tree is missing or unreadable. The affected entry is skipped.
    #[error("cannot access object {id}: {reason}")]
    ObjectAccess { id: String, reason: String },

    /// One step of checkout/reset/branch handling failed.
    #[error("checkout step '{step}' failed: {source}")]
    Checkout {
        step: &'static str,
        #[source]
        source: git2::Error,
    },

    /// A consumer callback reported a failure.
    #[error("visitor failed: {0}")]
    Visitor(String),

    #[error("invalid path pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn repository_state(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::RepositoryState {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn visitor(reason: impl std::fmt::Display) -> Self {
        Error::Visitor(reason.to_string())
    }

    pub(crate) fn checkout(step: &'static str) -> impl FnOnce(git2::Error) -> Self {
        move |source| Error::Checkout { step, source }
    }
}
