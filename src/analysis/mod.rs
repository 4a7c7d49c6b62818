// src/analysis/mod.rs

//! Statistics built on top of the commit walkers.

pub mod activity;
pub mod dedup;
pub mod keywords;
pub mod lifecycle;
pub mod retention;

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Immediate subdirectories of `dir`, sorted by path. Each one is expected to
/// hold a repository.
pub fn repository_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();

        let dirs = repository_dirs(dir.path()).unwrap();
        assert_eq!(dirs, vec![dir.path().join("a"), dir.path().join("b")]);
    }
}
