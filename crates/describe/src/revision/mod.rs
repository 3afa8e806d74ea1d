//! HEAD resolution.
//!
//! [`RevisionSource`] is the seam between the engine and the repository
//! reader. [`GitRevisionSource`] reads a real repository through git2;
//! [`MockRevisionSource`] returns canned outcomes for tests.

mod mock;

pub use mock::MockRevisionSource;

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use git2::{ErrorCode, Object, Repository};
use serde::Serialize;

use crate::{error::DescribeError, repository};

/// The concrete revision `HEAD` points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRevision {
    /// Full hex object id.
    pub revision_id: String,
    /// Unique prefix of `revision_id`, at least as long as requested.
    pub abbreviated: String,
    /// Committer time, seconds since the Unix epoch.
    pub commit_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedRevision),
    /// The repository exists but `HEAD` points at nothing yet.
    NoCommits,
}

pub trait RevisionSource {
    /// Locate the repository enclosing `start` and resolve its `HEAD`.
    fn resolve(&self, start: &Path, min_abbrev_len: usize) -> Result<Resolution, DescribeError>;
}

/// Reads `HEAD` from an on-disk repository using git2.
#[derive(Debug, Clone, Default)]
pub struct GitRevisionSource {
    ceiling_dirs: Vec<OsString>,
}

impl GitRevisionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop repository discovery before entering any of `dirs`.
    pub fn with_ceiling_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ceiling_dirs = dirs
            .into_iter()
            .map(|d| d.into().into_os_string())
            .collect();
        self
    }
}

impl RevisionSource for GitRevisionSource {
    fn resolve(&self, start: &Path, min_abbrev_len: usize) -> Result<Resolution, DescribeError> {
        let repo = repository::locate(start, &self.ceiling_dirs)?;
        resolve_head(&repo, min_abbrev_len)
    }
}

/// Resolve `HEAD` of an open repository.
pub fn resolve_head(repo: &Repository, min_abbrev_len: usize) -> Result<Resolution, DescribeError> {
    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            tracing::debug!("HEAD is unborn: {}", e.message());
            return Ok(Resolution::NoCommits);
        }
        Err(e) => return Err(e.into()),
    };

    let commit = head.peel_to_commit()?;
    let abbreviated = abbreviate(commit.as_object(), min_abbrev_len)?;
    let commit_time = commit.time().seconds();

    tracing::debug!(
        revision = %commit.id(),
        abbreviated = %abbreviated,
        commit_time,
        "Resolved HEAD"
    );

    Ok(Resolution::Resolved(ResolvedRevision {
        revision_id: commit.id().to_string(),
        abbreviated,
        commit_time,
    }))
}

/// Shortest prefix git2 considers unique, lengthened to `min_len` if needed.
/// Any extension of a unique prefix is still unique.
fn abbreviate(object: &Object<'_>, min_len: usize) -> Result<String, git2::Error> {
    let full = object.id().to_string();
    let short = object.short_id()?;
    let unique_len = short.as_str().map(str::len).unwrap_or(0);
    let len = unique_len.max(min_len).min(full.len());
    Ok(full[..len].to_string())
}
