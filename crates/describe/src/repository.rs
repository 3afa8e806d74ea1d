//! Repository discovery.

use std::{ffi::OsString, path::Path};

use git2::{ErrorCode, Repository, RepositoryOpenFlags};

use crate::error::DescribeError;

/// Open the repository containing `start`, searching parent directories.
///
/// Discovery never enters a directory listed in `ceiling_dirs`. The returned
/// handle releases its resources when dropped.
pub fn locate(start: &Path, ceiling_dirs: &[OsString]) -> Result<Repository, DescribeError> {
    match Repository::open_ext(start, RepositoryOpenFlags::empty(), ceiling_dirs) {
        Ok(repo) => {
            tracing::debug!(
                start = %start.display(),
                git_dir = %repo.path().display(),
                "Opened git repository"
            );
            Ok(repo)
        }
        Err(e) if e.code() == ErrorCode::NotFound => Err(DescribeError::RepositoryNotFound {
            path: start.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}
