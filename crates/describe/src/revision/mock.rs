//! In-memory [`RevisionSource`] for exercising the engine without a repository.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use super::{Resolution, ResolvedRevision, RevisionSource};
use crate::error::DescribeError;

#[derive(Debug, Clone)]
enum MockOutcome {
    Resolved(ResolvedRevision),
    NoCommits,
    NotFound,
    Failed { kind: String, message: String },
}

/// Returns a fixed outcome and records every request it receives.
#[derive(Debug, Clone)]
pub struct MockRevisionSource {
    outcome: MockOutcome,
    requests: Arc<Mutex<Vec<(PathBuf, usize)>>>,
}

impl MockRevisionSource {
    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Resolves to `revision_id`, abbreviated to the requested length.
    pub fn resolved(revision_id: &str, commit_time: i64) -> Self {
        Self::with_outcome(MockOutcome::Resolved(ResolvedRevision {
            revision_id: revision_id.to_string(),
            abbreviated: String::new(),
            commit_time,
        }))
    }

    pub fn no_commits() -> Self {
        Self::with_outcome(MockOutcome::NoCommits)
    }

    pub fn not_found() -> Self {
        Self::with_outcome(MockOutcome::NotFound)
    }

    pub fn failing(kind: &str, message: &str) -> Self {
        Self::with_outcome(MockOutcome::Failed {
            kind: kind.to_string(),
            message: message.to_string(),
        })
    }

    /// Directories and minimum lengths passed to `resolve`, in call order.
    pub fn requests(&self) -> Vec<(PathBuf, usize)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl RevisionSource for MockRevisionSource {
    fn resolve(&self, start: &Path, min_abbrev_len: usize) -> Result<Resolution, DescribeError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((start.to_path_buf(), min_abbrev_len));
        }

        match &self.outcome {
            MockOutcome::Resolved(rev) => {
                let len = min_abbrev_len.min(rev.revision_id.len());
                Ok(Resolution::Resolved(ResolvedRevision {
                    abbreviated: rev.revision_id[..len].to_string(),
                    ..rev.clone()
                }))
            }
            MockOutcome::NoCommits => Ok(Resolution::NoCommits),
            MockOutcome::NotFound => Err(DescribeError::RepositoryNotFound {
                path: start.to_path_buf(),
            }),
            MockOutcome::Failed { kind, message } => Err(DescribeError::Resolution {
                kind: kind.clone(),
                message: message.clone(),
            }),
        }
    }
}
