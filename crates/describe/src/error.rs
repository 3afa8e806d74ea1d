use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateError;

#[derive(Debug, Error)]
pub enum DescribeError {
    #[error("No git repository found in {} or any parent directory", .path.display())]
    RepositoryNotFound { path: PathBuf },
    #[error("Failed to read HEAD commit ({kind}): {message}")]
    Resolution { kind: String, message: String },
    #[error("Invalid format template: {0}")]
    Configuration(#[from] TemplateError),
    #[error(transparent)]
    Store(#[from] std::io::Error),
}

impl DescribeError {
    /// Short name of the failure kind, used in warnings and abort messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RepositoryNotFound { .. } => "RepositoryNotFound",
            Self::Resolution { .. } => "ResolutionError",
            Self::Configuration(_) => "ConfigurationError",
            Self::Store(_) => "StoreError",
        }
    }

    /// Repository-state problems degrade to fallback values unless strict-fail
    /// is set. Build-definition and store problems never do.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RepositoryNotFound { .. } | Self::Resolution { .. }
        )
    }
}

impl From<git2::Error> for DescribeError {
    fn from(err: git2::Error) -> Self {
        Self::Resolution {
            kind: format!("{:?}/{:?}", err.class(), err.code()),
            message: err.message().to_string(),
        }
    }
}
