use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_FORMAT: &str = "git-${project.name}-%s";
pub const DEFAULT_DESCRIPTION_PROPERTY: &str = "describe";
pub const DEFAULT_TIMESTAMP_PROPERTY: &str = "project.build.outputTimestamp";
pub const DEFAULT_FAIL_HASH: &str = "unknown";
pub const DEFAULT_ABBREV_LENGTH: usize = 7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Options for one describe invocation.
///
/// Deserializes from the same camelCase names a build definition would use;
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DescribeConfig {
    /// Template with one `%s` slot for the abbreviated hash.
    pub format: String,
    /// Property receiving the formatted description.
    pub description_property: String,
    /// Property receiving the commit time in epoch seconds.
    pub timestamp_property: String,
    /// Replace values already present in the property store.
    #[serde(rename = "override")]
    pub override_existing: bool,
    /// Where repository discovery starts. `None` means the build root.
    pub scm_directory: Option<PathBuf>,
    /// Substituted into the template when `HEAD` cannot be resolved.
    pub fail_hash: String,
    /// Abort instead of falling back when the repository cannot be read.
    pub fail: bool,
    /// Minimum length of the abbreviated hash.
    pub abbrev_length: usize,
    /// Do nothing at all.
    pub skip: bool,
    /// Use `SOURCE_DATE_EPOCH` instead of the wall clock as the fallback
    /// timestamp when it is set.
    pub use_source_date_epoch: bool,
    /// Value for `${project.name}` when the store does not define it.
    pub project_name: Option<String>,
    /// Directories repository discovery must not walk into.
    pub ceiling_directories: Vec<PathBuf>,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            description_property: DEFAULT_DESCRIPTION_PROPERTY.to_string(),
            timestamp_property: DEFAULT_TIMESTAMP_PROPERTY.to_string(),
            override_existing: false,
            scm_directory: None,
            fail_hash: DEFAULT_FAIL_HASH.to_string(),
            fail: false,
            abbrev_length: DEFAULT_ABBREV_LENGTH,
            skip: false,
            use_source_date_epoch: false,
            project_name: None,
            ceiling_directories: Vec::new(),
        }
    }
}

impl DescribeConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Directory discovery starts from: `scm_directory`, or the current
    /// working directory.
    pub fn repository_directory(&self) -> PathBuf {
        self.scm_directory
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}
