//! One describe invocation: locate, resolve, format, assign.
//!
//! Repository problems degrade to the configured fallback hash and a
//! fallback timestamp unless `fail` is set. Template problems always abort,
//! and they are detected before the repository is touched.

use std::path::PathBuf;

use serde::Serialize;

use crate::{
    config::DescribeConfig,
    error::DescribeError,
    policy::{self, Assignment},
    properties::PropertyStore,
    revision::{GitRevisionSource, Resolution, ResolvedRevision, RevisionSource},
    template::DescriptionTemplate,
};

const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

/// How `HEAD` resolution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved(ResolvedRevision),
    NoCommits,
    RepositoryNotFound { path: PathBuf },
    Failed { kind: String, message: String },
}

impl ResolutionOutcome {
    pub fn abbreviated(&self) -> Option<&str> {
        match self {
            Self::Resolved(rev) => Some(&rev.abbreviated),
            _ => None,
        }
    }

    pub fn commit_time(&self) -> Option<i64> {
        match self {
            Self::Resolved(rev) => Some(rev.commit_time),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescribeReport {
    pub outcome: ResolutionOutcome,
    pub description: String,
    /// Commit time, or the fallback time when resolution did not succeed.
    pub resolved_time: i64,
    pub description_assignment: Assignment,
    pub timestamp_assignment: Assignment,
}

pub struct Describer<S = GitRevisionSource> {
    config: DescribeConfig,
    source: S,
}

impl Describer<GitRevisionSource> {
    pub fn new(config: DescribeConfig) -> Self {
        let source = GitRevisionSource::new().with_ceiling_dirs(config.ceiling_directories.clone());
        Self { config, source }
    }
}

impl<S: RevisionSource> Describer<S> {
    pub fn with_source(config: DescribeConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &DescribeConfig {
        &self.config
    }

    /// Run once against `store`. Returns `Ok(None)` when `skip` is set.
    pub fn run(&self, store: &mut dyn PropertyStore) -> Result<Option<DescribeReport>, DescribeError> {
        let source_date_epoch = std::env::var(SOURCE_DATE_EPOCH).ok();
        self.run_at(
            store,
            chrono::Utc::now().timestamp(),
            source_date_epoch.as_deref(),
        )
    }

    /// Like [`Describer::run`] with an explicit wall-clock time and
    /// `SOURCE_DATE_EPOCH` value for the fallback timestamp.
    pub fn run_at(
        &self,
        store: &mut dyn PropertyStore,
        now: i64,
        source_date_epoch: Option<&str>,
    ) -> Result<Option<DescribeReport>, DescribeError> {
        if self.config.skip {
            tracing::info!("Skipping describe");
            return Ok(None);
        }

        let template = DescriptionTemplate::parse(&self.config.format)?;
        let outcome = self.resolve()?;

        let hash = outcome
            .abbreviated()
            .unwrap_or(self.config.fail_hash.as_str());
        let view: &dyn PropertyStore = &*store;
        let description = template.render_with(hash, |name| self.lookup(view, name));
        let resolved_time = outcome.commit_time().unwrap_or_else(|| {
            if self.config.use_source_date_epoch {
                fallback_time(source_date_epoch, now)
            } else {
                now
            }
        });

        let description_assignment = policy::assign_description(
            store,
            &self.config.description_property,
            &description,
            self.config.override_existing,
        );
        let timestamp_assignment = policy::assign_timestamp(
            store,
            &self.config.timestamp_property,
            resolved_time,
            self.config.override_existing,
        );

        Ok(Some(DescribeReport {
            outcome,
            description,
            resolved_time,
            description_assignment,
            timestamp_assignment,
        }))
    }

    fn resolve(&self) -> Result<ResolutionOutcome, DescribeError> {
        let dir = self.config.repository_directory();

        match self.source.resolve(&dir, self.config.abbrev_length) {
            Ok(Resolution::Resolved(rev)) => Ok(ResolutionOutcome::Resolved(rev)),
            Ok(Resolution::NoCommits) => {
                tracing::warn!("Repository at {} has no commits", dir.display());
                Ok(ResolutionOutcome::NoCommits)
            }
            Err(e) if !e.is_recoverable() => Err(e),
            Err(e) if self.config.fail => {
                tracing::error!("Failed to read git repository ({}): {}", e.kind(), e);
                Err(e)
            }
            Err(DescribeError::RepositoryNotFound { path }) => {
                tracing::warn!(
                    "No git repository found in {} or any parent directory, using \"{}\"",
                    path.display(),
                    self.config.fail_hash
                );
                Ok(ResolutionOutcome::RepositoryNotFound { path })
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to get HEAD commit hash ({}): {}, using \"{}\"",
                    e.kind(),
                    e,
                    self.config.fail_hash
                );
                let (kind, message) = match e {
                    DescribeError::Resolution { kind, message } => (kind, message),
                    other => (other.kind().to_string(), other.to_string()),
                };
                Ok(ResolutionOutcome::Failed { kind, message })
            }
        }
    }

    fn lookup(&self, store: &dyn PropertyStore, name: &str) -> Option<String> {
        store.get(name).or_else(|| match name {
            "project.name" => self.config.project_name.clone(),
            _ => None,
        })
    }
}

/// Fallback timestamp when `useSourceDateEpoch` is on: `SOURCE_DATE_EPOCH`
/// if it holds an integer, otherwise `now`.
pub fn fallback_time(source_date_epoch: Option<&str>, now: i64) -> i64 {
    match source_date_epoch.map(|v| v.trim().parse::<i64>()) {
        Some(Ok(epoch)) => epoch,
        Some(Err(_)) => {
            tracing::warn!("Ignoring non-numeric {}", SOURCE_DATE_EPOCH);
            now
        }
        None => now,
    }
}
